//! The board's visual elements.
//!
//! [`ProgressView`] is the narrow mutation interface the progress engine and
//! animation driver talk to. [`BoardView`] is the in-memory board they mutate;
//! frontends (the terminal renderer, `status --json`) read snapshots of it.
//! Elements may be absent; mutations aimed at a missing element are skipped.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::table::FlightTable;

/// One of the elements making up the progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Element {
    /// The progress bar.
    Bar,
    /// Decorative jet-stream animation trailing the aircraft.
    Animation,
    /// The aircraft marker positioned along the bar.
    Marker,
    /// ETE / distance status text.
    Text,
}

impl Element {
    /// Every element.
    pub const ALL: [Element; 4] = [Self::Bar, Self::Animation, Self::Marker, Self::Text];
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bar => write!(f, "bar"),
            Self::Animation => write!(f, "animation"),
            Self::Marker => write!(f, "marker"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Element opacity. The board only ever uses fully shown or fully hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Opacity {
    /// Opacity 0.
    #[default]
    Hidden,
    /// Opacity 1.
    Visible,
}

impl Opacity {
    /// Whether the element is shown.
    #[must_use]
    pub fn is_visible(self) -> bool {
        self == Self::Visible
    }
}

/// Measured geometry of the bar container and the marker.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Width of the bar container in pixels.
    pub container_width: f64,
    /// Width of the aircraft marker in pixels.
    pub marker_width: f64,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            container_width: 600.0,
            marker_width: 40.0,
        }
    }
}

/// Mutation interface for the progress display.
pub trait ProgressView {
    /// Set the bar width as a percentage of its container.
    fn set_bar_width(&mut self, percent: f64);

    /// Set the opacity of an element.
    fn set_opacity(&mut self, element: Element, opacity: Opacity);

    /// Set the marker's horizontal offset in pixels.
    fn set_marker_offset(&mut self, px: f64);

    /// Set the status text's horizontal offset in pixels.
    fn set_text_offset(&mut self, px: f64);

    /// Replace the status text.
    fn set_text(&mut self, text: &str);

    /// Point the animation image at a new frame.
    fn set_animation_frame(&mut self, path: &str);

    /// Current geometry, used to position the marker.
    fn layout(&self) -> Layout;
}

/// State of a single element on the board.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementState {
    /// Current opacity.
    pub opacity: Opacity,
    /// Horizontal offset in pixels, once positioned.
    pub left_px: Option<f64>,
    /// Image source declared by the page, rewritten to `src` at start-up.
    pub data_src: Option<String>,
    /// Resolved image source.
    pub src: Option<String>,
}

impl ElementState {
    fn image(data_src: &str) -> Self {
        Self {
            data_src: Some(data_src.to_string()),
            ..Self::default()
        }
    }
}

/// The in-memory board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardView {
    layout: Layout,
    /// Bar width in percent of the container.
    pub bar_width: f64,
    /// The progress bar.
    pub bar: Option<ElementState>,
    /// The jet-stream animation image.
    pub animation: Option<ElementState>,
    /// The aircraft marker image.
    pub marker: Option<ElementState>,
    /// The status text element.
    pub text: Option<ElementState>,
    /// Status text content.
    pub text_content: String,
    /// Aircraft type of the current flight, when known.
    pub aircraft_type: Option<String>,
    /// The flight table, when one is configured.
    pub table: Option<FlightTable>,
    /// Incremented on every reset, i.e. once per session.
    pub session: u64,
    /// Incremented on every mutation.
    pub revision: u64,
}

/// A board shared between the polling tasks.
pub type SharedView = Arc<Mutex<BoardView>>;

/// Image the marker element declares.
pub const MARKER_IMAGE: &str = "/Image/Aircraft.png";

impl BoardView {
    /// Create a board with every element present and hidden.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            bar_width: 0.0,
            bar: Some(ElementState::default()),
            animation: Some(ElementState::image(&crate::animation::frame_path(1))),
            marker: Some(ElementState::image(MARKER_IMAGE)),
            text: Some(ElementState::default()),
            text_content: String::new(),
            aircraft_type: None,
            table: None,
            session: 0,
            revision: 0,
        }
    }

    /// Remove an element from the board.
    #[must_use]
    pub fn without(mut self, element: Element) -> Self {
        *self.slot(element) = None;
        self
    }

    /// Wrap this board for sharing between tasks.
    #[must_use]
    pub fn into_shared(self) -> SharedView {
        Arc::new(Mutex::new(self))
    }

    /// Return every present element to its initial state and drop the table.
    ///
    /// This is what a fresh page load looks like.
    pub fn reset(&mut self) {
        let fresh = Self::new(self.layout);
        for element in Element::ALL {
            if self.element(element).is_some() {
                *self.slot(element) = fresh.element(element).cloned();
            }
        }
        self.bar_width = 0.0;
        self.text_content.clear();
        self.aircraft_type = None;
        self.table = None;
        self.session += 1;
        self.revision += 1;
    }

    /// State of an element, if present.
    #[must_use]
    pub fn element(&self, element: Element) -> Option<&ElementState> {
        match element {
            Element::Bar => self.bar.as_ref(),
            Element::Animation => self.animation.as_ref(),
            Element::Marker => self.marker.as_ref(),
            Element::Text => self.text.as_ref(),
        }
    }

    fn slot(&mut self, element: Element) -> &mut Option<ElementState> {
        match element {
            Element::Bar => &mut self.bar,
            Element::Animation => &mut self.animation,
            Element::Marker => &mut self.marker,
            Element::Text => &mut self.text,
        }
    }

    /// Opacity of an element; absent elements count as hidden.
    #[must_use]
    pub fn opacity(&self, element: Element) -> Opacity {
        self.element(element).map(|e| e.opacity).unwrap_or_default()
    }

    /// Set the aircraft type shown next to the bar.
    pub fn set_aircraft_type(&mut self, aircraft_type: Option<String>) {
        if self.aircraft_type != aircraft_type {
            self.aircraft_type = aircraft_type;
            self.revision += 1;
        }
    }

    /// Resolve every `data-src` against `base_url`.
    pub fn rewrite_image_sources(&mut self, base_url: &str) {
        for element in Element::ALL {
            if let Some(state) = self.slot(element).as_mut() {
                if let Some(data_src) = &state.data_src {
                    let src = format!("{base_url}{data_src}");
                    debug!(%element, %src, "Setting image src");
                    state.src = Some(src);
                }
            }
        }
        self.revision += 1;
    }
}

impl Default for BoardView {
    fn default() -> Self {
        Self::new(Layout::default())
    }
}

impl ProgressView for BoardView {
    fn set_bar_width(&mut self, percent: f64) {
        if self.bar.is_some() {
            self.bar_width = percent;
            self.revision += 1;
        }
    }

    fn set_opacity(&mut self, element: Element, opacity: Opacity) {
        if let Some(state) = self.slot(element).as_mut() {
            state.opacity = opacity;
            self.revision += 1;
        }
    }

    fn set_marker_offset(&mut self, px: f64) {
        if let Some(marker) = self.marker.as_mut() {
            marker.left_px = Some(px);
            self.revision += 1;
        }
    }

    fn set_text_offset(&mut self, px: f64) {
        if let Some(text) = self.text.as_mut() {
            text.left_px = Some(px);
            self.revision += 1;
        }
    }

    fn set_text(&mut self, text: &str) {
        if self.text.is_some() {
            self.text_content = text.to_string();
            self.revision += 1;
        }
    }

    fn set_animation_frame(&mut self, path: &str) {
        if let Some(animation) = self.animation.as_mut() {
            animation.src = Some(path.to_string());
            self.revision += 1;
        }
    }

    fn layout(&self) -> Layout {
        self.layout
    }
}

/// Run `f` against a shared board.
///
/// A poisoned lock means a task panicked mid-mutation; the board is then left
/// alone and `None` is returned.
pub fn with_view<T>(view: &SharedView, f: impl FnOnce(&mut BoardView) -> T) -> Option<T> {
    match view.lock() {
        Ok(mut guard) => Some(f(&mut guard)),
        Err(_) => {
            warn!("Board lock poisoned, skipping update");
            None
        }
    }
}
