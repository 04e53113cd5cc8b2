//! Progress engine.
//!
//! Turns the baseline distance and the latest remaining distance into a
//! progress percentage, picks the visual regime for it, and applies the
//! result to the board. The decision part ([`ProgressPlan`]) is pure; the
//! async part ([`ProgressEngine`]) fetches, applies and persists.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::animation::{AnimationDriver, DriverCommand};
use crate::error::Result;
use crate::fetch::{parse_leading_int, DataFetcher, DistanceReading};
use crate::storage::{keys, with_storage, SharedStorage, Storage};
use crate::view::{with_view, Element, Layout, Opacity, ProgressView, SharedView};

/// At or below this percentage the marker stops following the bar and stays
/// pinned at this offset.
pub const NEAR_ORIGIN_PERCENT: f64 = 16.0;

/// The baseline distance of the current flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialDistance {
    /// Distance evaluation is off (published as `-1`, or invalid).
    Disabled,
    /// Baseline distance in kilometres, always positive.
    Km(u32),
}

impl InitialDistance {
    /// Parse the published value, normalizing anything that is not a
    /// positive integer to [`InitialDistance::Disabled`].
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match parse_leading_int(text).and_then(|v| u32::try_from(v).ok()) {
            Some(km) if km > 0 => Self::Km(km),
            _ => Self::Disabled,
        }
    }

    /// The published representation; `-1` when disabled.
    #[must_use]
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Disabled => -1,
            Self::Km(km) => i64::from(km),
        }
    }

    /// Whether progress is computed at all.
    #[must_use]
    pub fn is_enabled(self) -> bool {
        matches!(self, Self::Km(_))
    }
}

/// `min(current / initial * 100, 100)`.
#[must_use]
pub fn progress_percentage(initial_km: u32, current_km: u32) -> f64 {
    (f64::from(current_km) / f64::from(initial_km) * 100.0).min(100.0)
}

/// Whether `percent` falls in the near-origin range, where the marker and
/// text are pinned and the animation is stopped.
#[must_use]
pub fn is_near_origin(percent: f64) -> bool {
    percent <= NEAR_ORIGIN_PERCENT
}

/// Marker offset centring the marker on `percent` of the container.
#[must_use]
pub fn marker_offset(layout: Layout, percent: f64) -> f64 {
    layout.container_width * percent / 100.0 - layout.marker_width / 2.0
}

/// Visual regime of the progress display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Distance evaluation is off.
    Disabled,
    /// Percentage is exactly 0.
    PreDeparture,
    /// Percentage is strictly between 0 and 100.
    InFlight,
    /// Percentage is exactly 100.
    Complete,
}

impl Regime {
    /// Regime for a percentage in `[0, 100]`.
    #[must_use]
    pub fn for_percentage(percent: f64) -> Self {
        if percent >= 100.0 {
            Self::Complete
        } else if percent > 0.0 {
            Self::InFlight
        } else {
            Self::PreDeparture
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => write!(f, "disabled"),
            Self::PreDeparture => write!(f, "pre-departure"),
            Self::InFlight => write!(f, "in-flight"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// Everything one progress update does to the board.
///
/// `None` fields leave the corresponding property untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressPlan {
    /// The regime the plan was derived for.
    pub regime: Option<Regime>,
    /// Bar width in percent.
    pub bar_width: Option<f64>,
    /// Opacity of the bar.
    pub bar: Option<Opacity>,
    /// Opacity of the animation image.
    pub animation: Option<Opacity>,
    /// Opacity of the marker.
    pub marker: Option<Opacity>,
    /// Opacity of the status text.
    pub text: Option<Opacity>,
    /// Marker offset in pixels.
    pub marker_offset: Option<f64>,
    /// Status text offset in pixels (only set when pinned near the origin).
    pub text_offset: Option<f64>,
    /// What the animation driver should do.
    pub driver: Option<DriverCommand>,
}

impl ProgressPlan {
    const UNTOUCHED: Self = Self {
        regime: None,
        bar_width: None,
        bar: None,
        animation: None,
        marker: None,
        text: None,
        marker_offset: None,
        text_offset: None,
        driver: None,
    };

    /// Plan for a computed percentage.
    ///
    /// The regime decides the opacities; the near-origin clamp is applied
    /// last and overrides marker placement and the animation driver.
    #[must_use]
    pub fn for_percentage(percent: f64, layout: Layout) -> Self {
        use Opacity::{Hidden, Visible};

        let regime = Regime::for_percentage(percent);
        let (bar, animation, driver) = match regime {
            Regime::Complete => (Visible, Hidden, DriverCommand::Stop),
            Regime::InFlight => (Visible, Visible, DriverCommand::Start),
            Regime::PreDeparture | Regime::Disabled => (Hidden, Hidden, DriverCommand::Stop),
        };

        let mut plan = Self {
            regime: Some(regime),
            bar_width: Some(percent),
            bar: Some(bar),
            animation: Some(animation),
            marker: Some(Visible),
            text: Some(Visible),
            marker_offset: Some(marker_offset(layout, percent)),
            text_offset: None,
            driver: Some(driver),
        };

        if is_near_origin(percent) {
            let pinned = marker_offset(layout, NEAR_ORIGIN_PERCENT);
            plan.marker_offset = Some(pinned);
            plan.text_offset = Some(pinned);
            plan.driver = Some(DriverCommand::Stop);
        }

        plan
    }

    /// Plan for a failed distance read: everything collapses.
    ///
    /// The animation is left as it was.
    #[must_use]
    pub fn collapsed() -> Self {
        Self {
            bar_width: Some(0.0),
            bar: Some(Opacity::Hidden),
            marker: Some(Opacity::Hidden),
            text: Some(Opacity::Hidden),
            ..Self::UNTOUCHED
        }
    }

    /// The board's appearance when distance evaluation is off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            regime: Some(Regime::Disabled),
            bar_width: Some(0.0),
            bar: Some(Opacity::Hidden),
            animation: Some(Opacity::Hidden),
            marker: Some(Opacity::Hidden),
            text: Some(Opacity::Hidden),
            driver: Some(DriverCommand::Stop),
            ..Self::UNTOUCHED
        }
    }

    /// Plan restoring a persisted state before the first live read.
    ///
    /// Only width and position are restored; opacities other than the bar's
    /// wait for the first live update.
    #[must_use]
    pub fn restored(percent: f64, layout: Layout) -> Self {
        let live = Self::for_percentage(percent, layout);
        Self {
            bar_width: Some(percent),
            bar: Some(Opacity::Visible),
            marker_offset: live.marker_offset,
            text_offset: live.text_offset,
            ..Self::UNTOUCHED
        }
    }

    /// Apply the plan to a view, returning the driver command to execute.
    pub fn apply(&self, view: &mut impl ProgressView) -> Option<DriverCommand> {
        if let Some(width) = self.bar_width {
            view.set_bar_width(width);
        }
        if let Some(px) = self.marker_offset {
            view.set_marker_offset(px);
        }
        if let Some(px) = self.text_offset {
            view.set_text_offset(px);
        }
        for (element, opacity) in [
            (Element::Bar, self.bar),
            (Element::Animation, self.animation),
            (Element::Marker, self.marker),
            (Element::Text, self.text),
        ] {
            if let Some(opacity) = opacity {
                view.set_opacity(element, opacity);
            }
        }
        self.driver
    }
}

/// Progress state persisted across reloads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedProgress {
    /// Last remaining distance read.
    pub current_distance: u32,
    /// Percentage derived from it.
    pub percentage: f64,
}

impl PersistedProgress {
    /// Load the persisted state. Both values must be present and valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage query fails.
    pub fn load(store: &Storage) -> Result<Option<Self>> {
        let distance = store.get(keys::CURRENT_DISTANCE)?;
        let percentage = store.get(keys::PROGRESS_PERCENTAGE)?;

        let (Some(distance), Some(percentage)) = (distance, percentage) else {
            return Ok(None);
        };
        let current_distance = parse_leading_int(&distance).and_then(|v| u32::try_from(v).ok());
        let percentage = percentage
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| (0.0..=100.0).contains(p));

        match (current_distance, percentage) {
            (Some(current_distance), Some(percentage)) => Ok(Some(Self {
                current_distance,
                percentage,
            })),
            _ => {
                warn!("Ignoring invalid persisted progress state");
                Ok(None)
            }
        }
    }

    /// Persist this state.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails.
    pub fn save(&self, store: &Storage) -> Result<()> {
        store.set(keys::CURRENT_DISTANCE, &self.current_distance.to_string())?;
        store.set(keys::PROGRESS_PERCENTAGE, &self.percentage.to_string())?;
        Ok(())
    }
}

/// What a call to [`ProgressEngine::update`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UpdateOutcome {
    /// Distance evaluation is off (or not yet resolved); nothing changed.
    Disabled,
    /// The distance could not be read; the board collapsed.
    Collapsed,
    /// The distance was not a number; nothing changed.
    Skipped,
    /// The board now shows `percentage` in `regime`.
    Updated {
        /// The computed percentage.
        percentage: f64,
        /// Its regime.
        regime: Regime,
        /// The near-origin clamp pinned the marker and text.
        clamped: bool,
    },
}

/// The per-session progress engine.
///
/// The baseline distance is read once per session by
/// [`ProgressEngine::resolve_initial`] and never changes afterwards.
#[derive(Debug)]
pub struct ProgressEngine {
    fetcher: DataFetcher,
    view: SharedView,
    store: SharedStorage,
    driver: AnimationDriver,
    initial: Option<InitialDistance>,
}

impl ProgressEngine {
    /// Create an engine for a new session.
    #[must_use]
    pub fn new(
        fetcher: DataFetcher,
        view: SharedView,
        store: SharedStorage,
        driver: AnimationDriver,
    ) -> Self {
        Self {
            fetcher,
            view,
            store,
            driver,
            initial: None,
        }
    }

    /// The baseline distance, if resolved.
    #[must_use]
    pub fn initial(&self) -> Option<InitialDistance> {
        self.initial
    }

    /// Whether the animation driver currently runs.
    #[must_use]
    pub fn animation_running(&self) -> bool {
        self.driver.is_running()
    }

    /// Read the baseline distance, once per session.
    pub async fn resolve_initial(&mut self) -> InitialDistance {
        if let Some(initial) = self.initial {
            return initial;
        }
        let initial = self.fetcher.initial_distance().await;
        self.initial = Some(initial);
        initial
    }

    /// Restore the persisted state onto the board.
    ///
    /// Returns the restored state, if there was one.
    pub fn restore(&mut self) -> Option<PersistedProgress> {
        let persisted = match with_storage(&self.store, PersistedProgress::load) {
            Ok(persisted) => persisted?,
            Err(e) => {
                warn!("Failed to load progress state: {e}");
                return None;
            }
        };
        debug!(?persisted, "Restoring progress state");
        with_view(&self.view, |v| {
            let plan = ProgressPlan::restored(persisted.percentage, v.layout());
            plan.apply(v);
        });
        Some(persisted)
    }

    /// Write the combined ETE / distance text to the board.
    pub async fn refresh_status_text(&self) {
        if let Some(line) = self.fetcher.status_line().await {
            with_view(&self.view, |v| v.set_text(&line));
        }
    }

    /// Run one progress update.
    pub async fn update(&mut self) -> UpdateOutcome {
        let flight = self.fetcher.current_flight().await;
        with_view(&self.view, |v| {
            v.set_aircraft_type(flight.map(|f| f.aircraft_type));
        });

        let Some(InitialDistance::Km(initial_km)) = self.initial else {
            return UpdateOutcome::Disabled;
        };

        let current_km = match self.fetcher.distance_to_destination().await {
            DistanceReading::Km(km) => km,
            DistanceReading::Unparsable => return UpdateOutcome::Skipped,
            DistanceReading::Unavailable => {
                with_view(&self.view, |v| ProgressPlan::collapsed().apply(v));
                return UpdateOutcome::Collapsed;
            }
        };

        let percentage = progress_percentage(initial_km, current_km);
        let plan = with_view(&self.view, |v| {
            let plan = ProgressPlan::for_percentage(percentage, v.layout());
            plan.apply(v);
            plan
        });
        if let Some(command) = plan.and_then(|p| p.driver) {
            self.driver.apply(command);
        }

        let persisted = PersistedProgress {
            current_distance: current_km,
            percentage,
        };
        if let Err(e) = with_storage(&self.store, |s| persisted.save(s)) {
            warn!("Failed to persist progress state: {e}");
        }

        self.refresh_status_text().await;

        let regime = Regime::for_percentage(percentage);
        let clamped = is_near_origin(percentage);
        debug!(initial_km, current_km, percentage, %regime, clamped, "Progress updated");
        UpdateOutcome::Updated {
            percentage,
            regime,
            clamped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::animation::DEFAULT_FRAME_PERIOD;
    use crate::fetch::{MemorySource, Resource};
    use crate::logging::init_test_logging;
    use crate::view::BoardView;

    const LAYOUT: Layout = Layout {
        container_width: 600.0,
        marker_width: 40.0,
    };

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    struct Harness {
        source: MemorySource,
        view: SharedView,
        store: SharedStorage,
        engine: ProgressEngine,
    }

    fn harness(initial: &str, distance: &str) -> Harness {
        init_test_logging();
        let source = MemorySource::new()
            .with(Resource::StartDistance, initial)
            .with(Resource::DistToDestination, distance)
            .with(Resource::EteText, "00:45")
            .with(Resource::CurrentFlight, "A320 EZY1234");
        let view = BoardView::new(LAYOUT).into_shared();
        let store = Storage::open_in_memory().unwrap().into_shared();
        let engine = ProgressEngine::new(
            DataFetcher::new(Arc::new(source.clone())),
            view.clone(),
            store.clone(),
            AnimationDriver::new(view.clone(), DEFAULT_FRAME_PERIOD),
        );
        Harness {
            source,
            view,
            store,
            engine,
        }
    }

    fn snapshot(view: &SharedView) -> BoardView {
        with_view(view, |v| v.clone()).unwrap()
    }

    #[test]
    fn test_initial_distance_parse() {
        assert_eq!(InitialDistance::parse("1000"), InitialDistance::Km(1000));
        assert_eq!(InitialDistance::parse("-1"), InitialDistance::Disabled);
        assert_eq!(InitialDistance::parse("0"), InitialDistance::Disabled);
        assert_eq!(InitialDistance::parse("NaN"), InitialDistance::Disabled);
        assert_eq!(InitialDistance::Disabled.as_raw(), -1);
        assert_eq!(InitialDistance::Km(12).as_raw(), 12);
    }

    #[test]
    fn test_percentage_formula_and_bounds() {
        assert!(approx(progress_percentage(1000, 250), 25.0));
        assert!(approx(progress_percentage(1000, 1000), 100.0));
        assert!(approx(progress_percentage(1000, 5000), 100.0));
        assert!(approx(progress_percentage(1000, 0), 0.0));
        for current in [0, 1, 17, 999, 1000, 1001, u32::MAX] {
            let p = progress_percentage(1000, current);
            assert!((0.0..=100.0).contains(&p), "{current} -> {p}");
        }
    }

    #[test]
    fn test_regime_boundaries() {
        assert_eq!(Regime::for_percentage(0.0), Regime::PreDeparture);
        assert_eq!(Regime::for_percentage(0.1), Regime::InFlight);
        assert_eq!(Regime::for_percentage(99.9), Regime::InFlight);
        assert_eq!(Regime::for_percentage(100.0), Regime::Complete);
    }

    #[test]
    fn test_plan_in_flight_75() {
        let plan = ProgressPlan::for_percentage(75.0, LAYOUT);
        assert_eq!(plan.regime, Some(Regime::InFlight));
        assert_eq!(plan.animation, Some(Opacity::Visible));
        assert_eq!(plan.driver, Some(DriverCommand::Start));
        assert!(approx(plan.marker_offset.unwrap(), 600.0 * 0.75 - 20.0));
        assert!(plan.text_offset.is_none());
    }

    #[test]
    fn test_plan_complete() {
        let plan = ProgressPlan::for_percentage(100.0, LAYOUT);
        assert_eq!(plan.regime, Some(Regime::Complete));
        assert_eq!(plan.bar, Some(Opacity::Visible));
        assert_eq!(plan.animation, Some(Opacity::Hidden));
        assert_eq!(plan.marker, Some(Opacity::Visible));
        assert_eq!(plan.driver, Some(DriverCommand::Stop));
    }

    #[test]
    fn test_plan_pre_departure_is_pinned() {
        let plan = ProgressPlan::for_percentage(0.0, LAYOUT);
        assert_eq!(plan.regime, Some(Regime::PreDeparture));
        assert_eq!(plan.bar, Some(Opacity::Hidden));
        assert_eq!(plan.marker, Some(Opacity::Visible));
        assert_eq!(plan.text, Some(Opacity::Visible));
        assert!(approx(plan.marker_offset.unwrap(), 96.0 - 20.0));
    }

    #[test]
    fn test_plan_near_origin_clamp() {
        let pinned = marker_offset(LAYOUT, 16.0);

        let plan = ProgressPlan::for_percentage(12.0, LAYOUT);
        assert_eq!(plan.regime, Some(Regime::InFlight));
        assert_eq!(plan.marker_offset, Some(pinned));
        assert_eq!(plan.text_offset, Some(pinned));
        assert_eq!(plan.driver, Some(DriverCommand::Stop));

        let at_boundary = ProgressPlan::for_percentage(16.0, LAYOUT);
        assert_eq!(at_boundary.marker_offset, Some(pinned));
        assert_eq!(at_boundary.driver, Some(DriverCommand::Stop));

        let above = ProgressPlan::for_percentage(16.5, LAYOUT);
        assert!(approx(above.marker_offset.unwrap(), marker_offset(LAYOUT, 16.5)));
        assert!(above.text_offset.is_none());
        assert_eq!(above.driver, Some(DriverCommand::Start));
    }

    #[test]
    fn test_plan_collapsed() {
        let mut view = BoardView::new(LAYOUT);
        ProgressPlan::for_percentage(60.0, LAYOUT).apply(&mut view);
        let command = ProgressPlan::collapsed().apply(&mut view);

        assert!(command.is_none());
        assert!(approx(view.bar_width, 0.0));
        assert_eq!(view.opacity(Element::Bar), Opacity::Hidden);
        assert_eq!(view.opacity(Element::Marker), Opacity::Hidden);
        assert_eq!(view.opacity(Element::Text), Opacity::Hidden);
    }

    #[test]
    fn test_disabled_plan_matches_fresh_board() {
        let mut view = BoardView::new(LAYOUT);
        ProgressPlan::for_percentage(60.0, LAYOUT).apply(&mut view);
        let command = ProgressPlan::disabled().apply(&mut view);

        let fresh = BoardView::new(LAYOUT);
        assert_eq!(command, Some(DriverCommand::Stop));
        assert!(approx(view.bar_width, fresh.bar_width));
        for element in Element::ALL {
            assert_eq!(view.opacity(element), fresh.opacity(element));
        }
    }

    #[test]
    fn test_persisted_progress_roundtrip_and_validation() {
        let store = Storage::open_in_memory().unwrap();
        assert!(PersistedProgress::load(&store).unwrap().is_none());

        let state = PersistedProgress {
            current_distance: 250,
            percentage: 25.0,
        };
        state.save(&store).unwrap();
        assert_eq!(PersistedProgress::load(&store).unwrap(), Some(state));

        store.set(keys::PROGRESS_PERCENTAGE, "garbage").unwrap();
        assert!(PersistedProgress::load(&store).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_in_flight() {
        let mut h = harness("1000", "250");
        assert_eq!(h.engine.resolve_initial().await, InitialDistance::Km(1000));

        let outcome = h.engine.update().await;
        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                percentage: 25.0,
                regime: Regime::InFlight,
                clamped: false,
            }
        );

        let board = snapshot(&h.view);
        assert!(approx(board.bar_width, 25.0));
        assert_eq!(board.opacity(Element::Animation), Opacity::Visible);
        assert_eq!(board.text_content, "00:45 | 250 KM");
        assert_eq!(board.aircraft_type.as_deref(), Some("A320"));
        assert!(h.engine.animation_running());

        let persisted = with_storage(&h.store, PersistedProgress::load).unwrap();
        assert_eq!(
            persisted,
            Some(PersistedProgress {
                current_distance: 250,
                percentage: 25.0
            })
        );
    }

    #[tokio::test]
    async fn test_update_example_75_percent() {
        let mut h = harness("1000", "750");
        h.engine.resolve_initial().await;
        h.engine.update().await;

        let board = snapshot(&h.view);
        let marker = board.marker.as_ref().unwrap();
        assert!(approx(marker.left_px.unwrap(), 600.0 * 0.75 - 20.0));
        assert!(h.engine.animation_running());
    }

    #[tokio::test]
    async fn test_update_complete_stops_animation() {
        let mut h = harness("1000", "500");
        h.engine.resolve_initial().await;
        h.engine.update().await;
        assert!(h.engine.animation_running());

        h.source.set(Resource::DistToDestination, "1000");
        let outcome = h.engine.update().await;
        assert!(matches!(
            outcome,
            UpdateOutcome::Updated {
                regime: Regime::Complete,
                ..
            }
        ));
        assert!(!h.engine.animation_running());
        let board = snapshot(&h.view);
        assert_eq!(board.opacity(Element::Marker), Opacity::Visible);
        assert_eq!(board.opacity(Element::Animation), Opacity::Hidden);
    }

    #[test]
    fn test_near_origin_range_is_inclusive() {
        assert!(is_near_origin(0.0));
        assert!(is_near_origin(16.0));
        assert!(!is_near_origin(16.5));
    }

    #[tokio::test]
    async fn test_update_near_origin_pins_marker() {
        let mut h = harness("1000", "120");
        h.engine.resolve_initial().await;
        let outcome = h.engine.update().await;
        assert_eq!(
            outcome,
            UpdateOutcome::Updated {
                percentage: 12.0,
                regime: Regime::InFlight,
                clamped: true,
            }
        );

        let board = snapshot(&h.view);
        let pinned = marker_offset(LAYOUT, 16.0);
        assert_eq!(board.marker.as_ref().unwrap().left_px, Some(pinned));
        assert_eq!(board.text.as_ref().unwrap().left_px, Some(pinned));
        assert!(!h.engine.animation_running());
    }

    #[tokio::test]
    async fn test_update_fetch_failure_collapses() {
        let mut h = harness("1000", "500");
        h.engine.resolve_initial().await;
        h.engine.update().await;

        h.source.remove(Resource::DistToDestination);
        assert_eq!(h.engine.update().await, UpdateOutcome::Collapsed);

        let board = snapshot(&h.view);
        assert!(approx(board.bar_width, 0.0));
        assert_eq!(board.opacity(Element::Bar), Opacity::Hidden);
        assert_eq!(board.opacity(Element::Marker), Opacity::Hidden);
        assert_eq!(board.opacity(Element::Text), Opacity::Hidden);
    }

    #[tokio::test]
    async fn test_update_unparsable_distance_leaves_board() {
        let mut h = harness("1000", "500");
        h.engine.resolve_initial().await;
        h.engine.update().await;
        let before = snapshot(&h.view);

        h.source.set(Resource::DistToDestination, "???");
        assert_eq!(h.engine.update().await, UpdateOutcome::Skipped);
        assert!(approx(snapshot(&h.view).bar_width, before.bar_width));
    }

    #[tokio::test]
    async fn test_disabled_never_computes() {
        for initial in ["-1", "abc", "0"] {
            let mut h = harness(initial, "500");
            PersistedProgress {
                current_distance: 300,
                percentage: 30.0,
            }
            .save(&h.store.lock().unwrap())
            .unwrap();
            h.engine.restore();
            h.engine.resolve_initial().await;

            assert_eq!(h.engine.update().await, UpdateOutcome::Disabled);
            assert_eq!(h.source.reads(Resource::DistToDestination), 0);
            assert!(approx(snapshot(&h.view).bar_width, 30.0), "{initial}");
        }
    }

    #[tokio::test]
    async fn test_initial_distance_is_read_once() {
        let mut h = harness("1000", "500");
        h.engine.resolve_initial().await;
        h.source.set(Resource::StartDistance, "2000");

        assert_eq!(h.engine.resolve_initial().await, InitialDistance::Km(1000));
        assert_eq!(h.source.reads(Resource::StartDistance), 1);
    }

    #[tokio::test]
    async fn test_restore_before_first_fetch() {
        let mut h = harness("1000", "500");
        PersistedProgress {
            current_distance: 800,
            percentage: 80.0,
        }
        .save(&h.store.lock().unwrap())
        .unwrap();

        let restored = h.engine.restore();
        assert_eq!(restored.map(|r| r.current_distance), Some(800));
        assert_eq!(h.source.reads(Resource::DistToDestination), 0);

        let board = snapshot(&h.view);
        assert!(approx(board.bar_width, 80.0));
        assert_eq!(board.opacity(Element::Bar), Opacity::Visible);
        assert!(approx(
            board.marker.as_ref().unwrap().left_px.unwrap(),
            marker_offset(LAYOUT, 80.0)
        ));
    }

    #[tokio::test]
    async fn test_restore_without_state() {
        let mut h = harness("1000", "500");
        assert!(h.engine.restore().is_none());
        assert_eq!(snapshot(&h.view).revision, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_animation_runs_only_while_in_flight() {
        let mut h = harness("1000", "500");
        h.engine.resolve_initial().await;
        h.engine.update().await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        let frame = snapshot(&h.view).animation.unwrap().src;
        assert!(frame.is_some_and(|f| f.starts_with("/Image/JetStream/JetStream")));

        h.source.set(Resource::DistToDestination, "0");
        h.engine.update().await;
        assert!(!h.engine.animation_running());
    }
}
