//! Jet-stream animation driver.
//!
//! While the aircraft is en route a decorative image cycles through five
//! frames on a fast timer. The driver owns at most one timer task: starting
//! it again replaces the running timer instead of stacking a second one.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::view::{with_view, Element, Opacity, ProgressView, SharedView};

/// Number of frames in the animation.
pub const FRAME_COUNT: u8 = 5;

/// Default time between frames.
pub const DEFAULT_FRAME_PERIOD: Duration = Duration::from_millis(20);

/// Image path of a frame (`1..=FRAME_COUNT`).
#[must_use]
pub fn frame_path(index: u8) -> String {
    format!("/Image/JetStream/JetStream{index}.png")
}

/// Cyclic frame counter: 1, 2, .., 5, 1, ..
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCycle {
    next: u8,
}

impl FrameCycle {
    /// A cycle starting at frame 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Return the current frame index and move to the next one.
    pub fn advance(&mut self) -> u8 {
        let current = self.next;
        self.next = current % FRAME_COUNT + 1;
        current
    }
}

impl Default for FrameCycle {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the animation should be running after a progress update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCommand {
    /// Start (or restart) cycling frames.
    Start,
    /// Cancel the timer and hide the image.
    Stop,
}

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Drives the animation frames on a shared board.
pub struct AnimationDriver {
    view: SharedView,
    period: Duration,
    running: Option<Running>,
}

impl std::fmt::Debug for AnimationDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationDriver")
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl AnimationDriver {
    /// Create a stopped driver.
    #[must_use]
    pub fn new(view: SharedView, period: Duration) -> Self {
        Self {
            view,
            period,
            running: None,
        }
    }

    /// Whether a timer is active.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.as_ref().is_some_and(|r| !r.task.is_finished())
    }

    /// Start cycling frames, replacing any running timer.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.cancel();

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let view = self.view.clone();
        let period = self.period;

        let task = tokio::spawn(async move {
            let mut cycle = FrameCycle::new();
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let path = frame_path(cycle.advance());
                        trace!(%path, "Animation frame");
                        with_view(&view, |v| v.set_animation_frame(&path));
                    }
                }
            }
        });

        self.running = Some(Running { cancel, task });
    }

    /// Cancel the timer and hide the animation image.
    pub fn stop(&mut self) {
        self.cancel();
        with_view(&self.view, |v| v.set_opacity(Element::Animation, Opacity::Hidden));
    }

    /// Apply a command from the progress engine.
    pub fn apply(&mut self, command: DriverCommand) {
        match command {
            DriverCommand::Start => self.start(),
            DriverCommand::Stop => self.stop(),
        }
    }

    fn cancel(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

impl Drop for AnimationDriver {
    fn drop(&mut self) {
        self.cancel();
    }
}
