//! Flight-change watcher.
//!
//! Compares successive flight status tokens and asks for a full board reload
//! when the status changes. At most one reload is requested per session.

use serde::Serialize;
use tracing::{debug, info};

use crate::fetch::FlightStatus;

/// What the watcher concluded from one poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Observation {
    /// The status could not be read; nothing was recorded.
    NoData,
    /// First status seen this session, recorded as the baseline.
    Baseline,
    /// Same status as last time.
    Unchanged,
    /// The status changed: the board must reload.
    Reload {
        /// Previously recorded status.
        from: FlightStatus,
        /// Newly observed status.
        to: FlightStatus,
    },
    /// The status changed but a reload already fired this session.
    Suppressed,
}

/// Per-session change detector.
#[derive(Debug, Default)]
pub struct FlightChangeWatcher {
    previous: Option<FlightStatus>,
    reloaded: bool,
}

impl FlightChangeWatcher {
    /// A watcher with no baseline and no reload fired.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last recorded status.
    #[must_use]
    pub fn previous(&self) -> Option<&FlightStatus> {
        self.previous.as_ref()
    }

    /// Whether this session already requested a reload.
    #[must_use]
    pub fn has_reloaded(&self) -> bool {
        self.reloaded
    }

    /// Feed the result of one status poll.
    pub fn observe(&mut self, status: Option<FlightStatus>) -> Observation {
        let Some(status) = status else {
            return Observation::NoData;
        };

        let Some(previous) = &self.previous else {
            debug!(%status, "Recorded baseline flight status");
            self.previous = Some(status);
            return Observation::Baseline;
        };

        if *previous == status {
            return Observation::Unchanged;
        }

        if self.reloaded {
            debug!(%status, "Flight status changed after reload, recording only");
            self.previous = Some(status);
            return Observation::Suppressed;
        }

        self.reloaded = true;
        info!(from = %previous, to = %status, "Flight status changed, reloading board");
        Observation::Reload {
            from: previous.clone(),
            to: status,
        }
    }
}
