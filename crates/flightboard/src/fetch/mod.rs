//! Data fetching for the board.
//!
//! The board reads five plain-text resources. Each accessor on
//! [`DataFetcher`] performs one read, trims whitespace and parses the value
//! according to its type. Failures are logged and turned into "no update this
//! cycle"; the next poll simply tries again.

mod directory;
mod http;
mod memory;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::error::Result;
use crate::progress::InitialDistance;

pub use directory::DirectorySource;
pub use http::HttpSource;
pub use memory::MemorySource;

/// One of the text resources the board polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Baseline distance captured once per flight.
    StartDistance,
    /// Aircraft type and flight number.
    CurrentFlight,
    /// Status token used for change detection.
    FlightStatus,
    /// Remaining distance to destination.
    DistToDestination,
    /// Estimated time en route, free text.
    EteText,
}

impl Resource {
    /// Every resource, in a stable order.
    pub const ALL: [Resource; 5] = [
        Self::StartDistance,
        Self::CurrentFlight,
        Self::FlightStatus,
        Self::DistToDestination,
        Self::EteText,
    ];

    /// File name of the resource under the data directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::StartDistance => "StartDistance.txt",
            Self::CurrentFlight => "CurrentFlight.txt",
            Self::FlightStatus => "FlightStatus.txt",
            Self::DistToDestination => "DistToDestination.txt",
            Self::EteText => "ETE_SRGS.txt",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// A backend that can read the board's text resources.
///
/// Implementors return the raw, untrimmed body of the resource. Parsing and
/// failure policy live in [`DataFetcher`].
#[async_trait]
pub trait TextSource: Send + Sync + fmt::Debug {
    /// The name of this source (for logging).
    fn name(&self) -> &'static str;

    /// Read the full text of a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the resource cannot be read.
    async fn read_text(&self, resource: Resource) -> Result<String>;
}

/// Aircraft type and flight number, as published in `CurrentFlight.txt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightIdentity {
    /// ICAO aircraft type, e.g. `A320`.
    pub aircraft_type: String,
    /// Flight number, if the producer wrote one.
    pub flight_number: Option<String>,
}

impl FlightIdentity {
    /// Parse a `"<aircraftType> <flightNumber>"` line.
    ///
    /// Returns `None` for blank input.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split_whitespace();
        let aircraft_type = parts.next()?.to_string();
        let flight_number = parts.next().map(str::to_string);
        Some(Self {
            aircraft_type,
            flight_number,
        })
    }
}

impl fmt::Display for FlightIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.flight_number {
            Some(number) => write!(f, "{} {number}", self.aircraft_type),
            None => f.write_str(&self.aircraft_type),
        }
    }
}

/// A flight status token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlightStatus(pub String);

impl FlightStatus {
    /// The status token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of reading the remaining distance.
///
/// A failed read and an unparsable value are treated differently by the
/// progress engine: the former collapses the bar, the latter leaves the board
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceReading {
    /// Remaining distance in kilometres.
    Km(u32),
    /// The resource was read but did not hold a non-negative integer.
    Unparsable,
    /// The resource could not be read.
    Unavailable,
}

/// Parse the leading integer of a string.
///
/// Accepts an optional sign followed by digits and ignores whatever follows,
/// so `"812 km"` and `"812.4"` both yield 812.
#[must_use]
pub fn parse_leading_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Typed access to the board's data resources.
#[derive(Debug, Clone)]
pub struct DataFetcher {
    source: Arc<dyn TextSource>,
}

impl DataFetcher {
    /// Create a fetcher over the given source.
    #[must_use]
    pub fn new(source: Arc<dyn TextSource>) -> Self {
        Self { source }
    }

    /// Name of the underlying source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Read and trim a resource, logging failures.
    async fn read(&self, resource: Resource) -> Option<String> {
        match self.source.read_text(resource).await {
            Ok(text) => Some(text.trim().to_string()),
            Err(e) => {
                error!(%resource, source = self.source.name(), "Error fetching data: {e}");
                None
            }
        }
    }

    /// Read the baseline distance.
    ///
    /// A failed read, a non-numeric value or a value `<= 0` all yield
    /// [`InitialDistance::Disabled`].
    pub async fn initial_distance(&self) -> InitialDistance {
        let Some(text) = self.read(Resource::StartDistance).await else {
            return InitialDistance::Disabled;
        };
        let initial = InitialDistance::parse(&text);
        match initial {
            InitialDistance::Km(km) => info!(km, "Initial distance"),
            InitialDistance::Disabled if parse_leading_int(&text) == Some(-1) => {
                info!("Distance evaluation disabled");
            }
            InitialDistance::Disabled => error!(value = %text, "Invalid initial distance value"),
        }
        initial
    }

    /// Read the current flight identity.
    pub async fn current_flight(&self) -> Option<FlightIdentity> {
        let text = self.read(Resource::CurrentFlight).await?;
        FlightIdentity::parse(&text)
    }

    /// Read the flight status token.
    ///
    /// An empty file is a valid (empty) status, like the original producer
    /// writing nothing between flights.
    pub async fn flight_status(&self) -> Option<FlightStatus> {
        self.read(Resource::FlightStatus).await.map(FlightStatus)
    }

    /// Read the remaining distance to destination.
    pub async fn distance_to_destination(&self) -> DistanceReading {
        let Some(text) = self.read(Resource::DistToDestination).await else {
            return DistanceReading::Unavailable;
        };
        match parse_leading_int(&text).and_then(|v| u32::try_from(v).ok()) {
            Some(km) => DistanceReading::Km(km),
            None => {
                debug!(value = %text, "Distance to destination is not a number");
                DistanceReading::Unparsable
            }
        }
    }

    /// Build the combined `"<ete> | <distance> KM"` status line.
    ///
    /// Both resources are read concurrently and both must succeed; partial
    /// results are never returned.
    pub async fn status_line(&self) -> Option<String> {
        let (distance, ete) = tokio::join!(
            self.source.read_text(Resource::DistToDestination),
            self.source.read_text(Resource::EteText),
        );
        match (distance, ete) {
            (Ok(distance), Ok(ete)) => Some(format!("{} | {} KM", ete.trim(), distance.trim())),
            (Err(e), _) | (_, Err(e)) => {
                error!(source = self.source.name(), "Error fetching ETE data: {e}");
                None
            }
        }
    }
}
