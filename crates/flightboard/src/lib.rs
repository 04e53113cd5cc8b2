//! `flightboard` - A live flight progress board
//!
//! This library polls a handful of plain-text flight resources, turns the
//! remaining distance into a progress display with a moving aircraft marker,
//! keeps a flight table sorted, and reloads the whole board when the flight
//! status changes.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod animation;
pub mod assets;
pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod progress;
pub mod render;
pub mod storage;
pub mod supervisor;
pub mod table;
pub mod view;
pub mod watcher;

pub use board::{Board, BoardOptions};
pub use config::Config;
pub use error::{Error, Result};
pub use fetch::{DataFetcher, TextSource};
pub use logging::init_logging;
pub use progress::{ProgressEngine, ProgressPlan, Regime};
pub use storage::Storage;
pub use table::{FlightTable, SortController, SortDirection};
pub use view::{BoardView, ProgressView};
