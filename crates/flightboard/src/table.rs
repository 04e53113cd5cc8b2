//! Flight table and its sort controller.
//!
//! The board's table has two leading rows (column headers and the progress
//! bar) followed by one row per flight. Only flight rows are stored here, so
//! sorting can never move the leading rows.

use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::storage::{keys, Storage};

/// Column holding the flight status.
pub const DEFAULT_STATUS_COLUMN: usize = 3;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// The persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Arrow used in rendered headers.
    #[must_use]
    pub const fn arrow(self) -> char {
        match self {
            Self::Asc => '▲',
            Self::Desc => '▼',
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(Error::internal(format!("unknown sort direction: {other}"))),
        }
    }
}

/// A column header and its sort indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnHeader {
    /// Header text.
    pub label: String,
    /// Set on the column the table is currently sorted by.
    pub indicator: Option<SortDirection>,
}

/// Result of one sort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SortOutcome {
    /// Column sorted by.
    pub column: usize,
    /// Final direction, after any flip.
    pub direction: SortDirection,
    /// Number of adjacent swaps performed.
    pub swaps: usize,
    /// Whether an already ascending table flipped to descending.
    pub flipped: bool,
}

/// The flight table.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FlightTable {
    headers: Vec<ColumnHeader>,
    flights: Vec<Vec<String>>,
}

impl FlightTable {
    /// Build a table from header labels and flight rows.
    #[must_use]
    pub fn new(labels: Vec<String>, flights: Vec<Vec<String>>) -> Self {
        let headers = labels
            .into_iter()
            .map(|label| ColumnHeader {
                label,
                indicator: None,
            })
            .collect();
        Self { headers, flights }
    }

    /// Read a table from CSV. The first record holds the header labels;
    /// rows may have fewer or more cells than there are headers.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV cannot be parsed.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let labels = reader.headers()?.iter().map(str::to_string).collect();
        let flights = reader
            .records()
            .map(|record| record.map(|r| r.iter().map(str::to_string).collect()))
            .collect::<std::result::Result<Vec<Vec<String>>, csv::Error>>()?;

        Ok(Self::new(labels, flights))
    }

    /// Load a table from a CSV file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or has no header row.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let table = Self::from_csv_reader(file)?;
        if table.headers.is_empty() {
            return Err(Error::EmptyTable {
                path: path.to_path_buf(),
            });
        }
        debug!(path = %path.display(), flights = table.flights.len(), "Loaded flight table");
        Ok(table)
    }

    /// Column headers.
    #[must_use]
    pub fn headers(&self) -> &[ColumnHeader] {
        &self.headers
    }

    /// Flight rows, in display order.
    #[must_use]
    pub fn flights(&self) -> &[Vec<String>] {
        &self.flights
    }

    /// Values of one column, in display order. Missing cells are empty.
    #[must_use]
    pub fn column(&self, column: usize) -> Vec<&str> {
        self.flights.iter().map(|row| cell(row, column)).collect()
    }

    /// The column currently marked as sorted, if any.
    #[must_use]
    pub fn sorted_by(&self) -> Option<(usize, SortDirection)> {
        self.headers
            .iter()
            .enumerate()
            .find_map(|(i, h)| h.indicator.map(|d| (i, d)))
    }

    /// Sort flight rows by a column.
    ///
    /// Adjacent rows are swapped until a full pass finds nothing out of
    /// order, comparing cells case-insensitively. If an ascending sort found
    /// the rows already in order without a single swap, the direction flips
    /// to descending and sorting continues; a descending sort never flips.
    pub fn sort(&mut self, column: usize, direction: SortDirection) -> SortOutcome {
        let mut direction = direction;
        let mut swaps = 0;
        let mut flipped = false;

        loop {
            let out_of_order = (0..self.flights.len().saturating_sub(1)).find(|&i| {
                let x = cell(&self.flights[i], column).to_lowercase();
                let y = cell(&self.flights[i + 1], column).to_lowercase();
                match direction {
                    SortDirection::Asc => x > y,
                    SortDirection::Desc => x < y,
                }
            });

            match out_of_order {
                Some(i) => {
                    self.flights.swap(i, i + 1);
                    swaps += 1;
                }
                None if swaps == 0 && direction == SortDirection::Asc => {
                    direction = SortDirection::Desc;
                    flipped = true;
                }
                None => break,
            }
        }

        for header in &mut self.headers {
            header.indicator = None;
        }
        match self.headers.get_mut(column) {
            Some(header) => header.indicator = Some(direction),
            None => warn!(column, "Sorted by a column without a header"),
        }

        SortOutcome {
            column,
            direction,
            swaps,
            flipped,
        }
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map_or("", String::as_str)
}

/// Persisted sort column and direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    /// Column index.
    pub column: usize,
    /// Direction.
    pub direction: SortDirection,
}

impl SortState {
    /// Load the persisted state. Both values must be present and valid.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage query fails.
    pub fn load(store: &Storage) -> Result<Option<Self>> {
        let column = store.get(keys::SORT_COLUMN_INDEX)?;
        let Some(direction) = Self::load_direction(store)? else {
            return Ok(None);
        };
        let Some(column) = column else {
            return Ok(None);
        };
        match column.trim().parse() {
            Ok(column) => Ok(Some(Self { column, direction })),
            Err(_) => {
                warn!(value = %column, "Ignoring invalid persisted sort column");
                Ok(None)
            }
        }
    }

    /// Load only the persisted direction.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage query fails.
    pub fn load_direction(store: &Storage) -> Result<Option<SortDirection>> {
        let Some(value) = store.get(keys::SORT_DIRECTION)? else {
            return Ok(None);
        };
        match value.parse() {
            Ok(direction) => Ok(Some(direction)),
            Err(_) => {
                warn!(%value, "Ignoring invalid persisted sort direction");
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
        store.set(keys::SORT_COLUMN_INDEX, &self.column.to_string())?;
        store.set(keys::SORT_DIRECTION, self.direction.as_str())?;
        Ok(())
    }
}

impl From<SortOutcome> for SortState {
    fn from(outcome: SortOutcome) -> Self {
        Self {
            column: outcome.column,
            direction: outcome.direction,
        }
    }
}

/// Sorts the flight table and keeps the persisted sort state current.
#[derive(Debug, Clone, Copy)]
pub struct SortController {
    status_column: usize,
}

impl SortController {
    /// A controller whose default and automatic sorts use `status_column`.
    #[must_use]
    pub fn new(status_column: usize) -> Self {
        Self { status_column }
    }

    /// The status column.
    #[must_use]
    pub fn status_column(&self) -> usize {
        self.status_column
    }

    /// Sort by `column` and persist the resulting state.
    ///
    /// # Errors
    ///
    /// Returns an error if persisting fails; the table is sorted regardless.
    pub fn sort(
        &self,
        table: &mut FlightTable,
        store: &Storage,
        column: usize,
        direction: SortDirection,
    ) -> Result<SortOutcome> {
        let outcome = table.sort(column, direction);
        debug!(
            column,
            direction = %outcome.direction,
            swaps = outcome.swaps,
            flipped = outcome.flipped,
            "Sorted flight table"
        );
        SortState::from(outcome).save(store)?;
        Ok(outcome)
    }

    /// Re-apply the persisted sort, or sort by status ascending if there is none.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or persisting the sort state fails.
    pub fn restore(&self, table: &mut FlightTable, store: &Storage) -> Result<SortOutcome> {
        let state = SortState::load(store)?.unwrap_or(SortState {
            column: self.status_column,
            direction: SortDirection::Asc,
        });
        self.sort(table, store, state.column, state.direction)
    }

    /// Periodic re-sort by the status column in the persisted direction.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or persisting the sort state fails.
    pub fn auto_sort(&self, table: &mut FlightTable, store: &Storage) -> Result<SortOutcome> {
        let direction = SortState::load_direction(store)?.unwrap_or_default();
        self.sort(table, store, self.status_column, direction)
    }
}

impl Default for SortController {
    fn default() -> Self {
        Self::new(DEFAULT_STATUS_COLUMN)
    }
}
