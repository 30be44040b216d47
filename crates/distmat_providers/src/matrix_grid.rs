use std::fmt::Display;

use serde::{Deserialize, Serialize};

/// Outcome of a single origin/destination cell as reported by the provider.
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementStatus {
    Ok,
    NotFound,
    ZeroResults,
    MaxRouteLengthExceeded,
    #[serde(other)]
    Unknown,
}

impl ElementStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementStatus::Ok => "OK",
            ElementStatus::NotFound => "NOT_FOUND",
            ElementStatus::ZeroResults => "ZERO_RESULTS",
            ElementStatus::MaxRouteLengthExceeded => "MAX_ROUTE_LENGTH_EXCEEDED",
            ElementStatus::Unknown => "UNKNOWN",
        }
    }
}

impl Display for ElementStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq)]
pub struct GridCell {
    pub status: ElementStatus,

    /// Meters
    pub distance: Option<u64>,

    /// Seconds
    pub duration: Option<u64>,
}

impl GridCell {
    pub fn ok(distance: u64, duration: u64) -> Self {
        Self {
            status: ElementStatus::Ok,
            distance: Some(distance),
            duration: Some(duration),
        }
    }

    pub fn failed(status: ElementStatus) -> Self {
        Self {
            status,
            distance: None,
            duration: None,
        }
    }
}

/// MatrixGrid holds one cell per origin/destination combination.
/// Stored row-major as a flat vector: rows are origins, columns are destinations.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MatrixGrid {
    origins: usize,
    destinations: usize,
    cells: Vec<GridCell>,
}

impl MatrixGrid {
    /// Returns `None` when `cells` does not hold exactly `origins * destinations` entries.
    pub fn new(origins: usize, destinations: usize, cells: Vec<GridCell>) -> Option<Self> {
        if cells.len() != origins * destinations {
            return None;
        }

        Some(Self {
            origins,
            destinations,
            cells,
        })
    }

    pub fn origins(&self) -> usize {
        self.origins
    }

    pub fn destinations(&self) -> usize {
        self.destinations
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&GridCell> {
        if row >= self.origins || column >= self.destinations {
            return None;
        }

        self.cells.get(row * self.destinations + column)
    }
}
