use distmat_providers::matrix_grid::{ElementStatus, GridCell};
use serde::Serialize;

/// One row of the output table. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceResult {
    pub origin_id: String,
    pub destination_id: String,

    /// Meters
    pub distance_m: Option<u64>,

    /// Seconds
    pub duration_s: Option<u64>,

    pub status: ElementStatus,
}

impl DistanceResult {
    pub fn new(origin_id: impl Into<String>, destination_id: impl Into<String>, cell: &GridCell) -> Self {
        Self {
            origin_id: origin_id.into(),
            destination_id: destination_id.into(),
            distance_m: cell.distance,
            duration_s: cell.duration,
            status: cell.status,
        }
    }
}
