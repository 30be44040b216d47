use std::future::Future;

use thiserror::Error;

use crate::{matrix_grid::MatrixGrid, travel_mode::TravelMode};

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("API error: {status} - {message}")]
    Api { status: String, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// The request URL carries the API key in its query, so it is dropped here.
impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.without_url())
    }
}

/// One distance-matrix request: every origin against every destination.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixRequest {
    pub origins: Vec<geo_types::Point>,
    pub destinations: Vec<geo_types::Point>,
    pub mode: TravelMode,
}

impl MatrixRequest {
    pub fn new<P>(origins: &[P], destinations: &[P], mode: TravelMode) -> Self
    where
        for<'a> &'a P: Into<geo_types::Point>,
    {
        Self {
            origins: origins.iter().map(Into::into).collect(),
            destinations: destinations.iter().map(Into::into).collect(),
            mode,
        }
    }

    pub fn elements(&self) -> usize {
        self.origins.len() * self.destinations.len()
    }
}

pub trait DistanceMatrixService {
    /// Returns a grid with one row per origin and one column per destination,
    /// in request order.
    fn fetch_grid(
        &self,
        request: &MatrixRequest,
    ) -> impl Future<Output = Result<MatrixGrid, ProviderError>>;
}
