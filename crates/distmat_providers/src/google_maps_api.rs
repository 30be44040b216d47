use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::{
    matrix_grid::{ElementStatus, GridCell, MatrixGrid},
    matrix_service::{DistanceMatrixService, MatrixRequest, ProviderError},
};

pub const GOOGLE_MAPS_API_URL: &str = "https://maps.googleapis.com/maps/api";
pub const GOOGLE_MAPS_DISTANCE_MATRIX_PATH: &str = "/distancematrix/json";

/// Documented per-request caps of the Distance Matrix API.
pub const GOOGLE_MAPS_MAX_ELEMENTS: usize = 100;
pub const GOOGLE_MAPS_MAX_LOCATIONS: usize = 25;

/// Google reports integer meters and seconds in `value`.
#[derive(Deserialize)]
struct TextValue {
    value: u64,
}

#[derive(Deserialize)]
struct DistanceMatrixElement {
    status: ElementStatus,
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Deserialize)]
struct DistanceMatrixRow {
    elements: Vec<DistanceMatrixElement>,
}

#[derive(Deserialize)]
struct DistanceMatrixResponse {
    status: String,

    #[serde(default)]
    error_message: Option<String>,

    #[serde(default)]
    origin_addresses: Vec<String>,

    #[serde(default)]
    destination_addresses: Vec<String>,

    #[serde(default)]
    rows: Vec<DistanceMatrixRow>,
}

#[derive(Debug, Clone)]
pub struct GoogleMapsClientParams {
    pub api_key: String,
    pub base_url: String,

    /// Falls back to the HTTP client's default when unset
    pub timeout: Option<Duration>,
}

impl GoogleMapsClientParams {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GOOGLE_MAPS_API_URL.to_string(),
            timeout: None,
        }
    }
}

pub(crate) fn build_http_client(
    params: &GoogleMapsClientParams,
) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = params.timeout {
        builder = builder.timeout(timeout);
    }

    Ok(builder.build()?)
}

pub(crate) async fn read_success_body(response: reqwest::Response) -> Result<String, ProviderError> {
    if response.status().is_success() {
        Ok(response.text().await?)
    } else {
        let status = response.status().as_u16();
        let message = response.text().await.unwrap_or_default();
        Err(ProviderError::Http { status, message })
    }
}

fn format_points(points: &[geo_types::Point]) -> String {
    points
        .iter()
        .map(|point| format!("{},{}", point.y(), point.x()))
        .collect::<Vec<_>>()
        .join("|")
}

/// Turns a Distance Matrix JSON body into a grid of `origins` rows by `destinations` columns.
pub fn parse_matrix_response(
    body: &str,
    origins: usize,
    destinations: usize,
) -> Result<MatrixGrid, ProviderError> {
    let response: DistanceMatrixResponse = serde_json::from_str(body)?;

    if response.status != "OK" {
        return Err(ProviderError::Api {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        });
    }

    if response.rows.len() != origins {
        return Err(ProviderError::MalformedResponse(format!(
            "expected {} rows, got {}",
            origins,
            response.rows.len()
        )));
    }

    debug!(
        "GoogleMapsApi: resolved origins {:?} and destinations {:?}",
        response.origin_addresses, response.destination_addresses
    );

    let mut cells = Vec::with_capacity(origins * destinations);
    for (i, row) in response.rows.into_iter().enumerate() {
        if row.elements.len() != destinations {
            return Err(ProviderError::MalformedResponse(format!(
                "row {} has {} elements, expected {}",
                i,
                row.elements.len(),
                destinations
            )));
        }

        for (j, element) in row.elements.into_iter().enumerate() {
            let cell = match element.status {
                ElementStatus::Ok => match (element.distance, element.duration) {
                    (Some(distance), Some(duration)) => GridCell::ok(distance.value, duration.value),
                    _ => {
                        return Err(ProviderError::MalformedResponse(format!(
                            "element ({}, {}) is OK but lacks distance or duration",
                            i, j
                        )));
                    }
                },
                status => GridCell::failed(status),
            };
            cells.push(cell);
        }
    }

    MatrixGrid::new(origins, destinations, cells).ok_or_else(|| {
        ProviderError::MalformedResponse("grid shape does not match request".to_string())
    })
}

pub struct GoogleMapsMatrixClient {
    params: GoogleMapsClientParams,
    client: reqwest::Client,
}

impl GoogleMapsMatrixClient {
    pub fn new(params: GoogleMapsClientParams) -> Result<Self, ProviderError> {
        let client = build_http_client(&params)?;
        Ok(Self { params, client })
    }
}

impl DistanceMatrixService for GoogleMapsMatrixClient {
    async fn fetch_grid(&self, request: &MatrixRequest) -> Result<MatrixGrid, ProviderError> {
        let origins = request.origins.len();
        let destinations = request.destinations.len();

        if origins == 0 || destinations == 0 {
            return MatrixGrid::new(origins, destinations, Vec::new()).ok_or_else(|| {
                ProviderError::MalformedResponse("empty request".to_string())
            });
        }

        let url = format!(
            "{}{}",
            self.params.base_url.trim_end_matches('/'),
            GOOGLE_MAPS_DISTANCE_MATRIX_PATH
        );

        debug!(
            "GoogleMapsApi: requesting {}x{} matrix ({})",
            origins, destinations, request.mode
        );

        let response = self
            .client
            .get(url)
            .query(&[
                ("origins", format_points(&request.origins).as_str()),
                ("destinations", format_points(&request.destinations).as_str()),
                ("mode", request.mode.as_str()),
                ("units", "metric"),
                ("key", self.params.api_key.as_str()),
            ])
            .send()
            .await?;

        let body = read_success_body(response).await?;
        parse_matrix_response(&body, origins, destinations)
    }
}
