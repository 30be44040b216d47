use serde::Deserialize;
use tracing::debug;

use crate::{
    google_maps_api::{GoogleMapsClientParams, build_http_client, read_success_body},
    matrix_service::ProviderError,
};

pub const GOOGLE_MAPS_GEOCODE_PATH: &str = "/geocode/json";

#[derive(Deserialize)]
struct GeocodeLocation {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct GeocodeGeometry {
    location: GeocodeLocation,
}

#[derive(Deserialize)]
struct GeocodeResult {
    geometry: GeocodeGeometry,
}

#[derive(Deserialize)]
struct GeocodeResponse {
    status: String,

    #[serde(default)]
    error_message: Option<String>,

    #[serde(default)]
    results: Vec<GeocodeResult>,
}

/// Returns the first result's location, or `None` when the address did not resolve.
pub fn parse_geocode_response(body: &str) -> Result<Option<geo_types::Point>, ProviderError> {
    let response: GeocodeResponse = serde_json::from_str(body)?;

    match response.status.as_str() {
        "OK" => Ok(response
            .results
            .first()
            .map(|result| geo_types::Point::new(result.geometry.location.lng, result.geometry.location.lat))),
        "ZERO_RESULTS" => Ok(None),
        _ => Err(ProviderError::Api {
            status: response.status,
            message: response.error_message.unwrap_or_default(),
        }),
    }
}

pub struct GoogleGeocodingClient {
    params: GoogleMapsClientParams,
    client: reqwest::Client,
}

impl GoogleGeocodingClient {
    pub fn new(params: GoogleMapsClientParams) -> Result<Self, ProviderError> {
        let client = build_http_client(&params)?;
        Ok(Self { params, client })
    }

    pub async fn geocode(&self, address: &str) -> Result<Option<geo_types::Point>, ProviderError> {
        let url = format!(
            "{}{}",
            self.params.base_url.trim_end_matches('/'),
            GOOGLE_MAPS_GEOCODE_PATH
        );

        debug!("GoogleGeocodingApi: geocoding {:?}", address);

        let response = self
            .client
            .get(url)
            .query(&[("address", address), ("key", self.params.api_key.as_str())])
            .send()
            .await?;

        let body = read_success_body(response).await?;
        parse_geocode_response(&body)
    }
}
