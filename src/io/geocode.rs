//! Reverse-geocoding collaborator.
//!
//! The pipeline only needs one lookup per record (centroid -> country), so
//! the default implementation is a small blocking client against a
//! Nominatim-compatible endpoint. Lookups are best-effort; callers fall back
//! to "Unknown" on any error.
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Malformed geocoding response: {0}")]
    Malformed(String),
}

/// Resolves a (latitude, longitude) position into an address mapping.
pub trait ReverseGeocoder: Send + Sync {
    fn reverse(&self, lat: f64, lon: f64) -> Result<serde_json::Value, GeocodeError>;
}

/// Reverse geocoder backed by the public Nominatim HTTP API.
pub struct NominatimGeocoder {
    client: reqwest::blocking::Client,
    endpoint: String,
}

impl NominatimGeocoder {
    pub const DEFAULT_ENDPOINT: &'static str = "https://nominatim.openstreetmap.org";

    pub fn new(user_agent: &str) -> Result<Self, GeocodeError> {
        Self::with_endpoint(user_agent, Self::DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(user_agent: &str, endpoint: &str) -> Result<Self, GeocodeError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(NominatimGeocoder {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }
}

impl ReverseGeocoder for NominatimGeocoder {
    fn reverse(&self, lat: f64, lon: f64) -> Result<serde_json::Value, GeocodeError> {
        debug!(lat, lon, "reverse geocoding request");
        let response = self
            .client
            .get(format!("{}/reverse", self.endpoint))
            .query(&[
                ("format", "jsonv2"),
                ("lat", &lat.to_string()),
                ("lon", &lon.to_string()),
                ("accept-language", "en"),
            ])
            .send()?
            .error_for_status()?;
        let value: serde_json::Value = response.json()?;
        if !value.is_object() {
            return Err(GeocodeError::Malformed(
                "expected a JSON object".to_string(),
            ));
        }
        Ok(value)
    }
}
