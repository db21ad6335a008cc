//! OpenWeather API client.
//!
//! Stateless apart from the base URL and credential: builds the request,
//! executes it once and decodes the body. Retrying is left to the caller.

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::error::{Result, WeatherError};
use crate::types::{RawCity, RawWeatherPayload};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const ONE_CALL_PATH: &str = "/data/3.0/onecall";
const REVERSE_GEOCODE_PATH: &str = "/geo/1.0/reverse";
const EXCLUDE: &str = "minutely,alerts";
const UNITS: &str = "metric";

#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Url::parse(base_url)
            .map_err(|e| WeatherError::ProviderUnavailable(format!("invalid base URL: {}", e)))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch current conditions plus hourly and daily series for a coordinate.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_current_and_forecast(&self, lat: f64, lon: f64) -> Result<RawWeatherPayload> {
        let url = self.endpoint(
            ONE_CALL_PATH,
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("exclude", EXCLUDE.to_string()),
                ("units", UNITS.to_string()),
            ],
        )?;

        self.get_json(url).await
    }

    /// Reverse geocode a coordinate. Returns the first match's name, if any.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_city_name(&self, lat: f64, lon: f64) -> Result<Option<String>> {
        let url = self.endpoint(
            REVERSE_GEOCODE_PATH,
            &[
                ("lat", lat.to_string()),
                ("lon", lon.to_string()),
                ("limit", "1".to_string()),
            ],
        )?;

        let cities: Vec<RawCity> = self.get_json(url).await?;
        Ok(cities.into_iter().next().map(|city| city.name))
    }

    /// Build an endpoint URL. Every parameter, including the key, is form-encoded.
    fn endpoint(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| WeatherError::ProviderUnavailable(format!("invalid URL: {}", e)))?;

        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())))
            .append_pair("appid", &self.api_key);

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        tracing::debug!("GET {}{}", url.origin().ascii_serialization(), url.path());

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WeatherError::ProviderUnavailable(format!("{}: {}", status, text)));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| WeatherError::ProviderResponseInvalid(e.to_string()))
    }
}
