use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Message stored for a site whose latest fetch failed.
pub const FETCH_FAILED_MESSAGE: &str = "Failed to fetch weather data.";

/// A configured site to fetch weather for. `name` is the snapshot key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Site {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

impl Site {
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
        }
    }
}

/// Display icon categories mapped from provider icon codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayIcon {
    ClearDay,
    ClearNight,
    PartlyCloudyDay,
    PartlyCloudyNight,
    Cloudy,
    Overcast,
    Showers,
    RainDay,
    RainNight,
    Thunderstorm,
    Snow,
    Mist,
}

impl DisplayIcon {
    /// Convert a provider icon code (e.g. `"01d"`) to a display icon.
    /// See: https://openweathermap.org/weather-conditions
    ///
    /// Unknown codes yield `None`.
    pub fn from_provider_code(code: &str) -> Option<Self> {
        let icon = match code {
            "01d" => Self::ClearDay,
            "01n" => Self::ClearNight,
            "02d" => Self::PartlyCloudyDay,
            "02n" => Self::PartlyCloudyNight,
            "03d" | "03n" => Self::Cloudy,
            "04d" | "04n" => Self::Overcast,
            "09d" | "09n" => Self::Showers,
            "10d" => Self::RainDay,
            "10n" => Self::RainNight,
            "11d" | "11n" => Self::Thunderstorm,
            "13d" | "13n" => Self::Snow,
            "50d" | "50n" => Self::Mist,
            _ => return None,
        };
        Some(icon)
    }
}

// ---------------------------------------------------------------------------
// Provider payload (one-call endpoint). Only the fields we normalize are kept.
// ---------------------------------------------------------------------------

/// Raw response of the aggregate weather endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWeatherPayload {
    pub current: RawCurrent,
    #[serde(default)]
    pub hourly: Option<Vec<RawHourly>>,
    #[serde(default)]
    pub daily: Option<Vec<RawDaily>>,
    pub timezone: String,
    /// Shift in seconds from UTC
    pub timezone_offset: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCondition {
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawCurrent {
    pub temp: f64,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
    pub clouds: f64,
    #[serde(default)]
    pub visibility: Option<f64>,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_deg: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawHourly {
    /// Unix seconds
    pub dt: i64,
    pub temp: f64,
    pub humidity: f64,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDailyTemp {
    pub day: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawDaily {
    /// Unix seconds
    pub dt: i64,
    pub temp: RawDailyTemp,
    pub humidity: f64,
    #[serde(default)]
    pub weather: Vec<RawCondition>,
}

/// One entry of the reverse geocoding response.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCity {
    pub name: String,
}

// ---------------------------------------------------------------------------
// Normalized output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub deg: f64,
}

/// Current conditions for a site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherOverview {
    pub temperature: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<DisplayIcon>,
    pub clouds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f64>,
    pub humidity: f64,
    pub wind: Wind,
    pub timezone: String,
    /// Wall-clock time at the site, formatted for display
    pub time: String,
}

/// A single time-bucketed forecast sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Epoch milliseconds
    pub datetime: i64,
    pub temperature: f64,
    pub humidity: f64,
    pub description: String,
}

/// Normalized data for a site after a successful fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteReport {
    pub overview: WeatherOverview,
    #[serde(rename = "forecast5d")]
    pub forecast_5d: Vec<ForecastPoint>,
    #[serde(
        rename = "forecast24h",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub forecast_24h: Option<Vec<ForecastPoint>>,
}

/// Latest state of one site: either a report or the failure marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SiteSnapshot {
    Report(SiteReport),
    Failed { error: String },
}

impl SiteSnapshot {
    /// The marker written when a site's fetch fails.
    pub fn failed() -> Self {
        Self::Failed {
            error: FETCH_FAILED_MESSAGE.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn report(&self) -> Option<&SiteReport> {
        match self {
            Self::Report(report) => Some(report),
            Self::Failed { .. } => None,
        }
    }
}

impl From<SiteReport> for SiteSnapshot {
    fn from(report: SiteReport) -> Self {
        Self::Report(report)
    }
}

/// Site name to latest snapshot. The unit of caching and persistence.
pub type SnapshotMap = BTreeMap<String, SiteSnapshot>;
