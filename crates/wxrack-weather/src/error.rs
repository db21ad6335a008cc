//! Weather pipeline error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeatherError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Invalid provider response: {0}")]
    ProviderResponseInvalid(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Stored snapshot is corrupt: {0}")]
    StoreCorrupt(String),
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::ProviderUnavailable(_) => "Weather service unavailable. Please try again later.",
            Self::ProviderResponseInvalid(_) => "Weather service returned unexpected data.",
            Self::StoreUnavailable(_) => "Unable to access cached weather data.",
            Self::StoreCorrupt(_) => "Cached weather data is corrupted and was ignored.",
        }
    }

    /// Whether the next scheduled cycle may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::ProviderResponseInvalid(e.to_string())
        } else {
            Self::ProviderUnavailable(e.to_string())
        }
    }
}

impl From<rusqlite::Error> for WeatherError {
    fn from(e: rusqlite::Error) -> Self {
        Self::StoreUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WeatherError>;
