//! Provider error types.

use crate::domain::Coordinate;

/// Errors from upstream providers (routing, transit, parking, geocoding).
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("JSON parse error: {message}")]
    Json {
        message: String,
        body: Option<String>,
    },

    /// API returned an error status code
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Invalid credentials
    #[error("unauthorized (invalid API key)")]
    Unauthorized,

    /// Provider asked us to slow down
    #[error("rate limited by provider")]
    RateLimited,

    /// Still rate limited after the retry bound
    #[error("still rate limited after {attempts} attempts")]
    RetryExhausted { attempts: u32 },

    /// Routing engine returned no route
    #[error("no route found")]
    NoRouteFound,

    /// No stop or point of interest near the coordinate
    #[error("no transit location near {0}")]
    LocationNotResolved(Coordinate),

    /// Geocoder found nothing for the address
    #[error("address not found: {0}")]
    AddressNotFound(String),

    /// Client could not be built from its configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Builds a `Json` error, keeping the start of the offending body.
    pub fn json(err: impl std::fmt::Display, body: &str) -> Self {
        ProviderError::Json {
            message: err.to_string(),
            body: Some(body.chars().take(500).collect()),
        }
    }

    /// True for legitimate "no answer" outcomes rather than faults.
    pub fn is_no_answer(&self) -> bool {
        matches!(
            self,
            ProviderError::NoRouteFound
                | ProviderError::LocationNotResolved(_)
                | ProviderError::AddressNotFound(_)
        )
    }
}
