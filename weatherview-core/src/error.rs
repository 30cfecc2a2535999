use reqwest::StatusCode;

use crate::model::ErrorPayload;

/// Failures produced while talking to the weather provider or validating input.
///
/// The `Display` text of each variant is what ends up in the `error` field of an
/// [`ErrorPayload`], so it is user-facing.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Network failure reported by the HTTP client.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status without a provider error body.
    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("Invalid JSON response")]
    InvalidJson,

    /// The provider answered with an application error code (`cod != 200`).
    #[error("{message}")]
    Provider { code: String, message: String },

    #[error("No cities found")]
    NoCitiesFound,

    #[error("Invalid city name")]
    InvalidCityName,

    #[error("Empty search query")]
    EmptyQuery,
}

impl ApiError {
    pub fn into_payload(self, city_name: Option<String>) -> ErrorPayload {
        ErrorPayload {
            error: self.to_string(),
            city_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_error_payload_text() {
        assert_eq!(ApiError::InvalidJson.to_string(), "Invalid JSON response");
        assert_eq!(ApiError::InvalidCityName.to_string(), "Invalid city name");
        assert_eq!(ApiError::EmptyQuery.to_string(), "Empty search query");
        assert_eq!(ApiError::Status(StatusCode::BAD_GATEWAY).to_string(), "HTTP 502 Bad Gateway");
    }

    #[test]
    fn provider_error_carries_provider_message() {
        let err = ApiError::Provider {
            code: "404".into(),
            message: "city not found".into(),
        };
        let payload = err.into_payload(Some("Atlantis".into()));

        assert_eq!(payload.error, "city not found");
        assert_eq!(payload.city_name.as_deref(), Some("Atlantis"));
    }
}
