use thiserror::Error;

/// Failures of a single refinement call.
///
/// `Configuration` and `Transport` reach the caller. `MalformedResponse` is
/// produced by the structured decoder and absorbed by the heuristic fallback,
/// so `SuggestionService` never returns it.
#[derive(Debug, Error)]
pub enum RefineError {
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl RefineError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            status: None,
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Transport {
            status: Some(status),
            message: format!("HTTP {}: {}", status, message.into()),
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}

impl From<reqwest::Error> for RefineError {
    fn from(err: reqwest::Error) -> Self {
        // URLs may carry credentials in their query
        let err = err.without_url();
        Self::Transport {
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RefineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_status() {
        let err = RefineError::status(429, "Too Many Requests");
        assert_eq!(
            err.to_string(),
            "transport error: HTTP 429: Too Many Requests"
        );
        assert!(err.is_transport());
    }

    #[test]
    fn test_transport_display_without_status() {
        let err = RefineError::transport("connection refused");
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn test_configuration_kind() {
        let err = RefineError::Configuration("API key not configured".to_string());
        assert!(err.is_configuration());
        assert!(!err.is_transport());
    }
}
