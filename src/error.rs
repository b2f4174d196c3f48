use axum::{http::StatusCode, response::IntoResponse, Json};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Location not found: {0}")]
    NotFound(String),

    #[error("Upstream rejected API key (401)")]
    Unauthorized,

    #[error("Upstream rate limit reached (429)")]
    RateLimited,

    #[error("Upstream service error {status}: {body}")]
    Service { status: u16, body: String },

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    /// True for failures that originate from the geocoding / air-pollution services.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            AppError::NotFound(_)
                | AppError::Unauthorized
                | AppError::RateLimited
                | AppError::Service { .. }
                | AppError::Http(_)
                | AppError::Json(_)
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InsufficientData { .. } | AppError::InvalidParameter(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            // A rejected key is our misconfiguration, not the client's.
            AppError::Unauthorized | AppError::Service { .. } | AppError::Http(_) | AppError::Json(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::Config(_) | AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = serde_json::json!({ "error": self.to_string() });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_are_client_errors() {
        let e = AppError::InsufficientData { required: 3, actual: 2 };
        assert_eq!(e.status_code(), StatusCode::BAD_REQUEST);
        assert!(!e.is_upstream());
        assert_eq!(
            e.to_string(),
            "Insufficient data: need at least 3 points, got 2"
        );
    }

    #[test]
    fn upstream_errors_map_to_gateway_statuses() {
        assert_eq!(AppError::Unauthorized.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(AppError::RateLimited.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::NotFound("Atlantis".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert!(AppError::Service { status: 500, body: "boom".into() }.is_upstream());
    }
}
