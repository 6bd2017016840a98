//! Gateway error to HTTP response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use switchyard_core::GatewayError;

/// Wraps [`GatewayError`] for axum responses.
#[derive(Debug)]
pub struct ApiError(pub GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// Shorthand for a malformed-request rejection.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self(GatewayError::InvalidRequest(message.into()))
    }

    fn status_code(&self) -> StatusCode {
        match &self.0 {
            GatewayError::NoCredentialAvailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::ProviderNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::ModelNotRoutable(_) | GatewayError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::InvalidCredential { .. } | GatewayError::Upstream { .. } => {
                StatusCode::BAD_GATEWAY
            }
            GatewayError::Serialization(_) | GatewayError::Persistence(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::ProviderId;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                GatewayError::NoCredentialAvailable {
                    provider: ProviderId::OpenAi,
                },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                GatewayError::RateLimited {
                    provider: ProviderId::OpenAi,
                },
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                GatewayError::ProviderNotFound("x".into()),
                StatusCode::NOT_FOUND,
            ),
            (
                GatewayError::ModelNotRoutable("m".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                GatewayError::Upstream {
                    provider: ProviderId::Cody,
                    message: "boom".into(),
                },
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status_code(), expected);
        }
    }
}
