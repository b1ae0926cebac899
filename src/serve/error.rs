//! API error type for HTTP handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;

use tamarack::bounds::BoundsError;

/// Errors surfaced to HTTP callers.
///
/// Handlers return `Result<_, ApiError>`; every variant renders a concrete
/// status code with a `{"message": ...}` JSON body.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed client input
    BadRequest(String),
    /// Elasticsearch failure or unreachable cluster
    Upstream(anyhow::Error),
}

impl From<BoundsError> for ApiError {
    fn from(err: BoundsError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Upstream(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Upstream(err) => {
                tracing::error!("Query execution failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use tamarack::bounds::BoundsQuery;

    #[tokio::test]
    async fn test_bad_request_renders_400_with_message() {
        let response =
            ApiError::BadRequest("unrecognized bounds mode 'bogus'".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "unrecognized bounds mode 'bogus'");
    }

    #[tokio::test]
    async fn test_upstream_renders_500_with_message() {
        let response = ApiError::from(anyhow::anyhow!("search request failed")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["message"], "search request failed");
    }

    #[test]
    fn test_parse_errors_map_to_bad_request() {
        let err = ApiError::from("bogus/1/2".parse::<BoundsQuery>().unwrap_err());
        assert!(matches!(err, ApiError::BadRequest(_)));
    }
}
