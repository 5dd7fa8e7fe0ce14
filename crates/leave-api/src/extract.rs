//! Request extractors that reject with `AppError`
//!
//! Thin wrappers over the axum extractors so a malformed body, path or
//! query renders the same `{code, detail}` body as every other error.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON request body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// URL-encoded form body
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Form), rejection(AppError))]
pub struct ApiForm<T>(pub T);

/// Path parameters
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);

/// Query string
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::IntoResponse,
        routing::post,
        Router,
    };
    use serde::Deserialize;
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Payload {
        value: i64,
    }

    async fn echo(ApiPath(id): ApiPath<i64>, ApiJson(body): ApiJson<Payload>) -> String {
        format!("{id}:{}", body.value)
    }

    fn router() -> Router {
        Router::new().route("/items/:id", post(echo))
    }

    async fn call(uri: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap()
            .into_response();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or_default())
    }

    #[tokio::test]
    async fn test_valid_request_passes_through() {
        let response = router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/items/7")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"value": 3}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"7:3");
    }

    #[tokio::test]
    async fn test_missing_field_is_json_bad_request() {
        let (status, json) = call("/items/7", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
        assert!(json["detail"].as_str().unwrap().contains("value"));
    }

    #[tokio::test]
    async fn test_non_numeric_path_is_json_bad_request() {
        let (status, json) = call("/items/abc", r#"{"value": 3}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["code"], "BAD_REQUEST");
    }
}
