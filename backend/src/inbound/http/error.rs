//! HTTP adapter mapping for domain errors.
//!
//! Purpose: keep the domain error type HTTP-agnostic while turning failures
//! into the two public error shapes:
//!
//! - `400 {"error": "<message>"}` for malformed requests;
//! - `500 {"ok": false, "error": "Internal server error"}` for anything else.
//!
//! Both carry the `trace-id` header when a trace identifier was in scope.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::{Error, ErrorCode, TRACE_ID_HEADER};

/// Convenient result alias for HTTP handlers.
pub type ApiResult<T> = Result<T, Error>;

/// Message returned in place of internal error details.
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Present and `false` on server errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(example = false)]
    pub ok: Option<bool>,
    /// Human-readable message.
    #[schema(example = "lat and lng query parameters are required")]
    pub error: String,
}

impl ErrorResponse {
    fn from_domain(error: &Error) -> Self {
        match error.code() {
            ErrorCode::InvalidRequest => Self {
                ok: None,
                error: error.message().to_owned(),
            },
            ErrorCode::InternalError => Self {
                ok: Some(false),
                error: INTERNAL_ERROR_MESSAGE.to_owned(),
            },
        }
    }
}

const fn status_for(code: ErrorCode) -> StatusCode {
    match code {
        ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
        ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        status_for(self.code())
    }

    fn error_response(&self) -> HttpResponse {
        if matches!(self.code(), ErrorCode::InternalError) {
            error!(
                message = self.message(),
                trace_id = self.trace_id().unwrap_or_default(),
                "request failed with internal error"
            );
        }
        let mut builder = HttpResponse::build(self.status_code());
        if let Some(id) = self.trace_id() {
            builder.insert_header((TRACE_ID_HEADER, id.to_owned()));
        }
        builder.json(ErrorResponse::from_domain(self))
    }
}

impl From<actix_web::Error> for Error {
    fn from(err: actix_web::Error) -> Self {
        // Do not leak implementation details to clients.
        error!(error = %err, "actix error promoted to domain error");
        Self::internal(INTERNAL_ERROR_MESSAGE)
    }
}

#[cfg(test)]
mod tests {
    use actix_web::body::to_bytes;
    use rstest::rstest;
    use serde_json::{Value, json};

    use super::*;

    async fn body_json(response: HttpResponse) -> Value {
        let bytes = to_bytes(response.into_body()).await.expect("body");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[rstest]
    #[case(Error::invalid_request("bad"), StatusCode::BAD_REQUEST)]
    #[case(Error::internal("boom"), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_codes_to_statuses(#[case] error: Error, #[case] expected: StatusCode) {
        assert_eq!(error.status_code(), expected);
    }

    #[actix_web::test]
    async fn invalid_request_exposes_the_message() {
        let response = Error::invalid_request("lat must be a finite number").error_response();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"error": "lat must be a finite number"})
        );
    }

    #[actix_web::test]
    async fn internal_errors_are_redacted() {
        let response = Error::internal("redis pool exhausted")
            .with_trace_id("abc")
            .error_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response
                .headers()
                .get(TRACE_ID_HEADER)
                .and_then(|value| value.to_str().ok()),
            Some("abc")
        );
        assert_eq!(
            body_json(response).await,
            json!({"ok": false, "error": "Internal server error"})
        );
    }

    #[test]
    fn actix_errors_become_internal() {
        let actix = actix_web::error::ErrorBadGateway("upstream");
        let error = Error::from(actix);
        assert_eq!(error.code(), ErrorCode::InternalError);
        assert_eq!(error.message(), INTERNAL_ERROR_MESSAGE);
    }
}
