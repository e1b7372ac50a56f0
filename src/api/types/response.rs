//! Response envelope for the purchasing API
//!
//! Every endpoint answers with one JSON shape: a numeric `code` (0 on
//! success), a short `msg`, and the payload under `data`. Domain failures
//! arrive as [`AppError`] and leave as the matching 400/404/409/500 with
//! the code constants below, so clients can branch without parsing text.

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::errors::AppError;

/// JSON envelope wrapping every payload this API emits.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// 0 on success, one of [`error_codes`] otherwise.
    #[schema(example = 0)]
    pub code: i32,
    #[schema(example = "ok")]
    pub msg: String,
    /// Payload; omitted entirely on errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Handler return type: an HTTP status plus the envelope, on both arms.
pub type ApiResult<T> =
    Result<(StatusCode, Json<ApiResponse<T>>), (StatusCode, Json<ApiResponse<()>>)>;

/// 200 with a success envelope around `data`.
#[inline]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// Error half of the envelope: HTTP status plus a machine-readable code.
///
/// Build one through the named constructors (or `From<AppError>`); it
/// renders straight into a response or folds into [`ApiResult`] via
/// [`ApiError::into_err`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, code: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 400: malformed input, bad quantities, invalid card.
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_PARAMETER, msg)
    }

    /// 404: user, product, coupon or order missing / not owned.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, error_codes::NOT_FOUND, msg)
    }

    /// 409: optimistic-concurrency loser (coupon already used).
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, error_codes::CONFLICT, msg)
    }

    /// 500: unexpected failure; the message is already sanitized.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            msg,
        )
    }

    /// 503: a dependency (database) is unreachable.
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::SERVICE_UNAVAILABLE,
            error_codes::SERVICE_UNAVAILABLE,
            msg,
        )
    }

    /// Fold into the error arm of an [`ApiResult`].
    pub fn into_err<T>(self) -> ApiResult<T> {
        Err(self.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let ApiError { status, code, message } = self;
        (status, Json(ApiResponse::<()>::error(code, message))).into_response()
    }
}

/// Lets handler helpers use `?` on anything yielding an [`ApiError`].
impl From<ApiError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(err: ApiError) -> Self {
        (
            err.status,
            Json(ApiResponse::<()>::error(err.code, err.message)),
        )
    }
}

/// The [`AppError`] taxonomy maps one-to-one onto the HTTP surface.
/// Internal detail is logged here and replaced before it reaches a client.
impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::BadRequest(msg) => ApiError::bad_request(msg),
            AppError::NotFound(msg) => ApiError::not_found(msg),
            AppError::Conflict(msg) => ApiError::conflict(msg),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error surfaced to API");
                ApiError::internal("internal error")
            }
        }
    }
}

/// Machine-readable error codes carried in the envelope.
pub mod error_codes {
    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;

    // Resource errors (4xxx)
    pub const NOT_FOUND: i32 = 4041;
    pub const CONFLICT: i32 = 4091;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_mapping() {
        let e: ApiError = AppError::conflict("coupon already used").into();
        assert_eq!(e.status, StatusCode::CONFLICT);
        assert_eq!(e.code, error_codes::CONFLICT);
        assert_eq!(e.message, "coupon already used");

        let e: ApiError = AppError::not_found("no such order").into();
        assert_eq!(e.status, StatusCode::NOT_FOUND);

        let e: ApiError = AppError::bad_request("bad qty").into();
        assert_eq!(e.status, StatusCode::BAD_REQUEST);

        // Internal details never leak to the client.
        let e: ApiError = AppError::internal("connection pool exhausted").into();
        assert_eq!(e.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(e.message, "internal error");
    }

    #[test]
    fn test_envelope_shape() {
        let success = serde_json::to_value(ApiResponse::success(7)).unwrap();
        assert_eq!(success["code"], 0);
        assert_eq!(success["msg"], "ok");
        assert_eq!(success["data"], 7);

        let error = serde_json::to_value(ApiResponse::<()>::error(
            error_codes::CONFLICT,
            "coupon already used",
        ))
        .unwrap();
        assert_eq!(error["code"], error_codes::CONFLICT);
        // The data key disappears on the error arm.
        assert!(error.get("data").is_none());
    }
}
