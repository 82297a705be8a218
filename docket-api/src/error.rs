/// Error handling for the API server
///
/// Every handler returns `Result<T, ApiError>`. Service errors are mapped to
/// status codes here; internal failures are logged and masked.
///
/// # Example
///
/// ```
/// use docket_api::error::{ApiError, ApiResult};
/// use axum::Json;
/// use serde_json::{json, Value};
///
/// async fn handler(found: bool) -> ApiResult<Json<Value>> {
///     if !found {
///         return Err(ApiError::NotFound("Client not found".to_string()));
///     }
///     Ok(Json(json!({ "ok": true })))
/// }
/// ```

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use docket_shared::auth::middleware::AuthError;
use docket_shared::error::{FieldIssue, ServiceError};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{ValidationErrors, ValidationErrorsKind};

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400)
    BadRequest(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403)
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409) - duplicate email or name, signed note
    Conflict(String),

    /// Unprocessable entity (422) - validation errors
    ValidationError(Vec<ValidationErrorDetail>),

    /// Internal server error (500)
    InternalError(String),

    /// Service unavailable (503)
    ServiceUnavailable(String),
}

/// Validation error detail
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    /// Field that failed validation
    pub field: String,

    /// Error message
    pub message: String,
}

impl From<FieldIssue> for ValidationErrorDetail {
    fn from(issue: FieldIssue) -> Self {
        Self {
            field: issue.field,
            message: issue.message,
        }
    }
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code (e.g., "bad_request", "unauthorized")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Optional validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            ApiError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, "forbidden", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                // Log internal errors but don't expose details to clients
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
            ApiError::ServiceUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "service_unavailable",
                msg,
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            details,
        });

        (status, body).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        let message = err.to_string();
        match err {
            ServiceError::NotFound(_) => ApiError::NotFound(message),

            ServiceError::EmailTaken
            | ServiceError::Duplicate(_)
            | ServiceError::AlreadyAffiliated
            | ServiceError::AlreadySigned
            | ServiceError::AlreadyVerified
            | ServiceError::NotVerified
            | ServiceError::SignedImmutable
            | ServiceError::InUse(_) => ApiError::Conflict(message),

            ServiceError::InvalidPayload(issues) => {
                ApiError::ValidationError(issues.into_iter().map(Into::into).collect())
            }

            ServiceError::MissingAddressFields(_)
            | ServiceError::PasswordRequired
            | ServiceError::SelfInvite
            | ServiceError::NoCompany
            | ServiceError::MissingSignature => ApiError::BadRequest(message),

            ServiceError::CodeMismatch { .. } => {
                ApiError::BadRequest("invalid verification code".to_string())
            }
            ServiceError::NoAttemptsLeft => ApiError::BadRequest("no attempts left".to_string()),

            ServiceError::BadCredentials => ApiError::Unauthorized(message),

            ServiceError::Deactivated | ServiceError::Forbidden(_) => ApiError::Forbidden(message),

            ServiceError::Store(docket_shared::store::StoreError::Conflict(constraint)) => {
                ApiError::Conflict(format!("Constraint violation: {}", constraint))
            }
            ServiceError::Store(docket_shared::store::StoreError::InUse(constraint)) => {
                ApiError::Conflict(format!("Still referenced: {}", constraint))
            }

            ServiceError::ArtifactUploadFailed(_)
            | ServiceError::RenderFailed(_)
            | ServiceError::Store(_)
            | ServiceError::Password(_)
            | ServiceError::Token(_) => ApiError::InternalError(message),
        }
    }
}

/// Flattens validation errors into `field`, `address.postal` or
/// `servicePrices[0].unitPrice` style paths
fn collect_validation(prefix: &str, errors: &ValidationErrors, out: &mut Vec<ValidationErrorDetail>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };

        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| ValidationErrorDetail {
                    field: path.clone(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("invalid {}", field)),
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_validation(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_validation(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Convert request validation failures into per-field details
impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        let mut details = Vec::new();
        collect_validation("", &errors, &mut details);

        details.sort_by(|a, b| a.field.cmp(&b.field));
        ApiError::ValidationError(details)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(format!("Malformed multipart body: {}", err))
    }
}

/// Convert token resolution errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::WrongScope(_) => ApiError::Forbidden(message),
            AuthError::Internal => ApiError::InternalError(message),
            _ => ApiError::Unauthorized(message),
        }
    }
}
