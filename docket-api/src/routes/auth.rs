/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register and receive an access token
/// - `POST /v1/auth/login` - Login with email and password
/// - `PUT /v1/auth/verify-email` - Confirm the emailed 6-digit code (access token)
/// - `POST /v1/auth/verify-email/resend` - Issue a fresh code (access token)
/// - `POST /v1/auth/password/forgot` - Email a password reset code
/// - `POST /v1/auth/password/verify` - Exchange a reset code for a reset token
/// - `PATCH /v1/auth/password` - Set a new password (access or reset token)

use crate::{app::AppState, error::ApiResult, routes::validate_code};
use axum::{extract::State, http::StatusCode, Extension, Json};
use docket_shared::{
    auth::middleware::AuthContext,
    models::user::MinimalUser,
    services::accounts::{AuthSession, Registration},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,

    #[validate(length(max = 100, message = "Surnames must be at most 100 characters"))]
    pub surnames: Option<String>,

    #[validate(length(min = 1, max = 20, message = "NIF must be 1 to 20 characters"))]
    pub nif: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Verification code submission
#[derive(Debug, Deserialize, Validate)]
pub struct CodeRequest {
    #[validate(custom(function = "validate_code"))]
    pub code: String,
}

/// Forgot password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Reset code submission
#[derive(Debug, Deserialize, Validate)]
pub struct ResetCodeRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_code"))]
    pub code: String,
}

/// Short-lived token accepted by `PATCH /v1/auth/password`
#[derive(Debug, Serialize, Deserialize)]
pub struct ResetTokenResponse {
    pub token: String,
}

/// New password
///
/// A missing or empty password is passed through so the service reports it
/// as `400 Bad Request`.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: Option<String>,
}

/// Register a new user
///
/// A verification code is emailed; the account starts unverified.
///
/// # Errors
///
/// - `409 Conflict`: Email already registered
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthSession>)> {
    req.validate()?;

    let session = state
        .services
        .accounts
        .register(Registration {
            email: req.email,
            password: req.password,
            name: req.name,
            surnames: req.surnames,
            nif: req.nif,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(session)))
}

/// Login endpoint
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid credentials
/// - `403 Forbidden`: Account deactivated
/// - `409 Conflict`: Invited guest that never verified
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthSession>> {
    req.validate()?;

    let session = state
        .services
        .accounts
        .login(&req.email, &req.password)
        .await?;

    Ok(Json(session))
}

/// Confirms the caller's email with the emailed code
///
/// Each wrong code consumes one of three tries.
pub async fn verify_email(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CodeRequest>,
) -> ApiResult<Json<MinimalUser>> {
    req.validate()?;

    let user = state
        .services
        .accounts
        .verify_email(auth.user_id, &req.code)
        .await?;

    Ok(Json(user))
}

/// Issues and emails a fresh verification code
pub async fn resend_code(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<StatusCode> {
    state.services.accounts.resend_code(auth.user_id).await?;
    Ok(StatusCode::ACCEPTED)
}

/// Emails a password reset code
///
/// # Errors
///
/// - `404 Not Found`: No account with this email
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> ApiResult<StatusCode> {
    req.validate()?;

    state
        .services
        .accounts
        .request_password_reset(&req.email)
        .await?;

    Ok(StatusCode::ACCEPTED)
}

/// Exchanges a reset (or invite) code for a reset token
pub async fn verify_reset_code(
    State(state): State<AppState>,
    Json(req): Json<ResetCodeRequest>,
) -> ApiResult<Json<ResetTokenResponse>> {
    req.validate()?;

    let token = state
        .services
        .accounts
        .verify_reset_code(&req.email, &req.code)
        .await?;

    Ok(Json(ResetTokenResponse { token }))
}

/// Sets a new password for the caller
///
/// # Errors
///
/// - `400 Bad Request`: Password missing or empty
/// - `422 Unprocessable Entity`: Password shorter than 8 characters
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ResetPasswordRequest>,
) -> ApiResult<StatusCode> {
    let password = req.password.unwrap_or_default();

    if !password.is_empty() && password.chars().count() < 8 {
        let mut errors = validator::ValidationErrors::new();
        errors.add(
            "password",
            validator::ValidationError::new("length")
                .with_message("Password must be at least 8 characters".into()),
        );
        return Err(errors.into());
    }

    state
        .services
        .accounts
        .reset_password(auth.user_id, &password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
