/// Bearer-token authentication for Axum
///
/// Resolves the `Authorization: Bearer <token>` header to a live user and
/// adds an [`AuthContext`] to the request extensions. Two middleware
/// functions are provided: [`require_access`] for ordinary routes and
/// [`require_access_or_reset`] for the reset-password route, which also
/// accepts the short-lived reset token.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use axum::{middleware, routing::get, Extension, Router};
/// use docket_shared::auth::jwt::TokenIssuer;
/// use docket_shared::auth::middleware::{require_access, AuthContext, TokenResolver};
/// use docket_shared::store::memory::MemoryUserStore;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.email)
/// }
///
/// let resolver = TokenResolver::new(
///     TokenIssuer::new("a-secret-that-is-at-least-32-bytes!!"),
///     Arc::new(MemoryUserStore::new()),
/// );
///
/// let app: Router = Router::new()
///     .route("/protected", get(handler))
///     .layer(middleware::from_fn_with_state(resolver, require_access));
/// ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{JwtError, TokenIssuer, TokenScope};
use crate::models::user::{Role, User};
use crate::store::UserStore;

/// Authenticated caller, added to request extensions
///
/// ```
/// use axum::Extension;
/// use docket_shared::auth::middleware::AuthContext;
///
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("User: {}, role: {}", auth.user_id, auth.role)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: String,

    /// Role as currently stored, not as claimed by the token
    pub role: Role,

    pub scope: TokenScope,
}

impl AuthContext {
    fn from_user(user: &User, scope: TokenScope) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            scope,
        }
    }
}

/// Error type for token resolution
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No Authorization header
    #[error("Missing bearer token")]
    NoToken,

    /// Header present but not `Bearer <token>`
    #[error("{0}")]
    InvalidFormat(String),

    /// Signature, expiry or claims rejected
    #[error("{0}")]
    InvalidToken(String),

    /// Valid token issued for another purpose
    #[error("Token scope {0} is not accepted here")]
    WrongScope(TokenScope),

    /// Token refers to a user that no longer exists
    #[error("User no longer exists")]
    UserNotFound,

    /// Store failure while loading the user
    #[error("Internal server error")]
    Internal,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::WrongScope(_) => StatusCode::FORBIDDEN,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl From<JwtError> for AuthError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            JwtError::WrongScope { actual } => AuthError::WrongScope(actual),
            other => AuthError::InvalidToken(format!("Invalid token: {}", other)),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = match status {
            StatusCode::FORBIDDEN => "forbidden",
            StatusCode::INTERNAL_SERVER_ERROR => "internal_error",
            _ => "unauthorized",
        };

        let body = Json(json!({
            "error": code,
            "message": self.to_string(),
        }));

        (status, body).into_response()
    }
}

/// Extracts the bearer token from request headers
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::NoToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat("Authorization header is not valid text".to_string()))?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))?
        .trim();

    if token.is_empty() {
        return Err(AuthError::NoToken);
    }

    Ok(token)
}

/// Turns bearer tokens into live users
#[derive(Clone)]
pub struct TokenResolver {
    issuer: TokenIssuer,
    users: Arc<dyn UserStore>,
}

impl TokenResolver {
    pub fn new(issuer: TokenIssuer, users: Arc<dyn UserStore>) -> Self {
        Self { issuer, users }
    }

    /// Validates `token` and loads the user it names
    pub async fn resolve(
        &self,
        token: &str,
        accepted: &[TokenScope],
    ) -> Result<(User, TokenScope), AuthError> {
        let claims = self.issuer.validate(token, accepted)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, user_id = %claims.sub, "Failed to load token subject");
                AuthError::Internal
            })?
            .ok_or(AuthError::UserNotFound)?;

        Ok((user, claims.scope))
    }

    async fn authenticate(
        &self,
        mut req: Request,
        next: Next,
        accepted: &[TokenScope],
    ) -> Result<Response, AuthError> {
        let token = bearer_token(req.headers())?;
        let (user, scope) = self.resolve(token, accepted).await?;

        req.extensions_mut()
            .insert(AuthContext::from_user(&user, scope));

        Ok(next.run(req).await)
    }
}

/// Middleware accepting access tokens only
pub async fn require_access(
    State(resolver): State<TokenResolver>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    resolver.authenticate(req, next, &[TokenScope::Access]).await
}

/// Middleware accepting access or password-reset tokens
pub async fn require_access_or_reset(
    State(resolver): State<TokenResolver>,
    req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    resolver
        .authenticate(req, next, &[TokenScope::Access, TokenScope::PasswordReset])
        .await
}
