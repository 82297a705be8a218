/// JWT token generation and validation module
///
/// Tokens are signed using HS256 (HMAC-SHA256) and carry the user's id and role.
///
/// # Token Scopes
///
/// - **Access**: issued on register and login, valid for 2 hours, accepted by
///   every authenticated route
/// - **PasswordReset**: issued after a reset code is verified, valid for 10
///   minutes, accepted only by the reset-password route
///
/// # Example
///
/// ```
/// use docket_shared::auth::jwt::{create_token, validate_token, Claims, TokenScope};
/// use docket_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
///
/// let claims = Claims::new(user_id, Role::User, TokenScope::Access);
/// let token = create_token(&claims, "your-secret-key")?;
///
/// let validated_claims = validate_token(&token, "your-secret-key")?;
/// assert_eq!(validated_claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

const ISSUER: &str = "docket";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },

    /// Token is valid but was issued for another purpose
    #[error("Token scope {actual} is not accepted here")]
    WrongScope { actual: TokenScope },
}

/// What a token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenScope {
    /// Full API access
    Access,

    /// Only allowed to set a new password
    PasswordReset,
}

impl TokenScope {
    /// Gets default expiration duration for the scope
    pub fn default_expiration(&self) -> Duration {
        match self {
            TokenScope::Access => Duration::hours(2),
            TokenScope::PasswordReset => Duration::minutes(10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TokenScope::Access => "access",
            TokenScope::PasswordReset => "password_reset",
        }
    }
}

impl std::fmt::Display for TokenScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// JWT claims structure
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always "docket")
/// - `iat`, `nbf`, `exp`: Unix timestamps
///
/// # Custom Claims
///
/// - `role`: role of the user at issue time
/// - `scope`: access or password reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - User ID
    pub sub: Uuid,

    /// Issuer - Always "docket"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Role of the subject when the token was issued
    pub role: Role,

    /// Token scope (custom claim)
    pub scope: TokenScope,
}

impl Claims {
    /// Creates new claims with the default expiration for `scope`
    pub fn new(user_id: Uuid, role: Role, scope: TokenScope) -> Self {
        Self::with_expiration(user_id, role, scope, scope.default_expiration())
    }

    /// Creates claims with custom expiration
    ///
    /// # Example
    ///
    /// ```
    /// use docket_shared::auth::jwt::{Claims, TokenScope};
    /// use docket_shared::models::user::Role;
    /// use chrono::Duration;
    /// use uuid::Uuid;
    ///
    /// let claims = Claims::with_expiration(
    ///     Uuid::new_v4(),
    ///     Role::User,
    ///     TokenScope::Access,
    ///     Duration::hours(1),
    /// );
    /// assert!(!claims.is_expired());
    /// ```
    pub fn with_expiration(
        user_id: Uuid,
        role: Role,
        scope: TokenScope,
        expires_in: Duration,
    ) -> Self {
        let now = Utc::now();
        let expiration = now + expires_in;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            role,
            scope,
        }
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Creates a JWT token from claims
///
/// Signs the token using HS256 with the provided secret. The secret should be
/// at least 32 bytes; the API configuration refuses shorter ones.
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token creation fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a JWT token and extracts claims
///
/// Verifies the signature, expiration, not-before time and issuer. The scope
/// is not checked here; see [`validate_scoped_token`].
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Validates a token and checks that its scope is one of `accepted`
///
/// # Example
///
/// ```
/// use docket_shared::auth::jwt::{create_token, validate_scoped_token, Claims, TokenScope};
/// use docket_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let claims = Claims::new(Uuid::new_v4(), Role::User, TokenScope::PasswordReset);
/// let token = create_token(&claims, "secret")?;
///
/// assert!(validate_scoped_token(&token, "secret", &[TokenScope::Access]).is_err());
/// assert!(validate_scoped_token(&token, "secret", &[TokenScope::PasswordReset]).is_ok());
/// # Ok(())
/// # }
/// ```
pub fn validate_scoped_token(
    token: &str,
    secret: &str,
    accepted: &[TokenScope],
) -> Result<Claims, JwtError> {
    let claims = validate_token(token, secret)?;

    if !accepted.contains(&claims.scope) {
        return Err(JwtError::WrongScope {
            actual: claims.scope,
        });
    }

    Ok(claims)
}

/// Issues tokens for users with configured lifetimes
///
/// Lifecycle services hold one of these instead of the raw secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: String,
    access_ttl: Duration,
    reset_ttl: Duration,
}

impl TokenIssuer {
    /// Creates an issuer with the default lifetimes (2 hours / 10 minutes)
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: TokenScope::Access.default_expiration(),
            reset_ttl: TokenScope::PasswordReset.default_expiration(),
        }
    }

    /// Overrides the token lifetimes
    pub fn with_ttls(mut self, access_ttl: Duration, reset_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.reset_ttl = reset_ttl;
        self
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Issues an access token
    pub fn issue_access(&self, user_id: Uuid, role: Role) -> Result<String, JwtError> {
        let claims = Claims::with_expiration(user_id, role, TokenScope::Access, self.access_ttl);
        create_token(&claims, &self.secret)
    }

    /// Issues a short-lived password reset token
    pub fn issue_reset(&self, user_id: Uuid, role: Role) -> Result<String, JwtError> {
        let claims =
            Claims::with_expiration(user_id, role, TokenScope::PasswordReset, self.reset_ttl);
        create_token(&claims, &self.secret)
    }

    /// Validates a token against the accepted scopes
    pub fn validate(&self, token: &str, accepted: &[TokenScope]) -> Result<Claims, JwtError> {
        validate_scoped_token(token, &self.secret, accepted)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_ttl", &self.access_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .finish_non_exhaustive()
    }
}
