/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: scoped JWT issuance and validation
/// - [`middleware`]: bearer-token resolution for Axum routes
/// - [`authorization`]: role gate
///
/// # Example
///
/// ```no_run
/// use docket_shared::auth::password::{hash_password, verify_password};
/// use docket_shared::auth::jwt::TokenIssuer;
/// use docket_shared::models::user::Role;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let issuer = TokenIssuer::new("a-secret-that-is-at-least-32-bytes!!");
/// let token = issuer.issue_access(Uuid::new_v4(), Role::User)?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
