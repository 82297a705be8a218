//! Error types returned by the lifecycle services
//!
//! Every operation in [`crate::services`] returns [`ServiceResult`]. The HTTP
//! layer maps each variant onto a status code; nothing here knows about HTTP.

use serde::{Deserialize, Serialize};

use crate::artifacts::ArtifactError;
use crate::auth::authorization::AuthzError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::render::RenderError;
use crate::store::StoreError;

/// One failed field check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a lifecycle operation
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Entity missing, or owned by someone else
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Email is already registered")]
    EmailTaken,

    /// Duplicate client or project name
    #[error("{0}")]
    Duplicate(String),

    #[error("User already belongs to a company")]
    AlreadyAffiliated,

    #[error("Delivery note is already signed")]
    AlreadySigned,

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Signed delivery notes cannot be modified or deleted")]
    SignedImmutable,

    /// Hard delete refused while other records still point at the target
    #[error("{0}")]
    InUse(String),

    #[error("Account is deactivated")]
    Deactivated,

    #[error("Email is not verified")]
    NotVerified,

    #[error("Invalid credentials")]
    BadCredentials,

    #[error("Invalid verification code")]
    CodeMismatch { tries_left: i32 },

    #[error("No verification attempts left")]
    NoAttemptsLeft,

    #[error("Password is required")]
    PasswordRequired,

    #[error("Users cannot invite themselves")]
    SelfInvite,

    /// Inviting requires the inviter to have a company to share
    #[error("Inviter has no company")]
    NoCompany,

    #[error("Missing address fields: {}", .0.join(", "))]
    MissingAddressFields(Vec<String>),

    #[error("Invalid payload")]
    InvalidPayload(Vec<FieldIssue>),

    #[error("Signature image is required")]
    MissingSignature,

    #[error("Insufficient permissions")]
    Forbidden(#[from] AuthzError),

    #[error("Artifact upload failed: {0}")]
    ArtifactUploadFailed(#[from] ArtifactError),

    #[error("Rendering failed: {0}")]
    RenderFailed(#[from] RenderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] JwtError),
}

impl ServiceError {
    /// Shorthand for a single-field payload error
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::InvalidPayload(vec![FieldIssue::new(field, message)])
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(ServiceError::NotFound("Client").to_string(), "Client not found");
        assert_eq!(
            ServiceError::MissingAddressFields(vec!["street".into(), "city".into()]).to_string(),
            "Missing address fields: street, city"
        );
        assert_eq!(
            ServiceError::CodeMismatch { tries_left: 2 }.to_string(),
            "Invalid verification code"
        );
    }

    #[test]
    fn test_invalid_shorthand() {
        match ServiceError::invalid("end", "must not be before begin") {
            ServiceError::InvalidPayload(issues) => {
                assert_eq!(issues, vec![FieldIssue::new("end", "must not be before begin")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
