/// Verification code engine
///
/// Users carry a single [`VerificationState`]: the outstanding code, what it
/// was issued for, the remaining attempts and when it was issued. Registration,
/// password reset and invitations all go through the same engine.
///
/// # Rules
///
/// - Codes are 6 digits, uniform over `100000..=999999`
/// - Issuing a code resets `tries` to 3
/// - A wrong code costs one attempt, and the decrement is persisted even
///   though the call fails
/// - With no attempts left every check fails without touching `tries`
/// - A match is only reported; the caller clears the code
///
/// # Example
///
/// ```
/// use docket_shared::verification::{CheckOutcome, CodePurpose, VerificationState};
///
/// let mut state = VerificationState::issued(CodePurpose::Register, "123456".into());
/// assert_eq!(
///     state.check("000000", &[CodePurpose::Register]),
///     CheckOutcome::Mismatch { tries_left: 2 }
/// );
/// assert_eq!(
///     state.check("123456", &[CodePurpose::Register]),
///     CheckOutcome::Matched(CodePurpose::Register)
/// );
/// ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};
use crate::messaging::{Mailer, Notification};
use crate::models::user::{UpdateUser, User};
use crate::store::UserStore;

/// Attempts granted with every new code
pub const MAX_TRIES: i32 = 3;

/// What a code was issued for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "code_purpose", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CodePurpose {
    Register,
    Reset,
    Invite,
}

impl CodePurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            CodePurpose::Register => "register",
            CodePurpose::Reset => "reset",
            CodePurpose::Invite => "invite",
        }
    }
}

/// Verification state embedded in a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationState {
    pub code: Option<String>,
    pub purpose: Option<CodePurpose>,
    pub tries: i32,
    pub issued_at: Option<DateTime<Utc>>,
}

impl Default for VerificationState {
    fn default() -> Self {
        Self {
            code: None,
            purpose: None,
            tries: MAX_TRIES,
            issued_at: None,
        }
    }
}

/// Result of checking a submitted code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Code matched; carries the purpose it was issued for
    Matched(CodePurpose),

    /// Wrong code; one attempt was consumed
    Mismatch { tries_left: i32 },

    /// No attempts remain; nothing was consumed
    NoAttemptsLeft,
}

/// Generates a 6-digit numeric code
pub fn generate_code() -> String {
    rand::thread_rng().gen_range(100_000..=999_999).to_string()
}

impl VerificationState {
    /// Fresh state for a newly issued code
    pub fn issued(purpose: CodePurpose, code: String) -> Self {
        Self {
            code: Some(code),
            purpose: Some(purpose),
            tries: MAX_TRIES,
            issued_at: Some(Utc::now()),
        }
    }

    /// Checks `submitted`, consuming an attempt on mismatch
    ///
    /// A code issued for a purpose outside `accepted`, or no outstanding
    /// code at all, counts as a mismatch.
    pub fn check(&mut self, submitted: &str, accepted: &[CodePurpose]) -> CheckOutcome {
        if self.tries <= 0 {
            return CheckOutcome::NoAttemptsLeft;
        }

        match self.matching_purpose(submitted, accepted) {
            Some(purpose) => CheckOutcome::Matched(purpose),
            None => {
                self.tries -= 1;
                CheckOutcome::Mismatch {
                    tries_left: self.tries,
                }
            }
        }
    }

    /// Plain comparison that never touches `tries`
    pub fn matching_purpose(&self, submitted: &str, accepted: &[CodePurpose]) -> Option<CodePurpose> {
        match (&self.code, self.purpose) {
            (Some(code), Some(purpose)) if code == submitted && accepted.contains(&purpose) => {
                Some(purpose)
            }
            _ => None,
        }
    }

    /// Same state with the code removed; `tries` is kept
    pub fn cleared(&self) -> Self {
        Self {
            code: None,
            purpose: None,
            tries: self.tries,
            issued_at: None,
        }
    }
}

/// Extra context for invite messages
#[derive(Debug, Clone, Default)]
pub struct InviteContext {
    pub company_name: Option<String>,
    pub link: String,
}

/// Issues and checks codes against persisted users
#[derive(Clone)]
pub struct VerificationEngine {
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
}

impl VerificationEngine {
    pub fn new(users: Arc<dyn UserStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self { users, mailer }
    }

    /// Generates a code, persists it on the user, then notifies them
    ///
    /// A failed notification is logged and does not fail the call: the code
    /// is already stored and can be re-sent.
    pub async fn issue(
        &self,
        user: &User,
        purpose: CodePurpose,
        invite: Option<InviteContext>,
    ) -> ServiceResult<User> {
        let code = generate_code();
        let state = VerificationState::issued(purpose, code.clone());

        let updated = self
            .users
            .update(user.id, UpdateUser::verification(state))
            .await?
            .ok_or(ServiceError::NotFound("User"))?;

        let mut notification = Notification::new(&updated.email, purpose, code);
        if let Some(invite) = invite {
            notification = notification.with_invite(invite.company_name, invite.link);
        }

        if let Err(e) = self.mailer.notify(&notification).await {
            tracing::warn!(
                user_id = %updated.id,
                purpose = purpose.as_str(),
                error = %e,
                "Verification code stored but notification failed"
            );
        }

        tracing::info!(user_id = %updated.id, purpose = purpose.as_str(), "Verification code issued");

        Ok(updated)
    }

    /// Checks a submitted code, persisting the consumed attempt on mismatch
    pub async fn check(
        &self,
        user: &User,
        submitted: &str,
        accepted: &[CodePurpose],
    ) -> ServiceResult<CodePurpose> {
        let mut state = user.verification.clone();

        match state.check(submitted, accepted) {
            CheckOutcome::Matched(purpose) => Ok(purpose),
            CheckOutcome::NoAttemptsLeft => {
                tracing::warn!(user_id = %user.id, "Verification attempted with no tries left");
                Err(ServiceError::NoAttemptsLeft)
            }
            CheckOutcome::Mismatch { tries_left } => {
                self.users
                    .update(user.id, UpdateUser::verification(state))
                    .await?
                    .ok_or(ServiceError::NotFound("User"))?;

                tracing::info!(user_id = %user.id, tries_left, "Verification code mismatch");
                Err(ServiceError::CodeMismatch { tries_left })
            }
        }
    }
}
