//! Account lifecycle
//!
//! ```text
//! register ──> PendingVerification ──verify_email──> Verified
//!                                 Active <──> Deactivated (soft delete)
//! request_password_reset ──> verify_reset_code ──> reset_password
//! ```
//!
//! Login checks run in a fixed order: existence, active, verified, then the
//! password. A deactivated or unverified account is reported as such even
//! when the password is wrong.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::auth::authorization::{require_role, INVITER_ROLES};
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::Hasher;
use crate::error::{FieldIssue, ServiceError, ServiceResult};
use crate::models::address::Address;
use crate::models::company::{CompanyData, FreelancerCompanyError};
use crate::models::user::{MinimalUser, NewUser, PublicUser, Role, UpdateUser, User};
use crate::store::{CompanyStore, StoreError, UserStore};
use crate::verification::{CodePurpose, InviteContext, VerificationEngine};

use super::in_use_on_reference;

/// Token plus the minimal view of the user it was issued for
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: MinimalUser,
}

/// Input for [`AccountService::register`]
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
    pub surnames: Option<String>,
    pub nif: Option<String>,
}

/// Input for [`AccountService::update_personal_data`]
#[derive(Debug, Clone, Default)]
pub struct PersonalData {
    pub name: String,
    pub surnames: String,
    pub nif: String,
    pub is_freelancer: Option<bool>,
}

/// Result of an invitation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub user: MinimalUser,

    /// True when a new guest account was created
    pub created: bool,
}

#[derive(Clone)]
pub struct AccountService {
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) companies: Arc<dyn CompanyStore>,
    pub(crate) verification: VerificationEngine,
    pub(crate) hasher: Hasher,
    pub(crate) tokens: TokenIssuer,
    pub(crate) artifacts: Arc<dyn ArtifactStore>,
    pub(crate) frontend_url: String,
}

impl AccountService {
    async fn load(&self, user_id: Uuid) -> ServiceResult<User> {
        self.users
            .find_by_id(user_id)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    async fn load_by_email(&self, email: &str) -> ServiceResult<User> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    async fn apply(&self, user_id: Uuid, data: UpdateUser) -> ServiceResult<User> {
        self.users
            .update(user_id, data)
            .await?
            .ok_or(ServiceError::NotFound("User"))
    }

    async fn public_view(&self, user: &User) -> ServiceResult<PublicUser> {
        let company = match user.company_id {
            Some(id) => self.companies.find_by_id(id).await?,
            None => None,
        };
        Ok(user.public(company))
    }

    fn session(&self, user: &User) -> ServiceResult<AuthSession> {
        Ok(AuthSession {
            token: self.tokens.issue_access(user.id, user.role)?,
            user: user.minimal(),
        })
    }

    /// Creates an unverified account and sends it a registration code
    pub async fn register(&self, input: Registration) -> ServiceResult<AuthSession> {
        if self.users.find_by_email(&input.email).await?.is_some() {
            return Err(ServiceError::EmailTaken);
        }

        let digest = self.hasher.hash(&input.password).await?;

        let mut new_user = NewUser::registered(input.email, digest);
        new_user.name = input.name;
        new_user.surnames = input.surnames;
        new_user.nif = input.nif;

        let user = self.users.create(new_user).await.map_err(|e| match e {
            StoreError::Conflict(_) => ServiceError::EmailTaken,
            other => other.into(),
        })?;

        tracing::info!(user_id = %user.id, "User registered");

        let user = self
            .verification
            .issue(&user, CodePurpose::Register, None)
            .await?;

        self.session(&user)
    }

    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let user = self.load_by_email(email).await?;

        if !user.active {
            return Err(ServiceError::Deactivated);
        }
        if !user.verified {
            return Err(ServiceError::NotVerified);
        }

        let digest = user
            .password_hash
            .as_deref()
            .ok_or(ServiceError::BadCredentials)?;

        if !self.hasher.verify(password, digest).await? {
            tracing::info!(user_id = %user.id, "Login rejected");
            return Err(ServiceError::BadCredentials);
        }

        tracing::info!(user_id = %user.id, "User logged in");
        self.session(&user)
    }

    /// Checks a registration or invite code and marks the user verified
    pub async fn verify_email(&self, user_id: Uuid, code: &str) -> ServiceResult<MinimalUser> {
        let user = self.load(user_id).await?;

        self.verification
            .check(&user, code, &[CodePurpose::Register, CodePurpose::Invite])
            .await?;

        let user = self
            .apply(
                user.id,
                UpdateUser {
                    verified: Some(true),
                    verification: Some(user.verification.cleared()),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, "Email verified");
        Ok(user.minimal())
    }

    /// Sends a fresh registration code to an unverified user
    pub async fn resend_code(&self, user_id: Uuid) -> ServiceResult<()> {
        let user = self.load(user_id).await?;
        if user.verified {
            return Err(ServiceError::AlreadyVerified);
        }

        self.verification
            .issue(&user, CodePurpose::Register, None)
            .await?;
        Ok(())
    }

    pub async fn request_password_reset(&self, email: &str) -> ServiceResult<()> {
        let user = self.load_by_email(email).await?;

        self.verification
            .issue(&user, CodePurpose::Reset, None)
            .await?;

        tracing::info!(user_id = %user.id, "Password reset requested");
        Ok(())
    }

    /// Exchanges a reset or invite code for a short-lived reset token
    ///
    /// Attempts are not consumed here. An invite code also proves ownership
    /// of the address, so it verifies the account.
    pub async fn verify_reset_code(&self, email: &str, code: &str) -> ServiceResult<String> {
        let user = self.load_by_email(email).await?;

        let purpose = user
            .verification
            .matching_purpose(code, &[CodePurpose::Reset, CodePurpose::Invite])
            .ok_or(ServiceError::CodeMismatch {
                tries_left: user.verification.tries,
            })?;

        let mut update = UpdateUser::verification(user.verification.cleared());
        if purpose == CodePurpose::Invite {
            update.verified = Some(true);
        }
        let user = self.apply(user.id, update).await?;

        tracing::info!(user_id = %user.id, purpose = purpose.as_str(), "Reset code accepted");
        Ok(self.tokens.issue_reset(user.id, user.role)?)
    }

    pub async fn reset_password(&self, user_id: Uuid, password: &str) -> ServiceResult<()> {
        if password.is_empty() {
            return Err(ServiceError::PasswordRequired);
        }

        let user = self.load(user_id).await?;
        let digest = self.hasher.hash(password).await?;

        self.apply(
            user.id,
            UpdateUser {
                password_hash: Some(digest),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(user_id = %user.id, "Password reset");
        Ok(())
    }

    /// Attaches `email` to the inviter's company as a guest
    ///
    /// Unknown addresses get a new passwordless guest account and an invite
    /// code; existing users are moved into the company if they have none.
    pub async fn invite_user(&self, inviter_id: Uuid, email: &str) -> ServiceResult<Invitation> {
        let inviter = self.load(inviter_id).await?;
        require_role(inviter.role, INVITER_ROLES)?;

        let existing = self.users.find_by_email(email).await?;
        if let Some(invitee) = &existing {
            if invitee.id == inviter.id {
                return Err(ServiceError::SelfInvite);
            }
        }

        let company_id = inviter.company_id.ok_or(ServiceError::NoCompany)?;

        match existing {
            Some(invitee) => {
                if invitee.company_id.is_some() {
                    return Err(ServiceError::AlreadyAffiliated);
                }

                let invitee = self
                    .apply(
                        invitee.id,
                        UpdateUser {
                            role: Some(Role::Guest),
                            company_id: Some(Some(company_id)),
                            ..Default::default()
                        },
                    )
                    .await?;

                tracing::info!(
                    inviter_id = %inviter.id,
                    user_id = %invitee.id,
                    %company_id,
                    "Existing user joined company"
                );

                Ok(Invitation {
                    user: invitee.minimal(),
                    created: false,
                })
            }
            None => {
                let guest = self
                    .users
                    .create(NewUser::guest(email, company_id))
                    .await
                    .map_err(|e| match e {
                        StoreError::Conflict(_) => ServiceError::EmailTaken,
                        other => other.into(),
                    })?;

                let company_name = self
                    .companies
                    .find_by_id(company_id)
                    .await?
                    .map(|c| c.name);

                let context = InviteContext {
                    company_name,
                    link: format!("{}/auth/reset", self.frontend_url.trim_end_matches('/')),
                };

                let guest = self
                    .verification
                    .issue(&guest, CodePurpose::Invite, Some(context))
                    .await?;

                tracing::info!(
                    inviter_id = %inviter.id,
                    user_id = %guest.id,
                    %company_id,
                    "Guest invited"
                );

                Ok(Invitation {
                    user: guest.minimal(),
                    created: true,
                })
            }
        }
    }

    /// Soft delete deactivates; hard delete removes the record
    ///
    /// A hard delete takes the user's own company with it, so it is refused
    /// while invited guests still belong to that company.
    pub async fn delete_user(&self, user_id: Uuid, soft: bool) -> ServiceResult<()> {
        if soft {
            self.apply(
                user_id,
                UpdateUser {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await?;
            tracing::info!(%user_id, "User deactivated");
        } else {
            let in_use = || "Company still has members; remove them first".to_string();

            if let Some(company) = self.companies.find_by_owner(user_id).await? {
                let members = self
                    .users
                    .count_company_members(company.id, user_id)
                    .await?;
                if members > 0 {
                    return Err(ServiceError::InUse(in_use()));
                }
            }

            let deleted = self
                .users
                .delete(user_id)
                .await
                .map_err(|e| in_use_on_reference(e, in_use))?;
            if !deleted {
                return Err(ServiceError::NotFound("User"));
            }
            tracing::info!(%user_id, "User deleted");
        }

        Ok(())
    }

    pub async fn get_self(&self, user_id: Uuid) -> ServiceResult<PublicUser> {
        let user = self.load(user_id).await?;
        self.public_view(&user).await
    }

    pub async fn update_personal_data(
        &self,
        user_id: Uuid,
        data: PersonalData,
    ) -> ServiceResult<PublicUser> {
        let user = self
            .apply(
                user_id,
                UpdateUser {
                    name: Some(Some(data.name)),
                    surnames: Some(Some(data.surnames)),
                    nif: Some(Some(data.nif)),
                    is_freelancer: data.is_freelancer,
                    ..Default::default()
                },
            )
            .await?;

        self.public_view(&user).await
    }

    pub async fn update_address(&self, user_id: Uuid, address: Address) -> ServiceResult<PublicUser> {
        let user = self
            .apply(
                user_id,
                UpdateUser {
                    address: Some(address),
                    ..Default::default()
                },
            )
            .await?;

        self.public_view(&user).await
    }

    /// Creates or replaces the caller's company
    ///
    /// Freelancers get a company derived from their personal data and any
    /// submitted company is ignored. Everyone else must submit one.
    pub async fn update_company(
        &self,
        user_id: Uuid,
        company: Option<CompanyData>,
    ) -> ServiceResult<PublicUser> {
        let user = self.load(user_id).await?;

        let data = if user.is_freelancer {
            CompanyData::for_freelancer(&user).map_err(|e| match e {
                FreelancerCompanyError::MissingAddressFields(fields) => {
                    ServiceError::MissingAddressFields(
                        fields.into_iter().map(String::from).collect(),
                    )
                }
                FreelancerCompanyError::MissingPersonalFields(fields) => {
                    ServiceError::InvalidPayload(
                        fields
                            .into_iter()
                            .map(|f| FieldIssue::new(f, "required for freelancers"))
                            .collect(),
                    )
                }
            })?
        } else {
            company.ok_or_else(|| ServiceError::invalid("company", "company data is required"))?
        };

        let company = self.companies.upsert_for_owner(user.id, data).await?;

        let user = self
            .apply(
                user.id,
                UpdateUser {
                    company_id: Some(Some(company.id)),
                    ..Default::default()
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, company_id = %company.id, "Company updated");
        Ok(user.public(Some(company)))
    }

    /// Uploads a logo image and stores its URL on the user
    pub async fn update_logo(
        &self,
        user_id: Uuid,
        image: Bytes,
        filename: &str,
    ) -> ServiceResult<PublicUser> {
        if image.is_empty() {
            return Err(ServiceError::invalid("image", "image file is required"));
        }

        let user = self.load(user_id).await?;
        let artifact = self.artifacts.upload(image, filename).await?;

        let user = self
            .apply(
                user.id,
                UpdateUser {
                    logo: Some(Some(artifact.url)),
                    ..Default::default()
                },
            )
            .await?;

        self.public_view(&user).await
    }
}
