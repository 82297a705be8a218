/// User model
///
/// A user owns a company, clients, projects and delivery notes. Accounts start
/// unverified and become usable once the emailed code is confirmed.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'user', 'guest');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email TEXT NOT NULL UNIQUE,
///     password_hash TEXT,
///     name TEXT, surnames TEXT, nif TEXT, logo TEXT,
///     address JSONB NOT NULL DEFAULT '{}',
///     is_freelancer BOOLEAN NOT NULL DEFAULT FALSE,
///     company_id UUID REFERENCES companies(id) ON DELETE SET NULL,
///     role user_role NOT NULL DEFAULT 'user',
///     verified BOOLEAN NOT NULL DEFAULT FALSE,
///     active BOOLEAN NOT NULL DEFAULT TRUE,
///     code TEXT, code_purpose code_purpose,
///     tries INTEGER NOT NULL DEFAULT 3 CHECK (tries >= 0),
///     code_issued_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Views
///
/// `User` itself is never serialized. Responses use [`MinimalUser`] (register
/// and login) or [`PublicUser`] (profile reads); neither carries the password
/// digest, the verification code or the remaining tries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;
use super::company::Company;
use crate::verification::VerificationState;

/// Account roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrative access
    Admin,

    /// Regular account holder (default)
    User,

    /// Invited member of another user's company
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Guest => "guest",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,

    /// Unique, compared exactly as stored
    pub email: String,

    /// Argon2id digest; `None` for invited guests who never set a password
    pub password_hash: Option<String>,

    pub name: Option<String>,
    pub surnames: Option<String>,

    /// Personal tax id
    pub nif: Option<String>,

    pub logo: Option<String>,
    pub address: Address,
    pub is_freelancer: bool,

    /// Company this user works for (own company, or the inviter's for guests)
    pub company_id: Option<Uuid>,

    pub role: Role,
    pub verified: bool,

    /// Soft-delete marker
    pub active: bool,

    pub verification: VerificationState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// `"<name> <surnames>"`, skipping whichever part is missing
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [self.name.as_deref(), self.surnames.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    pub fn minimal(&self) -> MinimalUser {
        MinimalUser {
            email: self.email.clone(),
            verified: self.verified,
            role: self.role,
        }
    }

    pub fn public(&self, company: Option<Company>) -> PublicUser {
        PublicUser {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            surnames: self.surnames.clone(),
            nif: self.nif.clone(),
            logo: self.logo.clone(),
            address: self.address.clone(),
            is_freelancer: self.is_freelancer,
            role: self.role,
            verified: self.verified,
            active: self.active,
            company,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Input for creating a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: Option<String>,
    pub role: Role,
    pub company_id: Option<Uuid>,
    pub name: Option<String>,
    pub surnames: Option<String>,
    pub nif: Option<String>,
}

impl NewUser {
    /// A self-registered account with role `user`
    pub fn registered(email: impl Into<String>, password_hash: String) -> Self {
        Self {
            email: email.into(),
            password_hash: Some(password_hash),
            role: Role::User,
            company_id: None,
            name: None,
            surnames: None,
            nif: None,
        }
    }

    /// A passwordless guest attached to `company_id`
    pub fn guest(email: impl Into<String>, company_id: Uuid) -> Self {
        Self {
            email: email.into(),
            password_hash: None,
            role: Role::Guest,
            company_id: Some(company_id),
            name: None,
            surnames: None,
            nif: None,
        }
    }
}

/// Input for updating a user
///
/// All fields are optional. Only `Some` fields are written; the nested
/// `Option` on nullable columns distinguishes "leave" from "clear".
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub password_hash: Option<String>,
    pub name: Option<Option<String>>,
    pub surnames: Option<Option<String>>,
    pub nif: Option<Option<String>>,
    pub logo: Option<Option<String>>,
    pub address: Option<Address>,
    pub is_freelancer: Option<bool>,
    pub company_id: Option<Option<Uuid>>,
    pub role: Option<Role>,
    pub verified: Option<bool>,
    pub active: Option<bool>,
    pub verification: Option<VerificationState>,
}

impl UpdateUser {
    pub fn verification(state: VerificationState) -> Self {
        Self {
            verification: Some(state),
            ..Default::default()
        }
    }
}

/// View returned by register and login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimalUser {
    pub email: String,
    pub verified: bool,
    pub role: Role,
}

/// Profile view of a user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub surnames: Option<String>,
    pub nif: Option<String>,
    pub logo: Option<String>,
    pub address: Address,
    pub is_freelancer: bool,
    pub role: Role,
    pub verified: bool,
    pub active: bool,
    pub company: Option<Company>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
