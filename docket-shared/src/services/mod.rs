//! Lifecycle services
//!
//! Each service owns handles to the stores and collaborators it needs and
//! exposes one method per operation. Services never see HTTP types; every
//! method returns [`ServiceResult`](crate::error::ServiceResult).
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docket_shared::artifacts::MemoryArtifactStore;
//! use docket_shared::auth::jwt::TokenIssuer;
//! use docket_shared::auth::password::Hasher;
//! use docket_shared::messaging::LogMailer;
//! use docket_shared::render::PdfRenderer;
//! use docket_shared::services::{ServiceContext, Services};
//! use docket_shared::store::Stores;
//!
//! let services = Services::new(ServiceContext {
//!     stores: Stores::memory(),
//!     hasher: Hasher::default(),
//!     tokens: TokenIssuer::new("a-secret-that-is-at-least-32-bytes!!"),
//!     mailer: Arc::new(LogMailer),
//!     artifacts: Arc::new(MemoryArtifactStore::new()),
//!     renderer: Arc::new(PdfRenderer::new()),
//!     frontend_url: "http://localhost:3000".to_string(),
//! });
//! ```

use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::auth::jwt::TokenIssuer;
use crate::auth::password::Hasher;
use crate::error::ServiceError;
use crate::messaging::Mailer;
use crate::render::DocumentRenderer;
use crate::store::{StoreError, Stores};
use crate::verification::VerificationEngine;

pub mod accounts;
pub mod clients;
pub mod delivery_notes;
pub mod projects;

pub use accounts::AccountService;
pub use clients::ClientService;
pub use delivery_notes::DeliveryNoteService;
pub use projects::ProjectService;

/// Everything the services are built from
pub struct ServiceContext {
    pub stores: Stores,
    pub hasher: Hasher,
    pub tokens: TokenIssuer,
    pub mailer: Arc<dyn Mailer>,
    pub artifacts: Arc<dyn ArtifactStore>,
    pub renderer: Arc<dyn DocumentRenderer>,

    /// Base URL of the web app, used in invite links
    pub frontend_url: String,
}

/// All lifecycle services
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub clients: ClientService,
    pub projects: ProjectService,
    pub notes: DeliveryNoteService,
}

impl Services {
    pub fn new(ctx: ServiceContext) -> Self {
        let stores = ctx.stores;
        let verification = VerificationEngine::new(stores.users.clone(), ctx.mailer);

        Self {
            accounts: AccountService {
                users: stores.users.clone(),
                companies: stores.companies.clone(),
                verification,
                hasher: ctx.hasher,
                tokens: ctx.tokens,
                artifacts: ctx.artifacts.clone(),
                frontend_url: ctx.frontend_url,
            },
            clients: ClientService {
                clients: stores.clients.clone(),
                projects: stores.projects.clone(),
                notes: stores.notes.clone(),
            },
            projects: ProjectService {
                clients: stores.clients.clone(),
                projects: stores.projects.clone(),
                notes: stores.notes.clone(),
            },
            notes: DeliveryNoteService {
                users: stores.users,
                clients: stores.clients,
                projects: stores.projects,
                notes: stores.notes,
                artifacts: ctx.artifacts,
                renderer: ctx.renderer,
            },
        }
    }
}

/// Maps a uniqueness violation to `Duplicate`, anything else passes through
fn duplicate_on_conflict(err: StoreError, message: impl FnOnce() -> String) -> ServiceError {
    match err {
        StoreError::Conflict(_) => ServiceError::Duplicate(message()),
        other => ServiceError::Store(other),
    }
}

/// Maps a foreign key violation on purge to `InUse`
fn in_use_on_reference(err: StoreError, message: impl FnOnce() -> String) -> ServiceError {
    match err {
        StoreError::InUse(_) => ServiceError::InUse(message()),
        other => ServiceError::Store(other),
    }
}
