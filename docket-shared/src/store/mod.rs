//! Storage contracts
//!
//! Lifecycle services reach persistence only through these traits. Two
//! implementations exist: [`postgres`] (sqlx, used by the server) and
//! [`memory`] (used by tests and local demos).
//!
//! Every client, project and delivery note operation takes the owner id and
//! matches on it, so a record owned by someone else looks exactly like a
//! missing one.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::client::{Client, NewClient, UpdateClient};
use crate::models::company::{Company, CompanyData};
use crate::models::delivery_note::{DeliveryNote, NewDeliveryNote};
use crate::models::project::{NewProject, Project, UpdateProject};
use crate::models::user::{NewUser, UpdateUser, User};

pub mod memory;
pub mod postgres;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Constraint violation: {0}")]
    Conflict(String),

    /// The row is still referenced by another row
    #[error("Still referenced: {0}")]
    InUse(String),

    /// A stored row could not be turned into a domain value
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                return StoreError::Conflict(constraint);
            }
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("foreign_key").to_string();
                return StoreError::InUse(constraint);
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user; a taken email is a `Conflict`
    async fn create(&self, data: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Writes the `Some` fields; `None` if the user does not exist
    async fn update(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>>;

    /// Removes the user permanently
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;

    /// Number of users in the company other than `excluding`
    async fn count_company_members(&self, company_id: Uuid, excluding: Uuid) -> StoreResult<i64>;
}

#[async_trait]
pub trait CompanyStore: Send + Sync {
    /// Creates the owner's company or replaces its fields
    async fn upsert_for_owner(&self, owner_id: Uuid, data: CompanyData) -> StoreResult<Company>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Company>>;

    async fn find_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Company>>;
}

/// Archive, recover and purge for owner-scoped collections
///
/// Each call returns whether a record owned by `owner_id` matched.
#[async_trait]
pub trait OwnedArchive: Send + Sync {
    async fn archive(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool>;

    async fn recover(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool>;

    /// Hard delete
    async fn purge(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool>;
}

#[async_trait]
pub trait ClientStore: OwnedArchive {
    async fn create(&self, owner_id: Uuid, data: NewClient) -> StoreResult<Client>;

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<Client>>;

    /// Lookup used for the duplicate-name check, archived rows included
    async fn find_by_name(&self, owner_id: Uuid, name: &str) -> StoreResult<Option<Client>>;

    async fn list(&self, owner_id: Uuid, archived: bool) -> StoreResult<Vec<Client>>;

    async fn update(&self, owner_id: Uuid, id: Uuid, data: UpdateClient)
        -> StoreResult<Option<Client>>;
}

#[async_trait]
pub trait ProjectStore: OwnedArchive {
    async fn create(&self, owner_id: Uuid, data: NewProject) -> StoreResult<Project>;

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<Project>>;

    async fn find_by_name(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Project>>;

    async fn list(&self, owner_id: Uuid, archived: bool) -> StoreResult<Vec<Project>>;

    /// Whether any project, archived or not, belongs to the client
    async fn any_for_client(&self, owner_id: Uuid, client_id: Uuid) -> StoreResult<bool>;

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: UpdateProject,
    ) -> StoreResult<Option<Project>>;
}

/// Record a delivery note points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteParent {
    Client(Uuid),
    Project(Uuid),
}

#[async_trait]
pub trait DeliveryNoteStore: Send + Sync {
    async fn create(&self, owner_id: Uuid, data: NewDeliveryNote) -> StoreResult<DeliveryNote>;

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<DeliveryNote>>;

    /// Newest first
    async fn list(&self, owner_id: Uuid) -> StoreResult<Vec<DeliveryNote>>;

    /// Sets `sign`, clears `pending` and `pdf_url`, only while unsigned
    ///
    /// `None` when the note is missing or already signed.
    async fn mark_signed(
        &self,
        owner_id: Uuid,
        id: Uuid,
        sign_url: &str,
    ) -> StoreResult<Option<DeliveryNote>>;

    /// Stores a rendered PDF URL, only while `sign` still equals `expected_sign`
    async fn set_pdf_url(
        &self,
        owner_id: Uuid,
        id: Uuid,
        expected_sign: &str,
        pdf_url: &str,
    ) -> StoreResult<Option<DeliveryNote>>;

    /// Deletes the note only while unsigned
    async fn delete_unsigned(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool>;

    /// Whether any note, signed or not, references `parent`
    async fn any_for(&self, owner_id: Uuid, parent: NoteParent) -> StoreResult<bool>;
}

/// The full set of stores a server needs
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub companies: Arc<dyn CompanyStore>,
    pub clients: Arc<dyn ClientStore>,
    pub projects: Arc<dyn ProjectStore>,
    pub notes: Arc<dyn DeliveryNoteStore>,
}

impl Stores {
    /// Postgres-backed stores sharing one pool
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(postgres::PgUserStore::new(pool.clone())),
            companies: Arc::new(postgres::PgCompanyStore::new(pool.clone())),
            clients: Arc::new(postgres::PgClientStore::new(pool.clone())),
            projects: Arc::new(postgres::PgProjectStore::new(pool.clone())),
            notes: Arc::new(postgres::PgDeliveryNoteStore::new(pool)),
        }
    }

    /// Fresh, empty in-memory stores
    pub fn memory() -> Self {
        Self {
            users: Arc::new(memory::MemoryUserStore::new()),
            companies: Arc::new(memory::MemoryCompanyStore::new()),
            clients: Arc::new(memory::MemoryClientStore::new()),
            projects: Arc::new(memory::MemoryProjectStore::new()),
            notes: Arc::new(memory::MemoryDeliveryNoteStore::new()),
        }
    }
}
