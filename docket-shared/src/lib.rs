//! # Docket Shared Library
//!
//! Domain types, persistence and business logic for the Docket API: user
//! accounts, clients, projects and signed delivery notes.
//!
//! ## Module Organization
//!
//! - `models`: domain data structures
//! - `store`: storage traits with Postgres and in-memory implementations
//! - `db`: connection pool and migrations
//! - `auth`: password hashing, tokens, bearer resolution and role checks
//! - `verification`: one-time codes for email verification, reset and invites
//! - `messaging`: outbound notifications
//! - `artifacts`: uploads to the artifact store
//! - `render`: delivery note documents
//! - `services`: account, client, project and delivery note lifecycles
//! - `error`: service error taxonomy

pub mod artifacts;
pub mod auth;
pub mod db;
pub mod error;
pub mod messaging;
pub mod models;
pub mod render;
pub mod services;
pub mod store;
pub mod verification;

/// Current version of the Docket shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
