/// Client model
///
/// Clients belong to one owner. `(owner_id, name)` is unique, archived rows
/// included, so a name cannot be reused while an archived client holds it.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE clients (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     cif TEXT NOT NULL,
///     logo TEXT,
///     address JSONB NOT NULL DEFAULT '{}',
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (owner_id, name)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub cif: String,
    pub logo: Option<String>,
    pub address: Address,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a client
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub cif: String,
    pub logo: Option<String>,
    pub address: Address,
}

/// Input for updating a client; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub cif: Option<String>,
    pub logo: Option<Option<String>>,
    pub address: Option<Address>,
}
