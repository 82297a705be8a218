/// Project model
///
/// A project belongs to one owner and one of the owner's clients.
/// `(owner_id, client_id, name)` is unique.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE projects (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     owner_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     client_id UUID NOT NULL REFERENCES clients(id) ON DELETE CASCADE,
///     name TEXT NOT NULL,
///     project_code TEXT NOT NULL,
///     code TEXT,
///     address JSONB NOT NULL DEFAULT '{}',
///     begin_date DATE,
///     end_date DATE,
///     notes TEXT,
///     service_prices JSONB NOT NULL DEFAULT '[]',
///     archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     UNIQUE (owner_id, client_id, name)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::address::Address;

/// Agreed price for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePrice {
    pub service_name: String,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub client_id: Uuid,
    pub name: String,

    /// Owner-facing identifier
    pub project_code: String,

    /// Internal code
    pub code: Option<String>,

    pub address: Address,
    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub notes: Option<String>,
    pub service_prices: Vec<ServicePrice>,
    pub archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a project
#[derive(Debug, Clone)]
pub struct NewProject {
    pub client_id: Uuid,
    pub name: String,
    pub project_code: String,
    pub code: Option<String>,
    pub address: Address,
    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub notes: Option<String>,
    pub service_prices: Vec<ServicePrice>,
}

/// Input for updating a project; only `Some` fields are written
#[derive(Debug, Clone, Default)]
pub struct UpdateProject {
    pub name: Option<String>,
    pub project_code: Option<String>,
    pub code: Option<Option<String>>,
    pub address: Option<Address>,
    pub begin: Option<Option<NaiveDate>>,
    pub end: Option<Option<NaiveDate>>,
    pub notes: Option<Option<String>>,
    pub service_prices: Option<Vec<ServicePrice>>,
}

/// Checks that a project does not end before it begins
pub fn dates_in_order(begin: Option<NaiveDate>, end: Option<NaiveDate>) -> bool {
    match (begin, end) {
        (Some(begin), Some(end)) => begin <= end,
        _ => true,
    }
}
