use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::models::address::Address;
use crate::models::company::{Company, CompanyData};
use crate::store::{CompanyStore, StoreResult};

#[derive(FromRow)]
struct CompanyRecord {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    cif: String,
    address: Json<Address>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CompanyRecord {
    fn to_domain(self) -> Company {
        Company {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            cif: self.cif,
            address: self.address.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Companies table; one row per owner
#[derive(Clone)]
pub struct PgCompanyStore {
    pool: PgPool,
}

impl PgCompanyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CompanyStore for PgCompanyStore {
    async fn upsert_for_owner(&self, owner_id: Uuid, data: CompanyData) -> StoreResult<Company> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            r#"
            INSERT INTO companies (owner_id, name, cif, address)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (owner_id) DO UPDATE
                SET name = EXCLUDED.name,
                    cif = EXCLUDED.cif,
                    address = EXCLUDED.address,
                    updated_at = NOW()
            RETURNING id, owner_id, name, cif, address, created_at, updated_at
            "#,
        )
        .bind(owner_id)
        .bind(data.name)
        .bind(data.cif)
        .bind(Json(data.address))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.to_domain())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Company>> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            r#"
            SELECT id, owner_id, name, cif, address, created_at, updated_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(CompanyRecord::to_domain))
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Company>> {
        let record = sqlx::query_as::<_, CompanyRecord>(
            r#"
            SELECT id, owner_id, name, cif, address, created_at, updated_at
            FROM companies
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(CompanyRecord::to_domain))
    }
}
