use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::push_set;
use crate::models::address::Address;
use crate::models::client::{Client, NewClient, UpdateClient};
use crate::store::{ClientStore, OwnedArchive, StoreResult};

const CLIENT_COLUMNS: &str =
    "id, owner_id, name, cif, logo, address, archived, created_at, updated_at";

#[derive(FromRow)]
struct ClientRecord {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    cif: String,
    logo: Option<String>,
    address: Json<Address>,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ClientRecord {
    fn to_domain(self) -> Client {
        Client {
            id: self.id,
            owner_id: self.owner_id,
            name: self.name,
            cif: self.cif,
            logo: self.logo,
            address: self.address.0,
            archived: self.archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgClientStore {
    pool: PgPool,
}

impl PgClientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn set_archived(&self, owner_id: Uuid, id: Uuid, archived: bool) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE clients SET archived = $3, updated_at = NOW() WHERE id = $1 AND owner_id = $2",
        )
        .bind(id)
        .bind(owner_id)
        .bind(archived)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl OwnedArchive for PgClientStore {
    async fn archive(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.set_archived(owner_id, id, true).await
    }

    async fn recover(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.set_archived(owner_id, id, false).await
    }

    async fn purge(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ClientStore for PgClientStore {
    async fn create(&self, owner_id: Uuid, data: NewClient) -> StoreResult<Client> {
        let record = sqlx::query_as::<_, ClientRecord>(&format!(
            r#"
            INSERT INTO clients (owner_id, name, cif, logo, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {CLIENT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(data.name)
        .bind(data.cif)
        .bind(data.logo)
        .bind(Json(data.address))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.to_domain())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<Client>> {
        let record = sqlx::query_as::<_, ClientRecord>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ClientRecord::to_domain))
    }

    async fn find_by_name(&self, owner_id: Uuid, name: &str) -> StoreResult<Option<Client>> {
        let record = sqlx::query_as::<_, ClientRecord>(&format!(
            "SELECT {CLIENT_COLUMNS} FROM clients WHERE owner_id = $1 AND name = $2"
        ))
        .bind(owner_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ClientRecord::to_domain))
    }

    async fn list(&self, owner_id: Uuid, archived: bool) -> StoreResult<Vec<Client>> {
        let records = sqlx::query_as::<_, ClientRecord>(&format!(
            r#"
            SELECT {CLIENT_COLUMNS}
            FROM clients
            WHERE owner_id = $1 AND archived = $2
            ORDER BY name
            "#
        ))
        .bind(owner_id)
        .bind(archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(ClientRecord::to_domain).collect())
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: UpdateClient,
    ) -> StoreResult<Option<Client>> {
        let mut query = String::from("UPDATE clients SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            push_set(&mut query, &mut bind_count, "name");
        }
        if data.cif.is_some() {
            push_set(&mut query, &mut bind_count, "cif");
        }
        if data.logo.is_some() {
            push_set(&mut query, &mut bind_count, "logo");
        }
        if data.address.is_some() {
            push_set(&mut query, &mut bind_count, "address");
        }

        query.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {CLIENT_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, ClientRecord>(&query).bind(id).bind(owner_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(cif) = data.cif {
            q = q.bind(cif);
        }
        if let Some(logo) = data.logo {
            q = q.bind(logo);
        }
        if let Some(address) = data.address {
            q = q.bind(Json(address));
        }

        let record = q.fetch_optional(&self.pool).await?;

        Ok(record.map(ClientRecord::to_domain))
    }
}
