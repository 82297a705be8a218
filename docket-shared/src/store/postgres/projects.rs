use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::push_set;
use crate::models::address::Address;
use crate::models::project::{NewProject, Project, ServicePrice, UpdateProject};
use crate::store::{OwnedArchive, ProjectStore, StoreResult};

const PROJECT_COLUMNS: &str = "id, owner_id, client_id, name, project_code, code, address, \
     begin_date, end_date, notes, service_prices, archived, created_at, updated_at";

#[derive(FromRow)]
struct ProjectRecord {
    id: Uuid,
    owner_id: Uuid,
    client_id: Uuid,
    name: String,
    project_code: String,
    code: Option<String>,
    address: Json<Address>,
    begin_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    notes: Option<String>,
    service_prices: Json<Vec<ServicePrice>>,
    archived: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ProjectRecord {
    fn to_domain(self) -> Project {
        Project {
            id: self.id,
            owner_id: self.owner_id,
            client_id: self.client_id,
            name: self.name,
            project_code: self.project_code,
            code: self.code,
            address: self.address.0,
            begin: self.begin_date,
            end: self.end_date,
            notes: self.notes,
            service_prices: self.service_prices.0,
            archived: self.archived,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgProjectStore {
    pool: PgPool,
}

impl PgProjectStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn set_archived(&self, owner_id: Uuid, id: Uuid, archived: bool) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE projects SET archived = $3, updated_at = NOW() WHERE id = $1 AND owner_id = $2",
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
impl OwnedArchive for PgProjectStore {
    async fn archive(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.set_archived(owner_id, id, true).await
    }

    async fn recover(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        self.set_archived(owner_id, id, false).await
    }

    async fn purge(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ProjectStore for PgProjectStore {
    async fn create(&self, owner_id: Uuid, data: NewProject) -> StoreResult<Project> {
        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            r#"
            INSERT INTO projects (owner_id, client_id, name, project_code, code, address,
                                  begin_date, end_date, notes, service_prices)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(data.client_id)
        .bind(data.name)
        .bind(data.project_code)
        .bind(data.code)
        .bind(Json(data.address))
        .bind(data.begin)
        .bind(data.end)
        .bind(data.notes)
        .bind(Json(data.service_prices))
        .fetch_one(&self.pool)
        .await?;

        Ok(record.to_domain())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<Project>> {
        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ProjectRecord::to_domain))
    }

    async fn find_by_name(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Project>> {
        let record = sqlx::query_as::<_, ProjectRecord>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE owner_id = $1 AND client_id = $2 AND name = $3
            "#
        ))
        .bind(owner_id)
        .bind(client_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(ProjectRecord::to_domain))
    }

    async fn list(&self, owner_id: Uuid, archived: bool) -> StoreResult<Vec<Project>> {
        let records = sqlx::query_as::<_, ProjectRecord>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE owner_id = $1 AND archived = $2
            ORDER BY name
            "#
        ))
        .bind(owner_id)
        .bind(archived)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(ProjectRecord::to_domain).collect())
    }

    async fn any_for_client(&self, owner_id: Uuid, client_id: Uuid) -> StoreResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM projects WHERE owner_id = $1 AND client_id = $2)",
        )
        .bind(owner_id)
        .bind(client_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: UpdateProject,
    ) -> StoreResult<Option<Project>> {
        let mut query = String::from("UPDATE projects SET updated_at = NOW()");
        let mut bind_count = 2;

        if data.name.is_some() {
            push_set(&mut query, &mut bind_count, "name");
        }
        if data.project_code.is_some() {
            push_set(&mut query, &mut bind_count, "project_code");
        }
        if data.code.is_some() {
            push_set(&mut query, &mut bind_count, "code");
        }
        if data.address.is_some() {
            push_set(&mut query, &mut bind_count, "address");
        }
        if data.begin.is_some() {
            push_set(&mut query, &mut bind_count, "begin_date");
        }
        if data.end.is_some() {
            push_set(&mut query, &mut bind_count, "end_date");
        }
        if data.notes.is_some() {
            push_set(&mut query, &mut bind_count, "notes");
        }
        if data.service_prices.is_some() {
            push_set(&mut query, &mut bind_count, "service_prices");
        }

        query.push_str(&format!(
            " WHERE id = $1 AND owner_id = $2 RETURNING {PROJECT_COLUMNS}"
        ));

        let mut q = sqlx::query_as::<_, ProjectRecord>(&query).bind(id).bind(owner_id);

        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(project_code) = data.project_code {
            q = q.bind(project_code);
        }
        if let Some(code) = data.code {
            q = q.bind(code);
        }
        if let Some(address) = data.address {
            q = q.bind(Json(address));
        }
        if let Some(begin) = data.begin {
            q = q.bind(begin);
        }
        if let Some(end) = data.end {
            q = q.bind(end);
        }
        if let Some(notes) = data.notes {
            q = q.bind(notes);
        }
        if let Some(service_prices) = data.service_prices {
            q = q.bind(Json(service_prices));
        }

        let record = q.fetch_optional(&self.pool).await?;

        Ok(record.map(ProjectRecord::to_domain))
    }
}
