use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use crate::models::delivery_note::{
    DeliveryNote, MaterialLine, NewDeliveryNote, NoteFormat, WorkerLine,
};
use crate::store::{DeliveryNoteStore, NoteParent, StoreResult};

const NOTE_COLUMNS: &str = "id, owner_id, client_id, project_id, format, description, workers, \
     materials, work_date, sign, pending, pdf_url, created_at, updated_at";

#[derive(FromRow)]
struct DeliveryNoteRecord {
    id: Uuid,
    owner_id: Uuid,
    client_id: Uuid,
    project_id: Uuid,
    format: NoteFormat,
    description: String,
    workers: Json<Vec<WorkerLine>>,
    materials: Json<Vec<MaterialLine>>,
    work_date: DateTime<Utc>,
    sign: String,
    pending: bool,
    pdf_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DeliveryNoteRecord {
    fn to_domain(self) -> DeliveryNote {
        DeliveryNote {
            id: self.id,
            owner_id: self.owner_id,
            client_id: self.client_id,
            project_id: self.project_id,
            format: self.format,
            description: self.description,
            workers: self.workers.0,
            materials: self.materials.0,
            date: self.work_date,
            sign: self.sign,
            pending: self.pending,
            pdf_url: self.pdf_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Delivery notes table
///
/// Signing and PDF caching are conditional single-row updates, so two
/// concurrent signers cannot both win.
#[derive(Clone)]
pub struct PgDeliveryNoteStore {
    pool: PgPool,
}

impl PgDeliveryNoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryNoteStore for PgDeliveryNoteStore {
    async fn create(&self, owner_id: Uuid, data: NewDeliveryNote) -> StoreResult<DeliveryNote> {
        let record = sqlx::query_as::<_, DeliveryNoteRecord>(&format!(
            r#"
            INSERT INTO delivery_notes (owner_id, client_id, project_id, format, description,
                                        workers, materials, work_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(owner_id)
        .bind(data.client_id)
        .bind(data.project_id)
        .bind(data.format)
        .bind(data.description)
        .bind(Json(data.workers))
        .bind(Json(data.materials))
        .bind(data.date)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.to_domain())
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<DeliveryNote>> {
        let record = sqlx::query_as::<_, DeliveryNoteRecord>(&format!(
            "SELECT {NOTE_COLUMNS} FROM delivery_notes WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(DeliveryNoteRecord::to_domain))
    }

    async fn list(&self, owner_id: Uuid) -> StoreResult<Vec<DeliveryNote>> {
        let records = sqlx::query_as::<_, DeliveryNoteRecord>(&format!(
            r#"
            SELECT {NOTE_COLUMNS}
            FROM delivery_notes
            WHERE owner_id = $1
            ORDER BY created_at DESC
            "#
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records.into_iter().map(DeliveryNoteRecord::to_domain).collect())
    }

    async fn mark_signed(
        &self,
        owner_id: Uuid,
        id: Uuid,
        sign_url: &str,
    ) -> StoreResult<Option<DeliveryNote>> {
        let record = sqlx::query_as::<_, DeliveryNoteRecord>(&format!(
            r#"
            UPDATE delivery_notes
            SET sign = $3, pending = FALSE, pdf_url = '', updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND sign = ''
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(sign_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(DeliveryNoteRecord::to_domain))
    }

    async fn set_pdf_url(
        &self,
        owner_id: Uuid,
        id: Uuid,
        expected_sign: &str,
        pdf_url: &str,
    ) -> StoreResult<Option<DeliveryNote>> {
        let record = sqlx::query_as::<_, DeliveryNoteRecord>(&format!(
            r#"
            UPDATE delivery_notes
            SET pdf_url = $4, updated_at = NOW()
            WHERE id = $1 AND owner_id = $2 AND sign = $3
            RETURNING {NOTE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(owner_id)
        .bind(expected_sign)
        .bind(pdf_url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(DeliveryNoteRecord::to_domain))
    }

    async fn delete_unsigned(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM delivery_notes WHERE id = $1 AND owner_id = $2 AND sign = ''")
                .bind(id)
                .bind(owner_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn any_for(&self, owner_id: Uuid, parent: NoteParent) -> StoreResult<bool> {
        let (column, parent_id) = match parent {
            NoteParent::Client(id) => ("client_id", id),
            NoteParent::Project(id) => ("project_id", id),
        };

        let exists: bool = sqlx::query_scalar(&format!(
            "SELECT EXISTS (SELECT 1 FROM delivery_notes WHERE owner_id = $1 AND {column} = $2)"
        ))
        .bind(owner_id)
        .bind(parent_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
