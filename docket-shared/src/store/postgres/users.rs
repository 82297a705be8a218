use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool};
use uuid::Uuid;

use super::push_set;
use crate::models::address::Address;
use crate::models::user::{NewUser, Role, UpdateUser, User};
use crate::store::{StoreResult, UserStore};
use crate::verification::{CodePurpose, VerificationState};

const USER_COLUMNS: &str = "id, email, password_hash, name, surnames, nif, logo, address, \
     is_freelancer, company_id, role, verified, active, code, code_purpose, tries, \
     code_issued_at, created_at, updated_at";

#[derive(FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    password_hash: Option<String>,
    name: Option<String>,
    surnames: Option<String>,
    nif: Option<String>,
    logo: Option<String>,
    address: Json<Address>,
    is_freelancer: bool,
    company_id: Option<Uuid>,
    role: Role,
    verified: bool,
    active: bool,
    code: Option<String>,
    code_purpose: Option<CodePurpose>,
    tries: i32,
    code_issued_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRecord {
    fn to_domain(self) -> User {
        User {
            id: self.id,
            email: self.email,
            password_hash: self.password_hash,
            name: self.name,
            surnames: self.surnames,
            nif: self.nif,
            logo: self.logo,
            address: self.address.0,
            is_freelancer: self.is_freelancer,
            company_id: self.company_id,
            role: self.role,
            verified: self.verified,
            active: self.active,
            verification: VerificationState {
                code: self.code,
                purpose: self.code_purpose,
                tries: self.tries,
                issued_at: self.code_issued_at,
            },
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Users table
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, data: NewUser) -> StoreResult<User> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            r#"
            INSERT INTO users (email, password_hash, role, company_id, name, surnames, nif)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.role)
        .bind(data.company_id)
        .bind(data.name)
        .bind(data.surnames)
        .bind(data.nif)
        .fetch_one(&self.pool)
        .await?;

        Ok(record.to_domain())
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserRecord::to_domain))
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let record = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record.map(UserRecord::to_domain))
    }

    async fn update(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.password_hash.is_some() {
            push_set(&mut query, &mut bind_count, "password_hash");
        }
        if data.name.is_some() {
            push_set(&mut query, &mut bind_count, "name");
        }
        if data.surnames.is_some() {
            push_set(&mut query, &mut bind_count, "surnames");
        }
        if data.nif.is_some() {
            push_set(&mut query, &mut bind_count, "nif");
        }
        if data.logo.is_some() {
            push_set(&mut query, &mut bind_count, "logo");
        }
        if data.address.is_some() {
            push_set(&mut query, &mut bind_count, "address");
        }
        if data.is_freelancer.is_some() {
            push_set(&mut query, &mut bind_count, "is_freelancer");
        }
        if data.company_id.is_some() {
            push_set(&mut query, &mut bind_count, "company_id");
        }
        if data.role.is_some() {
            push_set(&mut query, &mut bind_count, "role");
        }
        if data.verified.is_some() {
            push_set(&mut query, &mut bind_count, "verified");
        }
        if data.active.is_some() {
            push_set(&mut query, &mut bind_count, "active");
        }
        if data.verification.is_some() {
            for column in ["code", "code_purpose", "tries", "code_issued_at"] {
                push_set(&mut query, &mut bind_count, column);
            }
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {USER_COLUMNS}"));

        let mut q = sqlx::query_as::<_, UserRecord>(&query).bind(id);

        if let Some(password_hash) = data.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(name) = data.name {
            q = q.bind(name);
        }
        if let Some(surnames) = data.surnames {
            q = q.bind(surnames);
        }
        if let Some(nif) = data.nif {
            q = q.bind(nif);
        }
        if let Some(logo) = data.logo {
            q = q.bind(logo);
        }
        if let Some(address) = data.address {
            q = q.bind(Json(address));
        }
        if let Some(is_freelancer) = data.is_freelancer {
            q = q.bind(is_freelancer);
        }
        if let Some(company_id) = data.company_id {
            q = q.bind(company_id);
        }
        if let Some(role) = data.role {
            q = q.bind(role);
        }
        if let Some(verified) = data.verified {
            q = q.bind(verified);
        }
        if let Some(active) = data.active {
            q = q.bind(active);
        }
        if let Some(state) = data.verification {
            q = q
                .bind(state.code)
                .bind(state.purpose)
                .bind(state.tries)
                .bind(state.issued_at);
        }

        let record = q.fetch_optional(&self.pool).await?;

        Ok(record.map(UserRecord::to_domain))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_company_members(&self, company_id: Uuid, excluding: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE company_id = $1 AND id <> $2")
                .bind(company_id)
                .bind(excluding)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}
