//! Postgres stores
//!
//! Each store wraps a clone of the shared `PgPool`. Rows are read into
//! private `*Record` structs and converted to domain models; JSONB columns
//! go through `sqlx::types::Json`.

mod clients;
mod companies;
mod delivery_notes;
mod projects;
mod users;

pub use clients::PgClientStore;
pub use companies::PgCompanyStore;
pub use delivery_notes::PgDeliveryNoteStore;
pub use projects::PgProjectStore;
pub use users::PgUserStore;

/// Appends `, column = $n` to an UPDATE statement and returns the new bind index
fn push_set(query: &mut String, bind_count: &mut usize, column: &str) {
    *bind_count += 1;
    query.push_str(&format!(", {} = ${}", column, bind_count));
}
