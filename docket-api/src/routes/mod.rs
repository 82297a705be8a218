/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration, login, email verification and password reset
/// - `users`: Profile, company, address, logo and invitations
/// - `clients`: Client CRUD with archive/recover
/// - `projects`: Project CRUD with archive/recover
/// - `delivery_notes`: Delivery notes, PDF rendering and signing
///
/// Request bodies are camelCase JSON validated with `validator`. Helpers
/// shared by several resources live here.

pub mod auth;
pub mod clients;
pub mod delivery_notes;
pub mod health;
pub mod projects;
pub mod users;

use crate::error::{ApiError, ApiResult};
use axum::extract::Multipart;
use bytes::Bytes;
use docket_shared::models::address::Address;
use serde::Deserialize;
use validator::{Validate, ValidationError};

/// Tax id: one letter followed by eight digits
pub(crate) fn validate_cif(value: &str) -> Result<(), ValidationError> {
    let mut chars = value.chars();
    let letter = chars.next().map_or(false, |c| c.is_ascii_alphabetic());
    let digits: Vec<char> = chars.collect();

    if letter && digits.len() == 8 && digits.iter().all(char::is_ascii_digit) {
        Ok(())
    } else {
        Err(ValidationError::new("cif")
            .with_message("must be a letter followed by 8 digits".into()))
    }
}

/// Five-digit postal code
pub(crate) fn validate_postal(value: &str) -> Result<(), ValidationError> {
    if value.len() == 5 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("postal").with_message("must be 5 digits".into()))
    }
}

/// Six-digit verification code
pub(crate) fn validate_code(value: &str) -> Result<(), ValidationError> {
    if value.len() == 6 && value.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ValidationError::new("code").with_message("must be 6 digits".into()))
    }
}

/// Address as submitted for clients, projects and companies
///
/// Any subset of fields may be sent.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressBody {
    #[validate(length(min = 1, message = "must not be empty"))]
    pub street: Option<String>,

    #[validate(range(min = 0, message = "must not be negative"))]
    pub number: Option<i32>,

    #[validate(custom(function = "validate_postal"))]
    pub postal: Option<String>,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub city: Option<String>,

    #[validate(length(min = 1, message = "must not be empty"))]
    pub province: Option<String>,
}

impl From<AddressBody> for Address {
    fn from(body: AddressBody) -> Self {
        Address {
            street: body.street,
            number: body.number,
            postal: body.postal,
            city: body.city,
            province: body.province,
        }
    }
}

/// Reads one file field from a multipart body
///
/// Other fields are skipped. Returns `None` when the field is absent. The
/// filename is reduced to its last path segment and falls back to
/// `default_name`.
pub(crate) async fn read_file_field(
    multipart: &mut Multipart,
    name: &str,
    default_name: &str,
) -> ApiResult<Option<(Bytes, String)>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(name) {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(|f| f.rsplit(['/', '\\']).next())
            .filter(|f| !f.trim().is_empty())
            .unwrap_or(default_name)
            .to_string();

        let bytes = field.bytes().await?;
        return Ok(Some((bytes, filename)));
    }

    Ok(None)
}

/// Rejects a missing or empty file field
pub(crate) fn require_file(
    file: Option<(Bytes, String)>,
    field: &str,
) -> ApiResult<(Bytes, String)> {
    match file {
        Some((bytes, filename)) if !bytes.is_empty() => Ok((bytes, filename)),
        _ => Err(ApiError::BadRequest(format!("{} file is required", field))),
    }
}
