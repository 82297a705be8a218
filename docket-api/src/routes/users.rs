/// Profile and invitation endpoints for the authenticated user
///
/// # Endpoints
///
/// - `GET /v1/users/me` - Profile with company
/// - `PUT /v1/users/me` - Update personal data
/// - `DELETE /v1/users/me?soft=true|false` - Deactivate (default) or erase
/// - `PATCH /v1/users/me/company` - Create or replace the caller's company
/// - `PATCH /v1/users/me/address` - Update the caller's address
/// - `PATCH /v1/users/me/logo` - Upload a logo (multipart field `image`)
/// - `POST /v1/users/invite` - Invite a guest into the caller's company

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{read_file_field, require_file, validate_cif, validate_postal, AddressBody},
};
use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Extension, Json,
};
use docket_shared::{
    auth::middleware::AuthContext,
    models::{address::Address, company::CompanyData, user::PublicUser},
    services::accounts::{Invitation, PersonalData},
};
use serde::Deserialize;
use validator::Validate;

/// Personal data update
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PersonalDataRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 100, message = "Surnames are required"))]
    pub surnames: String,

    #[validate(length(min = 1, max = 20, message = "NIF is required"))]
    pub nif: String,

    pub is_freelancer: Option<bool>,
}

/// Company data
///
/// Freelancers may send an empty body; their company is derived from their
/// personal data and address.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CompanyRequest {
    #[validate(length(min = 1, max = 200, message = "Company name must not be empty"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_cif"))]
    pub cif: Option<String>,

    #[validate(nested)]
    pub address: Option<AddressBody>,
}

impl CompanyRequest {
    fn into_data(self) -> Option<CompanyData> {
        match (self.name, self.cif) {
            (Some(name), Some(cif)) => Some(CompanyData {
                name,
                cif,
                address: self.address.map(Into::into).unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

/// Full postal address of the caller
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddressRequest {
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,

    #[validate(range(min = 0, message = "must not be negative"))]
    pub number: i32,

    #[validate(custom(function = "validate_postal"))]
    pub postal: String,

    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, message = "Province is required"))]
    pub province: String,
}

impl From<AddressRequest> for Address {
    fn from(req: AddressRequest) -> Self {
        Address {
            street: Some(req.street),
            number: Some(req.number),
            postal: Some(req.postal),
            city: Some(req.city),
            province: Some(req.province),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteQuery {
    /// Soft delete deactivates; hard delete removes the account
    pub soft: Option<bool>,
}

pub async fn get_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PublicUser>> {
    let user = state.services.accounts.get_self(auth.user_id).await?;
    Ok(Json(user))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<PersonalDataRequest>,
) -> ApiResult<Json<PublicUser>> {
    req.validate()?;

    let user = state
        .services
        .accounts
        .update_personal_data(
            auth.user_id,
            PersonalData {
                name: req.name,
                surnames: req.surnames,
                nif: req.nif,
                is_freelancer: req.is_freelancer,
            },
        )
        .await?;

    Ok(Json(user))
}

/// Deletes the caller's account
///
/// Soft unless `soft=false` is given.
pub async fn delete_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<DeleteQuery>,
) -> ApiResult<StatusCode> {
    let soft = query.soft.unwrap_or(true);
    state
        .services
        .accounts
        .delete_user(auth.user_id, soft)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// Creates or replaces the caller's company
///
/// # Errors
///
/// - `400 Bad Request`: Freelancer without a complete address
/// - `422 Unprocessable Entity`: Company data missing or invalid
pub async fn update_company(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    body: Option<Json<CompanyRequest>>,
) -> ApiResult<Json<PublicUser>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    req.validate()?;

    let user = state
        .services
        .accounts
        .update_company(auth.user_id, req.into_data())
        .await?;

    Ok(Json(user))
}

pub async fn update_address(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AddressRequest>,
) -> ApiResult<Json<PublicUser>> {
    req.validate()?;

    let user = state
        .services
        .accounts
        .update_address(auth.user_id, req.into())
        .await?;

    Ok(Json(user))
}

/// Uploads a logo from the multipart field `image`
pub async fn update_logo(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    mut multipart: Multipart,
) -> ApiResult<Json<PublicUser>> {
    let file = read_file_field(&mut multipart, "image", "logo.png").await?;
    let (bytes, filename) = require_file(file, "image")?;

    let user = state
        .services
        .accounts
        .update_logo(auth.user_id, bytes, &filename)
        .await?;

    Ok(Json(user))
}

/// Invites a guest into the caller's company
///
/// Returns `201 Created` for a new guest account and `200 OK` when an
/// existing account without a company was attached.
pub async fn invite(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<InviteRequest>,
) -> ApiResult<(StatusCode, Json<Invitation>)> {
    req.validate()?;

    let invitation = state
        .services
        .accounts
        .invite_user(auth.user_id, &req.email)
        .await?;

    let status = if invitation.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((status, Json(invitation)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_request_requires_name_and_cif() {
        let req = CompanyRequest {
            name: Some("Acme".into()),
            cif: None,
            address: None,
        };
        assert!(req.into_data().is_none());

        let req = CompanyRequest {
            name: Some("Acme".into()),
            cif: Some("B12345678".into()),
            address: None,
        };
        let data = req.into_data().unwrap();
        assert_eq!(data.cif, "B12345678");
        assert_eq!(data.address, Address::default());
    }

    #[test]
    fn test_company_request_rejects_bad_cif() {
        let req: CompanyRequest =
            serde_json::from_str(r#"{"name":"Acme","cif":"12345678"}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
