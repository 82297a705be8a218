/// Client endpoints
///
/// All operations are scoped to the authenticated owner; another owner's
/// client answers `404 Not Found`.
///
/// # Endpoints
///
/// - `POST /v1/clients` - Create
/// - `GET /v1/clients` - List active clients
/// - `GET /v1/clients/archived` - List archived clients
/// - `GET /v1/clients/:id` - Get one
/// - `PUT /v1/clients/:id` - Update
/// - `DELETE /v1/clients/:id` - Hard delete
/// - `PATCH /v1/clients/:id/archive` - Archive
/// - `PATCH /v1/clients/:id/recover` - Recover from archive

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{validate_cif, AddressBody},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use docket_shared::{
    auth::middleware::AuthContext,
    models::client::{Client, NewClient, UpdateClient},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(custom(function = "validate_cif"))]
    pub cif: String,

    #[validate(length(max = 2048, message = "Logo URL is too long"))]
    pub logo: Option<String>,

    #[validate(nested)]
    pub address: Option<AddressBody>,
}

/// Partial client update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[validate(custom(function = "validate_cif"))]
    pub cif: Option<String>,

    #[validate(length(max = 2048, message = "Logo URL is too long"))]
    pub logo: Option<String>,

    #[validate(nested)]
    pub address: Option<AddressBody>,
}

/// Creates a client
///
/// # Errors
///
/// - `409 Conflict`: The owner already has a client with this name
pub async fn create_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateClientRequest>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    req.validate()?;

    let client = state
        .services
        .clients
        .create(
            auth.user_id,
            NewClient {
                name: req.name,
                cif: req.cif,
                logo: req.logo,
                address: req.address.map(Into::into).unwrap_or_default(),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(client)))
}

pub async fn list_clients(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.services.clients.list(auth.user_id).await?))
}

pub async fn list_archived_clients(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.services.clients.list_archived(auth.user_id).await?))
}

pub async fn get_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Client>> {
    Ok(Json(state.services.clients.get(auth.user_id, id).await?))
}

pub async fn update_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateClientRequest>,
) -> ApiResult<Json<Client>> {
    req.validate()?;

    let client = state
        .services
        .clients
        .update(
            auth.user_id,
            id,
            UpdateClient {
                name: req.name,
                cif: req.cif,
                logo: req.logo.map(Some),
                address: req.address.map(Into::into),
            },
        )
        .await?;

    Ok(Json(client))
}

pub async fn archive_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.clients.archive(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn recover_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.clients.recover(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Removes the client for good
pub async fn delete_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.clients.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
