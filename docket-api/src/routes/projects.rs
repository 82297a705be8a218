/// Project endpoints
///
/// Projects hang off one of the owner's clients. Same shape as the client
/// endpoints under `/v1/projects`.

use crate::{app::AppState, error::ApiResult, routes::AddressBody};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::NaiveDate;
use docket_shared::{
    auth::middleware::AuthContext,
    models::project::{NewProject, Project, ServicePrice, UpdateProject},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServicePriceBody {
    #[validate(length(min = 1, message = "Service name is required"))]
    pub service_name: String,

    #[validate(range(min = 0.0, message = "Unit price must not be negative"))]
    pub unit_price: f64,
}

impl From<ServicePriceBody> for ServicePrice {
    fn from(body: ServicePriceBody) -> Self {
        ServicePrice {
            service_name: body.service_name,
            unit_price: body.unit_price,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    pub client_id: Uuid,

    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, max = 50, message = "Project code is required"))]
    pub project_code: String,

    pub code: Option<String>,

    #[validate(nested)]
    pub address: Option<AddressBody>,

    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub notes: Option<String>,

    #[serde(default)]
    #[validate(nested)]
    pub service_prices: Vec<ServicePriceBody>,
}

/// Partial project update; absent fields are left unchanged
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200, message = "Name must not be empty"))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Project code must not be empty"))]
    pub project_code: Option<String>,

    pub code: Option<String>,

    #[validate(nested)]
    pub address: Option<AddressBody>,

    pub begin: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub notes: Option<String>,

    #[validate(nested)]
    pub service_prices: Option<Vec<ServicePriceBody>>,
}

/// Creates a project for one of the caller's clients
///
/// # Errors
///
/// - `404 Not Found`: Client does not exist or belongs to someone else
/// - `409 Conflict`: The client already has a project with this name
/// - `422 Unprocessable Entity`: Validation failed or `end` precedes `begin`
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    req.validate()?;

    let project = state
        .services
        .projects
        .create(
            auth.user_id,
            NewProject {
                client_id: req.client_id,
                name: req.name,
                project_code: req.project_code,
                code: req.code,
                address: req.address.map(Into::into).unwrap_or_default(),
                begin: req.begin,
                end: req.end,
                notes: req.notes,
                service_prices: req.service_prices.into_iter().map(Into::into).collect(),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.services.projects.list(auth.user_id).await?))
}

pub async fn list_archived_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.services.projects.list_archived(auth.user_id).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.services.projects.get(auth.user_id, id).await?))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateProjectRequest>,
) -> ApiResult<Json<Project>> {
    req.validate()?;

    let project = state
        .services
        .projects
        .update(
            auth.user_id,
            id,
            UpdateProject {
                name: req.name,
                project_code: req.project_code,
                code: req.code.map(Some),
                address: req.address.map(Into::into),
                begin: req.begin.map(Some),
                end: req.end.map(Some),
                notes: req.notes.map(Some),
                service_prices: req
                    .service_prices
                    .map(|prices| prices.into_iter().map(Into::into).collect()),
            },
        )
        .await?;

    Ok(Json(project))
}

pub async fn archive_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.projects.archive(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn recover_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.projects.recover(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.projects.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
