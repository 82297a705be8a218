/// Delivery note endpoints
///
/// # Endpoints
///
/// - `POST /v1/delivery-notes` - Create a draft
/// - `GET /v1/delivery-notes` - List the caller's notes
/// - `GET /v1/delivery-notes/:id` - Note with client and project
/// - `DELETE /v1/delivery-notes/:id` - Delete a draft
/// - `POST /v1/delivery-notes/:id/pdf` - Render and upload, returns the URL
/// - `GET /v1/delivery-notes/:id/pdf` - Render and download the PDF
/// - `PATCH /v1/delivery-notes/:id/sign` - Sign (multipart field `signature`)
///
/// # Signing
///
/// ```text
/// PATCH /v1/delivery-notes/:id/sign
/// Content-Type: multipart/form-data; boundary=...
///
/// --...
/// Content-Disposition: form-data; name="signature"; filename="sig.png"
/// Content-Type: image/png
///
/// <bytes>
/// ```
///
/// The signature is stored first, then the signed PDF is rendered and
/// uploaded. A note can be signed once; afterwards it cannot be deleted.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::read_file_field,
};
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use docket_shared::{
    auth::middleware::AuthContext,
    models::delivery_note::{DeliveryNote, MaterialLine, NewDeliveryNote, NoteFormat, WorkerLine},
    services::delivery_notes::NoteDetail,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Create note request
///
/// Line requirements depend on `format` and are checked by the service.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateNoteRequest {
    pub client_id: Uuid,
    pub project_id: Uuid,
    pub format: NoteFormat,

    #[serde(default)]
    #[validate(length(max = 2000, message = "Description must be at most 2000 characters"))]
    pub description: String,

    #[serde(default)]
    pub workers: Vec<WorkerLine>,

    #[serde(default)]
    pub materials: Vec<MaterialLine>,

    /// Work date; defaults to now
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfUrlResponse {
    pub pdf_url: String,
}

/// Creates a draft note
///
/// # Errors
///
/// - `404 Not Found`: Client or project not owned by the caller
/// - `422 Unprocessable Entity`: Lines do not match the format
pub async fn create_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateNoteRequest>,
) -> ApiResult<(StatusCode, Json<DeliveryNote>)> {
    req.validate()?;

    let note = state
        .services
        .notes
        .create(
            auth.user_id,
            NewDeliveryNote {
                client_id: req.client_id,
                project_id: req.project_id,
                format: req.format,
                description: req.description,
                workers: req.workers,
                materials: req.materials,
                date: req.date.unwrap_or_else(Utc::now),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(note)))
}

pub async fn list_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<DeliveryNote>>> {
    Ok(Json(state.services.notes.list(auth.user_id).await?))
}

/// Returns the note with its client and project resolved
pub async fn get_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NoteDetail>> {
    Ok(Json(state.services.notes.get_detail(auth.user_id, id).await?))
}

/// Deletes a draft note
///
/// # Errors
///
/// - `409 Conflict`: The note is signed
pub async fn delete_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.services.notes.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Renders and uploads the PDF, reusing the cached one for signed notes
pub async fn render_pdf(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PdfUrlResponse>> {
    let pdf_url = state.services.notes.render_pdf(auth.user_id, id).await?;
    Ok(Json(PdfUrlResponse { pdf_url }))
}

/// Streams a freshly rendered PDF as an attachment
pub async fn download_pdf(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let document = state.services.notes.download_pdf(auth.user_id, id).await?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", document.filename),
            ),
        ],
        document.bytes,
    )
        .into_response())
}

/// Signs a draft note with the uploaded signature image
///
/// # Errors
///
/// - `400 Bad Request`: No signature file
/// - `409 Conflict`: Already signed
/// - `500 Internal Server Error`: Upload or rendering failed; a stored
///   signature stays in place
pub async fn sign_note(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> ApiResult<Json<DeliveryNote>> {
    let (signature, filename) = read_file_field(&mut multipart, "signature", "signature.png")
        .await?
        .unwrap_or_else(|| (Bytes::new(), "signature.png".to_string()));

    let note = state
        .services
        .notes
        .sign(auth.user_id, id, signature, &filename)
        .await?;

    Ok(Json(note))
}
