//! Delivery note lifecycle
//!
//! ```text
//! create ──> Draft ──sign──> Signed
//!             │  ↺ render_pdf   ↺ render_pdf (cached)
//!             └──delete
//! ```
//!
//! Signing writes twice. The first write stores the signature and clears
//! any cached PDF in one conditional update, so only one signer can win and
//! the signature is durable before the PDF is rendered. The second write
//! stores the signed PDF. If rendering fails in between, the next
//! `render_pdf` call renders it again.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifacts::ArtifactStore;
use crate::error::{ServiceError, ServiceResult};
use crate::models::client::Client;
use crate::models::delivery_note::{validate_lines, DeliveryNote, NewDeliveryNote, NoteState};
use crate::models::project::Project;
use crate::render::{DocumentRenderer, RenderContext, RenderError};
use crate::store::{ClientStore, DeliveryNoteStore, ProjectStore, UserStore};

/// A note with its client and project resolved
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteDetail {
    #[serde(flatten)]
    pub note: DeliveryNote,
    pub client: Option<Client>,
    pub project: Option<Project>,
}

/// A rendered document that was not uploaded
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct DeliveryNoteService {
    pub(crate) users: Arc<dyn UserStore>,
    pub(crate) clients: Arc<dyn ClientStore>,
    pub(crate) projects: Arc<dyn ProjectStore>,
    pub(crate) notes: Arc<dyn DeliveryNoteStore>,
    pub(crate) artifacts: Arc<dyn ArtifactStore>,
    pub(crate) renderer: Arc<dyn DocumentRenderer>,
}

impl DeliveryNoteService {
    /// Validates lines and references, then stores a new draft
    pub async fn create(&self, owner_id: Uuid, data: NewDeliveryNote) -> ServiceResult<DeliveryNote> {
        validate_lines(data.format, &data.workers, &data.materials)
            .map_err(ServiceError::InvalidPayload)?;

        self.clients
            .find(owner_id, data.client_id)
            .await?
            .ok_or(ServiceError::NotFound("Client"))?;

        let project = self
            .projects
            .find(owner_id, data.project_id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))?;

        if project.client_id != data.client_id {
            return Err(ServiceError::invalid(
                "projectId",
                "project does not belong to the given client",
            ));
        }

        let note = self.notes.create(owner_id, data).await?;

        tracing::info!(
            %owner_id,
            note_id = %note.id,
            format = note.format.as_str(),
            "Delivery note created"
        );
        Ok(note)
    }

    /// Newest first
    pub async fn list(&self, owner_id: Uuid) -> ServiceResult<Vec<DeliveryNote>> {
        Ok(self.notes.list(owner_id).await?)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<DeliveryNote> {
        self.notes
            .find(owner_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Delivery note"))
    }

    pub async fn get_detail(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<NoteDetail> {
        let note = self.get(owner_id, id).await?;
        let (client, project) = futures::try_join!(
            self.clients.find(owner_id, note.client_id),
            self.projects.find(owner_id, note.project_id),
        )?;

        Ok(NoteDetail {
            note,
            client,
            project,
        })
    }

    async fn render(&self, note: DeliveryNote) -> ServiceResult<RenderedDocument> {
        let owner = self
            .users
            .find_by_id(note.owner_id)
            .await?
            .ok_or(ServiceError::NotFound("User"))?;
        let client = self.clients.find(note.owner_id, note.client_id).await?;
        let project = self.projects.find(note.owner_id, note.project_id).await?;

        let filename = format!("delivery-note-{}.{}", note.id, self.renderer.extension());
        let ctx = RenderContext {
            note,
            owner,
            client,
            project,
        };

        let renderer = Arc::clone(&self.renderer);
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&ctx))
            .await
            .map_err(|e| RenderError::Task(e.to_string()))??;

        Ok(RenderedDocument { filename, bytes })
    }

    /// Renders, uploads and caches the PDF of `note`
    async fn publish(&self, note: DeliveryNote) -> ServiceResult<String> {
        let (owner_id, id) = (note.owner_id, note.id);
        let observed_sign = note.sign.clone();

        let document = self.render(note).await?;
        let artifact = self
            .artifacts
            .upload(Bytes::from(document.bytes), &document.filename)
            .await?;

        let stored = self
            .notes
            .set_pdf_url(owner_id, id, &observed_sign, &artifact.url)
            .await?;

        if stored.is_none() {
            tracing::warn!(
                note_id = %id,
                "Note changed while rendering; PDF URL not cached"
            );
        }

        tracing::info!(note_id = %id, url = %artifact.url, "Delivery note PDF published");
        Ok(artifact.url)
    }

    /// URL of the note's PDF
    ///
    /// A signed note with a cached PDF is returned as is. Anything else is
    /// rendered and uploaded again.
    pub async fn render_pdf(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<String> {
        let note = self.get(owner_id, id).await?;

        if let Some(url) = note.cached_signed_pdf() {
            tracing::debug!(note_id = %id, "Serving cached signed PDF");
            return Ok(url.to_string());
        }

        self.publish(note).await
    }

    /// Renders the PDF without uploading or caching it
    pub async fn download_pdf(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<RenderedDocument> {
        let note = self.get(owner_id, id).await?;
        self.render(note).await
    }

    /// Signs a draft note, then publishes the signed PDF
    pub async fn sign(
        &self,
        owner_id: Uuid,
        id: Uuid,
        signature: Bytes,
        filename: &str,
    ) -> ServiceResult<DeliveryNote> {
        let note = self.get(owner_id, id).await?;
        if !note.state().can_transition_to(&NoteState::Signed) {
            return Err(ServiceError::AlreadySigned);
        }
        if signature.is_empty() {
            return Err(ServiceError::MissingSignature);
        }

        let artifact = self.artifacts.upload(signature, filename).await?;

        let signed = match self.notes.mark_signed(owner_id, id, &artifact.url).await? {
            Some(signed) => signed,
            None => {
                // Lost a race with another signer, or the note vanished
                return Err(match self.notes.find(owner_id, id).await? {
                    Some(_) => ServiceError::AlreadySigned,
                    None => ServiceError::NotFound("Delivery note"),
                });
            }
        };

        tracing::info!(%owner_id, note_id = %id, "Delivery note signed");

        let pdf_url = self.publish(signed.clone()).await?;

        Ok(DeliveryNote { pdf_url, ..signed })
    }

    /// Deletes a draft; signed notes are immutable
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
        let note = self.get(owner_id, id).await?;
        if note.is_signed() {
            return Err(ServiceError::SignedImmutable);
        }

        if !self.notes.delete_unsigned(owner_id, id).await? {
            return Err(match self.notes.find(owner_id, id).await? {
                Some(_) => ServiceError::SignedImmutable,
                None => ServiceError::NotFound("Delivery note"),
            });
        }

        tracing::info!(%owner_id, note_id = %id, "Delivery note deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::MemoryArtifactStore;
    use crate::messaging::MemoryMailer;
    use crate::models::address::Address;
    use crate::models::client::NewClient;
    use crate::models::delivery_note::{MaterialLine, NoteFormat, WorkerLine};
    use crate::models::project::NewProject;
    use crate::models::user::NewUser;
    use crate::services::test_support::{harness, harness_with, Harness};
    use chrono::Utc;

    struct Fixture {
        owner: Uuid,
        client: Uuid,
        project: Uuid,
    }

    async fn fixture(h: &Harness) -> Fixture {
        let owner = h
            .stores
            .users
            .create(NewUser::registered("alice@example.com", "digest".into()))
            .await
            .unwrap()
            .id;

        let client = h
            .services
            .clients
            .create(
                owner,
                NewClient {
                    name: "Acme".into(),
                    cif: "B12345678".into(),
                    logo: None,
                    address: Address::default(),
                },
            )
            .await
            .unwrap()
            .id;

        let project = h
            .services
            .projects
            .create(
                owner,
                NewProject {
                    client_id: client,
                    name: "Warehouse".into(),
                    project_code: "WH-01".into(),
                    code: None,
                    address: Address::default(),
                    begin: None,
                    end: None,
                    notes: None,
                    service_prices: vec![],
                },
            )
            .await
            .unwrap()
            .id;

        Fixture {
            owner,
            client,
            project,
        }
    }

    fn materials_note(f: &Fixture) -> NewDeliveryNote {
        NewDeliveryNote {
            client_id: f.client,
            project_id: f.project,
            format: NoteFormat::Materials,
            description: "Wiring".into(),
            workers: vec![],
            materials: vec![MaterialLine {
                name: "Cable".into(),
                quantity: 20.0,
                unit: "m".into(),
            }],
            date: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_validates_format() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;

        let mut data = materials_note(&f);
        data.format = NoteFormat::Hours;
        data.materials.clear();
        let err = notes.create(f.owner, data.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));

        data.format = NoteFormat::Both;
        data.workers = vec![WorkerLine {
            name: "Luis".into(),
            hours: 8.0,
        }];
        let err = notes.create(f.owner, data.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));

        data.materials = materials_note(&f).materials;
        let note = notes.create(f.owner, data).await.unwrap();
        assert!(note.pending);
        assert!(note.sign.is_empty());
        assert!(note.pdf_url.is_empty());

        assert!(notes.list(f.owner).await.unwrap().len() == 1);
    }

    #[tokio::test]
    async fn test_create_checks_references() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;

        let mut data = materials_note(&f);
        data.client_id = Uuid::new_v4();
        assert!(matches!(
            notes.create(f.owner, data).await.unwrap_err(),
            ServiceError::NotFound("Client")
        ));

        let mut data = materials_note(&f);
        data.project_id = Uuid::new_v4();
        assert!(matches!(
            notes.create(f.owner, data).await.unwrap_err(),
            ServiceError::NotFound("Project")
        ));

        let other_client = h
            .services
            .clients
            .create(
                f.owner,
                NewClient {
                    name: "Globex".into(),
                    cif: "B87654321".into(),
                    logo: None,
                    address: Address::default(),
                },
            )
            .await
            .unwrap();
        let mut data = materials_note(&f);
        data.client_id = other_client.id;
        assert!(matches!(
            notes.create(f.owner, data).await.unwrap_err(),
            ServiceError::InvalidPayload(_)
        ));

        // Someone else's client and project are invisible
        assert!(matches!(
            notes.create(Uuid::new_v4(), materials_note(&f)).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_sign_and_render_scenario() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;
        let note = notes.create(f.owner, materials_note(&f)).await.unwrap();

        let url1 = notes.render_pdf(f.owner, note.id).await.unwrap();
        assert_eq!(notes.get(f.owner, note.id).await.unwrap().pdf_url, url1);

        // Drafts are rendered again on every call
        let url1b = notes.render_pdf(f.owner, note.id).await.unwrap();
        assert_ne!(url1, url1b);

        let signed = notes
            .sign(f.owner, note.id, Bytes::from_static(b"png"), "signature.png")
            .await
            .unwrap();
        assert!(!signed.sign.is_empty());
        assert!(!signed.pending);
        assert_ne!(signed.pdf_url, url1b);
        assert!(!signed.pdf_url.is_empty());

        let stored = notes.get(f.owner, note.id).await.unwrap();
        assert_eq!(stored.pdf_url, signed.pdf_url);

        let uploads = h.artifacts.upload_count();
        for _ in 0..3 {
            assert_eq!(notes.render_pdf(f.owner, note.id).await.unwrap(), signed.pdf_url);
        }
        assert_eq!(h.artifacts.upload_count(), uploads);
    }

    #[tokio::test]
    async fn test_sign_is_one_shot() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;
        let note = notes.create(f.owner, materials_note(&f)).await.unwrap();

        notes
            .sign(f.owner, note.id, Bytes::from_static(b"one"), "signature.png")
            .await
            .unwrap();
        let first = notes.get(f.owner, note.id).await.unwrap();

        let err = notes
            .sign(f.owner, note.id, Bytes::from_static(b"two"), "signature.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::AlreadySigned));

        let second = notes.get(f.owner, note.id).await.unwrap();
        assert_eq!(first.sign, second.sign);
        assert_eq!(first.pdf_url, second.pdf_url);
    }

    #[tokio::test]
    async fn test_signed_note_outlives_client_and_project_purge() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;
        let note = notes.create(f.owner, materials_note(&f)).await.unwrap();
        let signed = notes
            .sign(f.owner, note.id, Bytes::from_static(b"sig"), "signature.png")
            .await
            .unwrap();

        let err = h.services.clients.delete(f.owner, f.client).await.unwrap_err();
        assert!(matches!(err, ServiceError::InUse(_)));
        let err = h.services.projects.delete(f.owner, f.project).await.unwrap_err();
        assert!(matches!(err, ServiceError::InUse(_)));

        let stored = notes.get(f.owner, note.id).await.unwrap();
        assert_eq!(stored.sign, signed.sign);
        assert!(h.services.clients.get(f.owner, f.client).await.is_ok());
        assert!(h.services.projects.get(f.owner, f.project).await.is_ok());
    }

    #[tokio::test]
    async fn test_sign_requires_bytes() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;
        let note = notes.create(f.owner, materials_note(&f)).await.unwrap();

        let err = notes
            .sign(f.owner, note.id, Bytes::new(), "signature.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MissingSignature));

        let err = notes
            .sign(f.owner, Uuid::new_v4(), Bytes::from_static(b"x"), "signature.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_signature_survives_failed_pdf_upload() {
        // Signature upload succeeds, PDF upload fails
        let h = harness_with(MemoryMailer::new(), MemoryArtifactStore::failing_after(1));
        let f = fixture(&h).await;
        let notes = &h.services.notes;
        let note = notes.create(f.owner, materials_note(&f)).await.unwrap();

        let err = notes
            .sign(f.owner, note.id, Bytes::from_static(b"png"), "signature.png")
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ArtifactUploadFailed(_)));

        let stored = notes.get(f.owner, note.id).await.unwrap();
        assert!(stored.is_signed());
        assert!(!stored.pending);
        assert!(stored.pdf_url.is_empty());
    }

    #[tokio::test]
    async fn test_failed_signature_upload_leaves_draft() {
        let h = harness_with(MemoryMailer::new(), MemoryArtifactStore::failing_after(0));
        let f = fixture(&h).await;
        let notes = &h.services.notes;
        let note = notes.create(f.owner, materials_note(&f)).await.unwrap();

        assert!(notes
            .sign(f.owner, note.id, Bytes::from_static(b"png"), "signature.png")
            .await
            .is_err());

        let stored = notes.get(f.owner, note.id).await.unwrap();
        assert!(!stored.is_signed());
        assert!(stored.pending);
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;

        let draft = notes.create(f.owner, materials_note(&f)).await.unwrap();
        notes.delete(f.owner, draft.id).await.unwrap();
        assert!(matches!(
            notes.get(f.owner, draft.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));
        assert!(matches!(
            notes.delete(f.owner, draft.id).await.unwrap_err(),
            ServiceError::NotFound(_)
        ));

        let signed = notes.create(f.owner, materials_note(&f)).await.unwrap();
        notes
            .sign(f.owner, signed.id, Bytes::from_static(b"png"), "signature.png")
            .await
            .unwrap();
        for _ in 0..2 {
            assert!(matches!(
                notes.delete(f.owner, signed.id).await.unwrap_err(),
                ServiceError::SignedImmutable
            ));
        }
        assert!(notes.get(f.owner, signed.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_detail_and_download() {
        let h = harness();
        let f = fixture(&h).await;
        let notes = &h.services.notes;
        let note = notes.create(f.owner, materials_note(&f)).await.unwrap();

        let detail = notes.get_detail(f.owner, note.id).await.unwrap();
        assert_eq!(detail.client.unwrap().name, "Acme");
        assert_eq!(detail.project.unwrap().name, "Warehouse");

        let uploads = h.artifacts.upload_count();
        let document = notes.download_pdf(f.owner, note.id).await.unwrap();
        assert!(document.bytes.starts_with(b"%PDF"));
        assert_eq!(document.filename, format!("delivery-note-{}.pdf", note.id));
        assert_eq!(h.artifacts.upload_count(), uploads);

        assert!(notes.get(Uuid::new_v4(), note.id).await.is_err());
    }
}
