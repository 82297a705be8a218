//! Project management, always scoped to the calling owner

use std::sync::Arc;

use uuid::Uuid;

use super::{duplicate_on_conflict, in_use_on_reference};
use crate::error::{ServiceError, ServiceResult};
use crate::models::project::{dates_in_order, NewProject, Project, UpdateProject};
use crate::store::{ClientStore, DeliveryNoteStore, NoteParent, ProjectStore};

#[derive(Clone)]
pub struct ProjectService {
    pub(crate) clients: Arc<dyn ClientStore>,
    pub(crate) projects: Arc<dyn ProjectStore>,
    pub(crate) notes: Arc<dyn DeliveryNoteStore>,
}

fn duplicate_message(name: &str) -> String {
    format!("A project named '{}' already exists for this client", name)
}

fn out_of_order() -> ServiceError {
    ServiceError::invalid("end", "must not be before begin")
}

impl ProjectService {
    /// Creates a project under one of the owner's clients
    pub async fn create(&self, owner_id: Uuid, data: NewProject) -> ServiceResult<Project> {
        if !dates_in_order(data.begin, data.end) {
            return Err(out_of_order());
        }

        self.clients
            .find(owner_id, data.client_id)
            .await?
            .ok_or(ServiceError::NotFound("Client"))?;

        if self
            .projects
            .find_by_name(owner_id, data.client_id, &data.name)
            .await?
            .is_some()
        {
            return Err(ServiceError::Duplicate(duplicate_message(&data.name)));
        }

        let name = data.name.clone();
        let project = self
            .projects
            .create(owner_id, data)
            .await
            .map_err(|e| duplicate_on_conflict(e, || duplicate_message(&name)))?;

        tracing::info!(%owner_id, project_id = %project.id, client_id = %project.client_id, "Project created");
        Ok(project)
    }

    pub async fn list(&self, owner_id: Uuid) -> ServiceResult<Vec<Project>> {
        Ok(self.projects.list(owner_id, false).await?)
    }

    pub async fn list_archived(&self, owner_id: Uuid) -> ServiceResult<Vec<Project>> {
        Ok(self.projects.list(owner_id, true).await?)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<Project> {
        self.projects
            .find(owner_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Project"))
    }

    /// Applies a patch; the resulting dates must still be in order
    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: UpdateProject,
    ) -> ServiceResult<Project> {
        let current = self.get(owner_id, id).await?;

        let begin = data.begin.unwrap_or(current.begin);
        let end = data.end.unwrap_or(current.end);
        if !dates_in_order(begin, end) {
            return Err(out_of_order());
        }

        if let Some(name) = &data.name {
            if let Some(existing) = self
                .projects
                .find_by_name(owner_id, current.client_id, name)
                .await?
            {
                if existing.id != id {
                    return Err(ServiceError::Duplicate(duplicate_message(name)));
                }
            }
        }

        let name = data.name.clone().unwrap_or(current.name);
        self.projects
            .update(owner_id, id, data)
            .await
            .map_err(|e| duplicate_on_conflict(e, || duplicate_message(&name)))?
            .ok_or(ServiceError::NotFound("Project"))
    }

    pub async fn archive(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
        if !self.projects.archive(owner_id, id).await? {
            return Err(ServiceError::NotFound("Project"));
        }
        tracing::info!(%owner_id, project_id = %id, "Project archived");
        Ok(())
    }

    pub async fn recover(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
        if !self.projects.recover(owner_id, id).await? {
            return Err(ServiceError::NotFound("Project"));
        }
        tracing::info!(%owner_id, project_id = %id, "Project recovered");
        Ok(())
    }

    /// Hard delete, refused while delivery notes reference the project
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
        let in_use = || "Project still has delivery notes; archive it instead".to_string();

        if self.notes.any_for(owner_id, NoteParent::Project(id)).await? {
            return Err(ServiceError::InUse(in_use()));
        }

        let purged = self
            .projects
            .purge(owner_id, id)
            .await
            .map_err(|e| in_use_on_reference(e, in_use))?;
        if !purged {
            return Err(ServiceError::NotFound("Project"));
        }
        tracing::info!(%owner_id, project_id = %id, "Project deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::address::Address;
    use crate::models::client::NewClient;
    use crate::models::project::ServicePrice;
    use crate::services::test_support::harness;
    use chrono::NaiveDate;

    fn project(client_id: Uuid, name: &str) -> NewProject {
        NewProject {
            client_id,
            name: name.into(),
            project_code: "WH-01".into(),
            code: None,
            address: Address::default(),
            begin: None,
            end: None,
            notes: None,
            service_prices: vec![ServicePrice {
                service_name: "Labour".into(),
                unit_price: 35.0,
            }],
        }
    }

    async fn client(h: &crate::services::test_support::Harness, owner: Uuid) -> Uuid {
        h.services
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
            .id
    }

    #[tokio::test]
    async fn test_create_requires_owned_client() {
        let h = harness();
        let owner = Uuid::new_v4();
        let client_id = client(&h, owner).await;

        let err = h
            .services
            .projects
            .create(Uuid::new_v4(), project(client_id, "Warehouse"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound("Client")));

        let created = h
            .services
            .projects
            .create(owner, project(client_id, "Warehouse"))
            .await
            .unwrap();
        assert_eq!(created.service_prices.len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_name_per_client() {
        let h = harness();
        let projects = &h.services.projects;
        let owner = Uuid::new_v4();
        let client_id = client(&h, owner).await;

        projects.create(owner, project(client_id, "Warehouse")).await.unwrap();
        let err = projects
            .create(owner, project(client_id, "Warehouse"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_dates_must_be_ordered() {
        let h = harness();
        let projects = &h.services.projects;
        let owner = Uuid::new_v4();
        let client_id = client(&h, owner).await;

        let mut data = project(client_id, "Warehouse");
        data.begin = NaiveDate::from_ymd_opt(2025, 6, 1);
        data.end = NaiveDate::from_ymd_opt(2025, 5, 1);
        let err = projects.create(owner, data.clone()).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));

        data.end = NaiveDate::from_ymd_opt(2025, 7, 1);
        let created = projects.create(owner, data).await.unwrap();

        let err = projects
            .update(
                owner,
                created.id,
                UpdateProject {
                    end: Some(NaiveDate::from_ymd_opt(2025, 1, 1)),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidPayload(_)));
    }

    #[tokio::test]
    async fn test_archive_cycle() {
        let h = harness();
        let projects = &h.services.projects;
        let owner = Uuid::new_v4();
        let client_id = client(&h, owner).await;
        let created = projects.create(owner, project(client_id, "Warehouse")).await.unwrap();

        projects.archive(owner, created.id).await.unwrap();
        assert!(projects.list(owner).await.unwrap().is_empty());
        assert_eq!(projects.list_archived(owner).await.unwrap().len(), 1);

        projects.recover(owner, created.id).await.unwrap();
        assert_eq!(projects.list(owner).await.unwrap().len(), 1);

        assert!(projects.archive(Uuid::new_v4(), created.id).await.is_err());

        projects.delete(owner, created.id).await.unwrap();
        assert!(matches!(
            projects.get(owner, created.id).await.unwrap_err(),
            ServiceError::NotFound("Project")
        ));
    }
}
