//! Client management, always scoped to the calling owner

use std::sync::Arc;

use uuid::Uuid;

use super::{duplicate_on_conflict, in_use_on_reference};
use crate::error::{ServiceError, ServiceResult};
use crate::models::client::{Client, NewClient, UpdateClient};
use crate::store::{ClientStore, DeliveryNoteStore, NoteParent, ProjectStore};

#[derive(Clone)]
pub struct ClientService {
    pub(crate) clients: Arc<dyn ClientStore>,
    pub(crate) projects: Arc<dyn ProjectStore>,
    pub(crate) notes: Arc<dyn DeliveryNoteStore>,
}

fn duplicate_message(name: &str) -> String {
    format!("A client named '{}' already exists", name)
}

impl ClientService {
    /// Creates a client; the name must be unused by this owner
    pub async fn create(&self, owner_id: Uuid, data: NewClient) -> ServiceResult<Client> {
        if self.clients.find_by_name(owner_id, &data.name).await?.is_some() {
            return Err(ServiceError::Duplicate(duplicate_message(&data.name)));
        }

        let name = data.name.clone();
        let client = self
            .clients
            .create(owner_id, data)
            .await
            .map_err(|e| duplicate_on_conflict(e, || duplicate_message(&name)))?;

        tracing::info!(%owner_id, client_id = %client.id, "Client created");
        Ok(client)
    }

    pub async fn list(&self, owner_id: Uuid) -> ServiceResult<Vec<Client>> {
        Ok(self.clients.list(owner_id, false).await?)
    }

    pub async fn list_archived(&self, owner_id: Uuid) -> ServiceResult<Vec<Client>> {
        Ok(self.clients.list(owner_id, true).await?)
    }

    pub async fn get(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<Client> {
        self.clients
            .find(owner_id, id)
            .await?
            .ok_or(ServiceError::NotFound("Client"))
    }

    pub async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: UpdateClient,
    ) -> ServiceResult<Client> {
        if let Some(name) = &data.name {
            if let Some(existing) = self.clients.find_by_name(owner_id, name).await? {
                if existing.id != id {
                    return Err(ServiceError::Duplicate(duplicate_message(name)));
                }
            }
        }

        let name = data.name.clone().unwrap_or_default();
        self.clients
            .update(owner_id, id, data)
            .await
            .map_err(|e| duplicate_on_conflict(e, || duplicate_message(&name)))?
            .ok_or(ServiceError::NotFound("Client"))
    }

    pub async fn archive(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
        if !self.clients.archive(owner_id, id).await? {
            return Err(ServiceError::NotFound("Client"));
        }
        tracing::info!(%owner_id, client_id = %id, "Client archived");
        Ok(())
    }

    pub async fn recover(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
        if !self.clients.recover(owner_id, id).await? {
            return Err(ServiceError::NotFound("Client"));
        }
        tracing::info!(%owner_id, client_id = %id, "Client recovered");
        Ok(())
    }

    /// Hard delete
    ///
    /// Refused while any project or delivery note still points at the
    /// client; archiving is the way to retire those.
    pub async fn delete(&self, owner_id: Uuid, id: Uuid) -> ServiceResult<()> {
        let in_use = || "Client still has projects or delivery notes; archive it instead".to_string();

        if self.notes.any_for(owner_id, NoteParent::Client(id)).await?
            || self.projects.any_for_client(owner_id, id).await?
        {
            return Err(ServiceError::InUse(in_use()));
        }

        let purged = self
            .clients
            .purge(owner_id, id)
            .await
            .map_err(|e| in_use_on_reference(e, in_use))?;
        if !purged {
            return Err(ServiceError::NotFound("Client"));
        }
        tracing::info!(%owner_id, client_id = %id, "Client deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::address::Address;
    use crate::services::test_support::harness;

    fn acme() -> NewClient {
        NewClient {
            name: "Acme".into(),
            cif: "B12345678".into(),
            logo: None,
            address: Address::default(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_name_per_owner() {
        let h = harness();
        let clients = &h.services.clients;
        let owner = Uuid::new_v4();

        clients.create(owner, acme()).await.unwrap();
        let err = clients.create(owner, acme()).await.unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));

        // Another owner may reuse the name
        assert!(clients.create(Uuid::new_v4(), acme()).await.is_ok());
    }

    #[tokio::test]
    async fn test_archive_cycle() {
        let h = harness();
        let clients = &h.services.clients;
        let owner = Uuid::new_v4();
        let client = clients.create(owner, acme()).await.unwrap();

        clients.archive(owner, client.id).await.unwrap();
        assert!(clients.list(owner).await.unwrap().is_empty());
        assert_eq!(clients.list_archived(owner).await.unwrap().len(), 1);

        clients.recover(owner, client.id).await.unwrap();
        assert_eq!(clients.list(owner).await.unwrap().len(), 1);

        clients.delete(owner, client.id).await.unwrap();
        assert!(matches!(
            clients.get(owner, client.id).await.unwrap_err(),
            ServiceError::NotFound("Client")
        ));
    }

    #[tokio::test]
    async fn test_other_owners_see_nothing() {
        let h = harness();
        let clients = &h.services.clients;
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let client = clients.create(owner, acme()).await.unwrap();

        assert!(clients.get(stranger, client.id).await.is_err());
        assert!(clients.archive(stranger, client.id).await.is_err());
        assert!(clients.recover(stranger, client.id).await.is_err());
        assert!(clients.delete(stranger, client.id).await.is_err());
        assert!(clients
            .update(stranger, client.id, UpdateClient::default())
            .await
            .is_err());

        assert!(clients.get(owner, client.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_rename_onto_existing_name() {
        let h = harness();
        let clients = &h.services.clients;
        let owner = Uuid::new_v4();
        clients.create(owner, acme()).await.unwrap();
        let other = clients
            .create(
                owner,
                NewClient {
                    name: "Globex".into(),
                    ..acme()
                },
            )
            .await
            .unwrap();

        let err = clients
            .update(
                owner,
                other.id,
                UpdateClient {
                    name: Some("Acme".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Duplicate(_)));

        let renamed = clients
            .update(
                owner,
                other.id,
                UpdateClient {
                    name: Some("Globex Corp".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.name, "Globex Corp");
    }

    #[tokio::test]
    async fn test_delete_refused_while_projects_exist() {
        let h = harness();
        let owner = Uuid::new_v4();
        let client = h.services.clients.create(owner, acme()).await.unwrap();
        let project = h
            .services
            .projects
            .create(
                owner,
                crate::models::project::NewProject {
                    client_id: client.id,
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
            .unwrap();

        let err = h.services.clients.delete(owner, client.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::InUse(_)));
        assert!(h.services.clients.get(owner, client.id).await.is_ok());

        h.services.projects.delete(owner, project.id).await.unwrap();
        h.services.clients.delete(owner, client.id).await.unwrap();
    }
}
