//! In-memory stores
//!
//! Behave like the Postgres stores, unique constraints and conditional
//! writes included, without a database. Used by the test suites and by
//! local runs without `DATABASE_URL`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    ClientStore, CompanyStore, DeliveryNoteStore, NoteParent, OwnedArchive, ProjectStore,
    StoreError, StoreResult, UserStore,
};
use crate::models::client::{Client, NewClient, UpdateClient};
use crate::models::company::{Company, CompanyData};
use crate::models::delivery_note::{DeliveryNote, NewDeliveryNote};
use crate::models::project::{NewProject, Project, UpdateProject};
use crate::models::user::{NewUser, UpdateUser, User};
use crate::verification::VerificationState;

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, data: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == data.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            name: data.name,
            surnames: data.surnames,
            nif: data.nif,
            logo: None,
            address: Default::default(),
            is_freelancer: false,
            company_id: data.company_id,
            role: data.role,
            verified: false,
            active: true,
            verification: VerificationState::default(),
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn update(&self, id: Uuid, data: UpdateUser) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(hash) = data.password_hash {
            user.password_hash = Some(hash);
        }
        if let Some(name) = data.name {
            user.name = name;
        }
        if let Some(surnames) = data.surnames {
            user.surnames = surnames;
        }
        if let Some(nif) = data.nif {
            user.nif = nif;
        }
        if let Some(logo) = data.logo {
            user.logo = logo;
        }
        if let Some(address) = data.address {
            user.address = address;
        }
        if let Some(is_freelancer) = data.is_freelancer {
            user.is_freelancer = is_freelancer;
        }
        if let Some(company_id) = data.company_id {
            user.company_id = company_id;
        }
        if let Some(role) = data.role {
            user.role = role;
        }
        if let Some(verified) = data.verified {
            user.verified = verified;
        }
        if let Some(active) = data.active {
            user.active = active;
        }
        if let Some(verification) = data.verification {
            user.verification = verification;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn count_company_members(&self, company_id: Uuid, excluding: Uuid) -> StoreResult<i64> {
        let count = self
            .users
            .read()
            .await
            .values()
            .filter(|u| u.company_id == Some(company_id) && u.id != excluding)
            .count();

        Ok(count as i64)
    }
}

#[derive(Debug, Default)]
pub struct MemoryCompanyStore {
    companies: RwLock<HashMap<Uuid, Company>>,
}

impl MemoryCompanyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CompanyStore for MemoryCompanyStore {
    async fn upsert_for_owner(&self, owner_id: Uuid, data: CompanyData) -> StoreResult<Company> {
        let mut companies = self.companies.write().await;
        let now = Utc::now();

        if let Some(existing) = companies.values_mut().find(|c| c.owner_id == owner_id) {
            existing.name = data.name;
            existing.cif = data.cif;
            existing.address = data.address;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let company = Company {
            id: Uuid::new_v4(),
            owner_id,
            name: data.name,
            cif: data.cif,
            address: data.address,
            created_at: now,
            updated_at: now,
        };
        companies.insert(company.id, company.clone());

        Ok(company)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Company>> {
        Ok(self.companies.read().await.get(&id).cloned())
    }

    async fn find_by_owner(&self, owner_id: Uuid) -> StoreResult<Option<Company>> {
        Ok(self
            .companies
            .read()
            .await
            .values()
            .find(|c| c.owner_id == owner_id)
            .cloned())
    }
}

/// Shared archive/recover/purge over an owner-scoped map
trait Owned {
    fn owner_id(&self) -> Uuid;
    fn set_archived(&mut self, archived: bool);
}

impl Owned for Client {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
        self.updated_at = Utc::now();
    }
}

impl Owned for Project {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    fn set_archived(&mut self, archived: bool) {
        self.archived = archived;
        self.updated_at = Utc::now();
    }
}

async fn set_archived<T: Owned>(
    map: &RwLock<HashMap<Uuid, T>>,
    owner_id: Uuid,
    id: Uuid,
    archived: bool,
) -> bool {
    match map.write().await.get_mut(&id) {
        Some(item) if item.owner_id() == owner_id => {
            item.set_archived(archived);
            true
        }
        _ => false,
    }
}

async fn purge<T: Owned>(map: &RwLock<HashMap<Uuid, T>>, owner_id: Uuid, id: Uuid) -> bool {
    let mut items = map.write().await;
    match items.get(&id) {
        Some(item) if item.owner_id() == owner_id => items.remove(&id).is_some(),
        _ => false,
    }
}

#[derive(Debug, Default)]
pub struct MemoryClientStore {
    clients: RwLock<HashMap<Uuid, Client>>,
}

impl MemoryClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OwnedArchive for MemoryClientStore {
    async fn archive(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(set_archived(&self.clients, owner_id, id, true).await)
    }

    async fn recover(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(set_archived(&self.clients, owner_id, id, false).await)
    }

    async fn purge(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(purge(&self.clients, owner_id, id).await)
    }
}

#[async_trait]
impl ClientStore for MemoryClientStore {
    async fn create(&self, owner_id: Uuid, data: NewClient) -> StoreResult<Client> {
        let mut clients = self.clients.write().await;

        if clients
            .values()
            .any(|c| c.owner_id == owner_id && c.name == data.name)
        {
            return Err(StoreError::Conflict("clients_owner_id_name_key".to_string()));
        }

        let now = Utc::now();
        let client = Client {
            id: Uuid::new_v4(),
            owner_id,
            name: data.name,
            cif: data.cif,
            logo: data.logo,
            address: data.address,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        clients.insert(client.id, client.clone());

        Ok(client)
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<Client>> {
        Ok(self
            .clients
            .read()
            .await
            .get(&id)
            .filter(|c| c.owner_id == owner_id)
            .cloned())
    }

    async fn find_by_name(&self, owner_id: Uuid, name: &str) -> StoreResult<Option<Client>> {
        Ok(self
            .clients
            .read()
            .await
            .values()
            .find(|c| c.owner_id == owner_id && c.name == name)
            .cloned())
    }

    async fn list(&self, owner_id: Uuid, archived: bool) -> StoreResult<Vec<Client>> {
        let mut clients: Vec<Client> = self
            .clients
            .read()
            .await
            .values()
            .filter(|c| c.owner_id == owner_id && c.archived == archived)
            .cloned()
            .collect();
        clients.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(clients)
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: UpdateClient,
    ) -> StoreResult<Option<Client>> {
        let mut clients = self.clients.write().await;

        if let Some(name) = &data.name {
            if clients
                .values()
                .any(|c| c.owner_id == owner_id && c.id != id && &c.name == name)
            {
                return Err(StoreError::Conflict("clients_owner_id_name_key".to_string()));
            }
        }

        let Some(client) = clients.get_mut(&id).filter(|c| c.owner_id == owner_id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            client.name = name;
        }
        if let Some(cif) = data.cif {
            client.cif = cif;
        }
        if let Some(logo) = data.logo {
            client.logo = logo;
        }
        if let Some(address) = data.address {
            client.address = address;
        }
        client.updated_at = Utc::now();

        Ok(Some(client.clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<Uuid, Project>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OwnedArchive for MemoryProjectStore {
    async fn archive(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(set_archived(&self.projects, owner_id, id, true).await)
    }

    async fn recover(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(set_archived(&self.projects, owner_id, id, false).await)
    }

    async fn purge(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        Ok(purge(&self.projects, owner_id, id).await)
    }
}

#[async_trait]
impl ProjectStore for MemoryProjectStore {
    async fn create(&self, owner_id: Uuid, data: NewProject) -> StoreResult<Project> {
        let mut projects = self.projects.write().await;

        if projects.values().any(|p| {
            p.owner_id == owner_id && p.client_id == data.client_id && p.name == data.name
        }) {
            return Err(StoreError::Conflict(
                "projects_owner_id_client_id_name_key".to_string(),
            ));
        }

        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            owner_id,
            client_id: data.client_id,
            name: data.name,
            project_code: data.project_code,
            code: data.code,
            address: data.address,
            begin: data.begin,
            end: data.end,
            notes: data.notes,
            service_prices: data.service_prices,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        projects.insert(project.id, project.clone());

        Ok(project)
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .get(&id)
            .filter(|p| p.owner_id == owner_id)
            .cloned())
    }

    async fn find_by_name(
        &self,
        owner_id: Uuid,
        client_id: Uuid,
        name: &str,
    ) -> StoreResult<Option<Project>> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .find(|p| p.owner_id == owner_id && p.client_id == client_id && p.name == name)
            .cloned())
    }

    async fn list(&self, owner_id: Uuid, archived: bool) -> StoreResult<Vec<Project>> {
        let mut projects: Vec<Project> = self
            .projects
            .read()
            .await
            .values()
            .filter(|p| p.owner_id == owner_id && p.archived == archived)
            .cloned()
            .collect();
        projects.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(projects)
    }

    async fn any_for_client(&self, owner_id: Uuid, client_id: Uuid) -> StoreResult<bool> {
        Ok(self
            .projects
            .read()
            .await
            .values()
            .any(|p| p.owner_id == owner_id && p.client_id == client_id))
    }

    async fn update(
        &self,
        owner_id: Uuid,
        id: Uuid,
        data: UpdateProject,
    ) -> StoreResult<Option<Project>> {
        let mut projects = self.projects.write().await;

        let Some(current) = projects.get(&id).filter(|p| p.owner_id == owner_id) else {
            return Ok(None);
        };
        if let Some(name) = &data.name {
            let client_id = current.client_id;
            if projects.values().any(|p| {
                p.owner_id == owner_id && p.client_id == client_id && p.id != id && &p.name == name
            }) {
                return Err(StoreError::Conflict(
                    "projects_owner_id_client_id_name_key".to_string(),
                ));
            }
        }

        let Some(project) = projects.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(name) = data.name {
            project.name = name;
        }
        if let Some(project_code) = data.project_code {
            project.project_code = project_code;
        }
        if let Some(code) = data.code {
            project.code = code;
        }
        if let Some(address) = data.address {
            project.address = address;
        }
        if let Some(begin) = data.begin {
            project.begin = begin;
        }
        if let Some(end) = data.end {
            project.end = end;
        }
        if let Some(notes) = data.notes {
            project.notes = notes;
        }
        if let Some(service_prices) = data.service_prices {
            project.service_prices = service_prices;
        }
        project.updated_at = Utc::now();

        Ok(Some(project.clone()))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDeliveryNoteStore {
    notes: RwLock<HashMap<Uuid, DeliveryNote>>,
}

impl MemoryDeliveryNoteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeliveryNoteStore for MemoryDeliveryNoteStore {
    async fn create(&self, owner_id: Uuid, data: NewDeliveryNote) -> StoreResult<DeliveryNote> {
        let now = Utc::now();
        let note = DeliveryNote {
            id: Uuid::new_v4(),
            owner_id,
            client_id: data.client_id,
            project_id: data.project_id,
            format: data.format,
            description: data.description,
            workers: data.workers,
            materials: data.materials,
            date: data.date,
            sign: String::new(),
            pending: true,
            pdf_url: String::new(),
            created_at: now,
            updated_at: now,
        };
        self.notes.write().await.insert(note.id, note.clone());

        Ok(note)
    }

    async fn find(&self, owner_id: Uuid, id: Uuid) -> StoreResult<Option<DeliveryNote>> {
        Ok(self
            .notes
            .read()
            .await
            .get(&id)
            .filter(|n| n.owner_id == owner_id)
            .cloned())
    }

    async fn list(&self, owner_id: Uuid) -> StoreResult<Vec<DeliveryNote>> {
        let mut notes: Vec<DeliveryNote> = self
            .notes
            .read()
            .await
            .values()
            .filter(|n| n.owner_id == owner_id)
            .cloned()
            .collect();
        notes.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(notes)
    }

    async fn mark_signed(
        &self,
        owner_id: Uuid,
        id: Uuid,
        sign_url: &str,
    ) -> StoreResult<Option<DeliveryNote>> {
        let mut notes = self.notes.write().await;
        match notes.get_mut(&id) {
            Some(note) if note.owner_id == owner_id && note.sign.is_empty() => {
                note.sign = sign_url.to_string();
                note.pending = false;
                note.pdf_url.clear();
                note.updated_at = Utc::now();
                Ok(Some(note.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn set_pdf_url(
        &self,
        owner_id: Uuid,
        id: Uuid,
        expected_sign: &str,
        pdf_url: &str,
    ) -> StoreResult<Option<DeliveryNote>> {
        let mut notes = self.notes.write().await;
        match notes.get_mut(&id) {
            Some(note) if note.owner_id == owner_id && note.sign == expected_sign => {
                note.pdf_url = pdf_url.to_string();
                note.updated_at = Utc::now();
                Ok(Some(note.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_unsigned(&self, owner_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut notes = self.notes.write().await;
        match notes.get(&id) {
            Some(note) if note.owner_id == owner_id && note.sign.is_empty() => {
                Ok(notes.remove(&id).is_some())
            }
            _ => Ok(false),
        }
    }

    async fn any_for(&self, owner_id: Uuid, parent: NoteParent) -> StoreResult<bool> {
        Ok(self.notes.read().await.values().any(|n| {
            n.owner_id == owner_id
                && match parent {
                    NoteParent::Client(id) => n.client_id == id,
                    NoteParent::Project(id) => n.project_id == id,
                }
        }))
    }
}
