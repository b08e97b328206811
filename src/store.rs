use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use log::{debug, info};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::role::{Company, Contact, ExtractedContact, ExtractedRole, Role, Status};

/// Persistence side of the pipeline.
///
/// `upsert_role` must be idempotent: the same extracted role saved twice
/// leaves one company, one contact per email and one role.
pub trait RoleStore: Send + Sync {
    fn upsert_role<'a>(
        &'a self,
        owner: &'a str,
        role: &'a ExtractedRole,
        created_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Role, StoreError>>;
}

#[derive(Debug, Clone)]
struct ContactRecord {
    id: Uuid,
    email: String,
    name: String,
    title: Option<String>,
    company_id: Uuid,
}

#[derive(Debug, Clone)]
struct RoleRecord {
    id: Uuid,
    owner: String,
    title: String,
    requisition_number: Option<String>,
    status: Status,
    last_status: Option<Status>,
    status_confidence: f64,
    company_id: Uuid,
    contact_ids: Vec<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct StoreState {
    companies: Vec<Company>,
    contacts: Vec<ContactRecord>,
    roles: Vec<RoleRecord>,
}

/// Process-local store implementing the upsert contract
#[derive(Debug, Default)]
pub struct MemoryRoleStore {
    state: Mutex<StoreState>,
}

impl MemoryRoleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Roles created by `owner`, newest first
    pub async fn roles_for(&self, owner: &str) -> Vec<Role> {
        let state = self.state.lock().await;
        let mut roles: Vec<Role> = state
            .roles
            .iter()
            .filter(|record| record.owner == owner)
            .filter_map(|record| state.materialize(record))
            .collect();
        roles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        roles
    }

    pub async fn companies(&self) -> Vec<Company> {
        self.state.lock().await.companies.clone()
    }

    pub async fn contacts(&self) -> Vec<Contact> {
        let state = self.state.lock().await;
        state
            .contacts
            .iter()
            .filter_map(|record| state.materialize_contact(record))
            .collect()
    }
}

impl StoreState {
    fn company(&self, id: Uuid) -> Option<&Company> {
        self.companies.iter().find(|company| company.id == id)
    }

    /// Resolve a company by name, recording a domain once it becomes known
    fn ensure_company(&mut self, name: &str, domain: Option<&str>) -> Uuid {
        if let Some(company) = self.companies.iter_mut().find(|company| company.name == name) {
            if let Some(domain) = domain {
                if company.domain.as_deref() != Some(domain) {
                    debug!("Company {} domain updated to {}", company.name, domain);
                    company.domain = Some(domain.to_string());
                }
            }
            return company.id;
        }

        let company = Company {
            id: Uuid::new_v4(),
            name: name.to_string(),
            domain: domain.map(str::to_string),
        };
        debug!("New company created: {}", company.name);
        let id = company.id;
        self.companies.push(company);
        id
    }

    /// Create or update a contact by email
    fn ensure_contact(&mut self, contact: &ExtractedContact, company_id: Uuid) -> Uuid {
        if let Some(record) = self.contacts.iter_mut().find(|record| record.email == contact.email) {
            record.name = contact.name.clone();
            if contact.title.is_some() {
                record.title = contact.title.clone();
            }
            return record.id;
        }

        let record = ContactRecord {
            id: Uuid::new_v4(),
            email: contact.email.clone(),
            name: contact.name.clone(),
            title: contact.title.clone(),
            company_id,
        };
        debug!("New contact created: {}", record.email);
        let id = record.id;
        self.contacts.push(record);
        id
    }

    /// Requisition number when known, else company and title
    fn find_role(&mut self, owner: &str, role: &ExtractedRole, company_id: Uuid) -> Option<&mut RoleRecord> {
        self.roles.iter_mut().find(|record| {
            record.owner == owner
                && match &role.requisition_number {
                    Some(requisition) => record.requisition_number.as_ref() == Some(requisition),
                    None => record.company_id == company_id && record.title == role.title,
                }
        })
    }

    fn materialize_contact(&self, record: &ContactRecord) -> Option<Contact> {
        Some(Contact {
            id: record.id,
            email: record.email.clone(),
            name: record.name.clone(),
            title: record.title.clone(),
            company: self.company(record.company_id)?.clone(),
        })
    }

    fn materialize(&self, record: &RoleRecord) -> Option<Role> {
        let contacts = record
            .contact_ids
            .iter()
            .filter_map(|id| self.contacts.iter().find(|contact| contact.id == *id))
            .filter_map(|contact| self.materialize_contact(contact))
            .collect();

        Some(Role {
            id: record.id,
            title: record.title.clone(),
            requisition_number: record.requisition_number.clone(),
            status: record.status,
            last_status: record.last_status,
            status_confidence: record.status_confidence,
            contacts,
            company: self.company(record.company_id)?.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            created_by_id: record.owner.clone(),
        })
    }

    fn upsert(&mut self, owner: &str, role: &ExtractedRole, created_at: DateTime<Utc>) -> Result<Role, StoreError> {
        if role.title.trim().is_empty() || role.company.name.trim().is_empty() {
            return Err(StoreError::InvalidRole {
                id: role.id.clone(),
                reason: "title and company name are required".to_string(),
            });
        }

        let company_id = self.ensure_company(&role.company.name, role.company.domain.as_deref());
        let contact_ids: Vec<Uuid> = role
            .contacts
            .iter()
            .map(|contact| self.ensure_contact(contact, company_id))
            .collect();
        let now = Utc::now();

        let record_id = match self.find_role(owner, role, company_id) {
            Some(record) => {
                if record.status != role.status {
                    info!("Role '{}' moved from {} to {}", record.title, record.status, role.status);
                    record.last_status = Some(record.status);
                    record.status = role.status;
                }
                if record.company_id != company_id {
                    info!("Role '{}' moved to company {}", record.title, role.company.name);
                    record.company_id = company_id;
                }
                record.status_confidence = role.status_confidence;
                record.title = role.title.clone();
                if role.requisition_number.is_some() {
                    record.requisition_number = role.requisition_number.clone();
                }
                for id in contact_ids {
                    if !record.contact_ids.contains(&id) {
                        record.contact_ids.push(id);
                    }
                }
                record.updated_at = now;
                record.id
            }
            None => {
                let mut unique_contacts = Vec::with_capacity(contact_ids.len());
                for id in contact_ids {
                    if !unique_contacts.contains(&id) {
                        unique_contacts.push(id);
                    }
                }

                let record = RoleRecord {
                    id: Uuid::new_v4(),
                    owner: owner.to_string(),
                    title: role.title.clone(),
                    requisition_number: role.requisition_number.clone(),
                    status: role.status,
                    last_status: None,
                    status_confidence: role.status_confidence,
                    company_id,
                    contact_ids: unique_contacts,
                    created_at,
                    updated_at: now,
                };
                info!("New role saved: '{}' ({})", record.title, record.status);
                let id = record.id;
                self.roles.push(record);
                id
            }
        };

        self.roles
            .iter()
            .find(|record| record.id == record_id)
            .and_then(|record| self.materialize(record))
            .ok_or_else(|| StoreError::InvalidRole {
                id: role.id.clone(),
                reason: "role could not be read back".to_string(),
            })
    }
}

impl RoleStore for MemoryRoleStore {
    fn upsert_role<'a>(
        &'a self,
        owner: &'a str,
        role: &'a ExtractedRole,
        created_at: DateTime<Utc>,
    ) -> BoxFuture<'a, Result<Role, StoreError>> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            state.upsert(owner, role, created_at)
        })
    }
}
