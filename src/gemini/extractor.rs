use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ExtractError, ModelError};
use crate::message::{Message, Sender};
use crate::role::ExtractedRole;
use super::client::GenerativeModel;
use super::schema::{role_extractor_schema, ROLE_EXTRACTOR_PROMPT};

#[derive(Serialize)]
struct MessageContent<'a> {
    id: &'a str,
    snippet: Option<&'a str>,
    subject: Option<&'a str>,
    sender: Option<&'a Sender>,
    body: Option<&'a str>,
}

impl<'a> From<&'a Message> for MessageContent<'a> {
    fn from(message: &'a Message) -> Self {
        MessageContent {
            id: &message.id,
            snippet: message.snippet.as_deref(),
            subject: message.subject.as_deref(),
            sender: message.sender.as_ref(),
            body: message.body.as_deref(),
        }
    }
}

/// Second stage: structured role records from full message content
pub struct RoleExtractor {
    model: Arc<dyn GenerativeModel>,
}

impl RoleExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        RoleExtractor { model }
    }

    pub async fn extract_roles(&self, messages: &[Message]) -> Result<Vec<ExtractedRole>, ExtractError> {
        if messages.is_empty() {
            return Ok(Vec::new());
        }

        info!("Extracting roles from {} message(s)", messages.len());

        let contents: Vec<MessageContent> = messages.iter().map(MessageContent::from).collect();
        let payload = serde_json::to_string(&contents).map_err(ModelError::Prompt)?;
        let prompt = format!("{}\n\n{}", ROLE_EXTRACTOR_PROMPT, payload);

        let schema = role_extractor_schema();
        let response = self.model.generate_content(&prompt, &schema).await?;

        let roles: Vec<ExtractedRole> =
            serde_json::from_str(&response).map_err(ExtractError::MalformedResponse)?;

        let roles = roles
            .into_iter()
            .map(normalize_role)
            .collect::<Result<Vec<_>, _>>()?;

        for role in &roles {
            debug!(
                "Extracted role from {}: '{}' at {} ({}, confidence {:.2})",
                role.id, role.title, role.company.name, role.status, role.status_confidence
            );
        }

        info!("✅ Extracted {} role(s)", roles.len());
        Ok(roles)
    }
}

/// Validate one record and turn empty optional strings into `None`
fn normalize_role(mut role: ExtractedRole) -> Result<ExtractedRole, ExtractError> {
    let invalid = |reason: &str| ExtractError::InvalidRecord {
        id: role.id.clone(),
        reason: reason.to_string(),
    };

    role.title = role.title.trim().to_string();
    if role.title.is_empty() {
        return Err(invalid("empty title"));
    }

    role.company.name = role.company.name.trim().to_string();
    if role.company.name.is_empty() {
        return Err(invalid("empty company name"));
    }

    if !(0.0..=1.0).contains(&role.status_confidence) {
        return Err(invalid(&format!(
            "statusConfidence {} outside [0, 1]",
            role.status_confidence
        )));
    }

    role.requisition_number = non_empty(role.requisition_number.take());
    role.company.domain = non_empty(role.company.domain.take()).map(|domain| domain.to_lowercase());

    let listed = role.contacts.len();
    role.contacts.retain(|contact| !contact.email.trim().is_empty());
    if role.contacts.len() < listed {
        warn!("Dropped {} contact(s) without an email for message {}", listed - role.contacts.len(), role.id);
    }
    for contact in &mut role.contacts {
        contact.email = contact.email.trim().to_lowercase();
        contact.name = contact.name.trim().to_string();
        contact.title = non_empty(contact.title.take());
    }

    Ok(role)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
