use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ClassifyError, ModelError};
use crate::message::{ClassifiedMessage, Message, Sender};
use super::client::GenerativeModel;
use super::schema::{message_classifier_schema, MESSAGE_CLASSIFIER_PROMPT};

/// Metadata sent to the classifier; bodies never leave for this call
#[derive(Serialize)]
struct MessageSummary<'a> {
    id: &'a str,
    snippet: Option<&'a str>,
    subject: Option<&'a str>,
    sender: Option<&'a Sender>,
}

impl<'a> From<&'a Message> for MessageSummary<'a> {
    fn from(message: &'a Message) -> Self {
        MessageSummary {
            id: &message.id,
            snippet: message.snippet.as_deref(),
            subject: message.subject.as_deref(),
            sender: message.sender.as_ref(),
        }
    }
}

/// First stage: keep the messages that are job-application status updates
pub struct MessageClassifier {
    model: Arc<dyn GenerativeModel>,
}

impl MessageClassifier {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        MessageClassifier { model }
    }

    /// Messages judged related, in input order; `None` when there are none.
    ///
    /// A message the model leaves out of its answer counts as unrelated.
    pub async fn classify(&self, messages: &[Message]) -> Result<Option<Vec<Message>>, ClassifyError> {
        if messages.is_empty() {
            return Ok(None);
        }

        info!("Classifying {} message(s)", messages.len());

        let summaries: Vec<MessageSummary> = messages.iter().map(MessageSummary::from).collect();
        let payload = serde_json::to_string(&summaries).map_err(ModelError::Prompt)?;
        let prompt = format!("{}\n\n{}", MESSAGE_CLASSIFIER_PROMPT, payload);

        let schema = message_classifier_schema();
        let response = self.model.generate_content(&prompt, &schema).await?;

        let verdicts: Vec<ClassifiedMessage> =
            serde_json::from_str(&response).map_err(ClassifyError::MalformedResponse)?;

        let verdict_by_id: HashMap<&str, bool> = verdicts
            .iter()
            .map(|verdict| (verdict.id.as_str(), verdict.is_job_application_related))
            .collect();

        let omitted = messages
            .iter()
            .filter(|message| !verdict_by_id.contains_key(message.id.as_str()))
            .count();
        if omitted > 0 {
            warn!("Classifier omitted {} message(s), treating them as unrelated", omitted);
        }

        let related: Vec<Message> = messages
            .iter()
            .filter(|message| verdict_by_id.get(message.id.as_str()).copied().unwrap_or(false))
            .cloned()
            .collect();

        debug!("{} of {} message(s) are job-application related", related.len(), messages.len());

        if related.is_empty() {
            Ok(None)
        } else {
            Ok(Some(related))
        }
    }
}
