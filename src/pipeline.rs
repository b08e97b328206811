use chrono::{DateTime, Utc};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::Arc;

use crate::email::{FetchMessagesParams, MailProvider};
use crate::error::PipelineError;
use crate::gemini::{MessageClassifier, RoleExtractor};
use crate::role::Role;
use crate::store::RoleStore;

/// Outcome of one ingestion run
#[derive(Debug, Default)]
pub struct PipelineReport {
    /// Messages returned by the provider
    pub fetched: usize,
    /// Messages the classifier kept
    pub classified: usize,
    /// Roles persisted, in extraction order
    pub roles: Vec<Role>,
}

/// Fetch, classify, extract, persist.
///
/// Each stage runs only on what the previous one produced. An empty stage
/// result ends the run with what was counted so far; a stage error ends
/// it with that error.
pub struct IngestionPipeline {
    provider: Arc<dyn MailProvider>,
    classifier: MessageClassifier,
    extractor: RoleExtractor,
    store: Arc<dyn RoleStore>,
    dry_run: bool,
}

impl IngestionPipeline {
    pub fn new(
        provider: Arc<dyn MailProvider>,
        classifier: MessageClassifier,
        extractor: RoleExtractor,
        store: Arc<dyn RoleStore>,
    ) -> Self {
        info!("Initializing ingestion pipeline for {}", provider.provider_name());
        IngestionPipeline {
            provider,
            classifier,
            extractor,
            store,
            dry_run: false,
        }
    }

    /// Stop after classification: no extraction call, nothing persisted
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub async fn run(&self, owner: &str, params: &FetchMessagesParams) -> Result<PipelineReport, PipelineError> {
        let mut report = PipelineReport::default();

        // 1. Fetch
        let messages = match self.provider.fetch_messages(params).await? {
            Some(messages) => messages,
            None => {
                info!("No messages from {} after {}", self.provider.provider_name(), params.after_date);
                return Ok(report);
            }
        };
        report.fetched = messages.len();

        // 2. Classify
        let related = match self.classifier.classify(&messages).await? {
            Some(related) => related,
            None => {
                info!("None of the {} message(s) relate to a job application", report.fetched);
                return Ok(report);
            }
        };
        report.classified = related.len();

        if self.dry_run {
            info!("🧪 Dry-run: {} related message(s), skipping extraction", report.classified);
            return Ok(report);
        }

        // 3. Extract
        let extracted = self.extractor.extract_roles(&related).await?;
        if extracted.is_empty() {
            warn!("No role extracted from {} related message(s)", report.classified);
            return Ok(report);
        }

        // 4. Persist
        let received: HashMap<&str, Option<DateTime<Utc>>> = related
            .iter()
            .map(|message| (message.id.as_str(), message.received_at()))
            .collect();

        for role in &extracted {
            let created_at = received
                .get(role.id.as_str())
                .copied()
                .flatten()
                .unwrap_or_else(Utc::now);
            let saved = self.store.upsert_role(owner, role, created_at).await?;
            report.roles.push(saved);
        }

        info!(
            "✅ Run finished: {} fetched, {} related, {} role(s) saved",
            report.fetched,
            report.classified,
            report.roles.len()
        );
        Ok(report)
    }
}
