use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use crate::config::GmailConfig;
use crate::email::{FetchMessagesParams, MailProvider};
use crate::error::FetchError;
use crate::message::Message;
use super::client::{GmailApi, ListRequest};
use super::parser::parse_message;
use super::rate_limiter::SlidingWindowRateLimiter;

/// Date layout of the `after:` search operator
pub const GMAIL_QUERY_DATE_FORMAT: &str = "%m/%d/%Y";

const PRIMARY_CATEGORY_QUERY: &str = "category:primary";

/// Bulk fetch of one user's mailbox over a Gmail transport
pub struct GmailService<A> {
    api: A,
    config: GmailConfig,
    rate_limiter: Arc<SlidingWindowRateLimiter>,
}

impl<A: GmailApi> GmailService<A> {
    pub fn new(api: A, config: GmailConfig) -> Self {
        let rate_limiter = Arc::new(SlidingWindowRateLimiter::new(
            config.get_message_rate_limit,
            config.rate_limit_window(),
        ));

        GmailService {
            api,
            config,
            rate_limiter,
        }
    }

    /// Share a limiter with other services fetching for the same user
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<SlidingWindowRateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub async fn fetch(&self, params: &FetchMessagesParams) -> Result<Option<Vec<Message>>, FetchError> {
        let query = self.build_query(params).await?;
        info!("Searching messages: {}", query);

        let message_ids = self.list_message_ids(&query).await?;

        if message_ids.is_empty() {
            info!("No new messages since {}", params.after_date);
            return Ok(None);
        }

        info!("Found {} message(s), retrieving bodies", message_ids.len());

        let messages = self.get_messages(message_ids).await?;

        info!("✅ Retrieved {} message(s)", messages.len());
        Ok(Some(messages))
    }

    async fn build_query(&self, params: &FetchMessagesParams) -> Result<String, FetchError> {
        let mut query = format!("after:{}", params.after_date.format(GMAIL_QUERY_DATE_FORMAT));

        if self.config.primary_only && self.has_inbox_categories().await? {
            query.push(' ');
            query.push_str(PRIMARY_CATEGORY_QUERY);
        }

        Ok(query)
    }

    /// Inbox categories are not exposed by the API; probe for a primary message
    async fn has_inbox_categories(&self) -> Result<bool, FetchError> {
        let request = ListRequest {
            query: PRIMARY_CATEGORY_QUERY,
            page_token: None,
            max_results: 1,
        };

        let page = self
            .timed("inbox category probe", self.api.list_messages(request), |e| {
                FetchError::Listing(format!("Could not fetch inbox categories: {:#}", e))
            })
            .await?;

        let has_categories = !page.message_ids.is_empty();
        debug!("User has inbox categories: {}", has_categories);
        Ok(has_categories)
    }

    /// Follow the continuation cursor until the provider returns none
    async fn list_message_ids(&self, query: &str) -> Result<Vec<String>, FetchError> {
        let mut message_ids = Vec::new();
        let mut seen = HashSet::new();
        let mut page_token: Option<String> = None;
        let mut pages = 0usize;
        let mut missing_ids = 0usize;

        loop {
            let request = ListRequest {
                query,
                page_token: page_token.as_deref(),
                max_results: self.config.page_size(),
            };

            let page = self
                .timed("list messages", self.api.list_messages(request), |e| {
                    FetchError::Listing(format!("{:#}", e))
                })
                .await?;
            pages += 1;

            for id in page.message_ids {
                match id {
                    Some(id) => {
                        if seen.insert(id.clone()) {
                            message_ids.push(id);
                        }
                    }
                    None => missing_ids += 1,
                }
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        if missing_ids > 0 {
            warn!("Discarded {} listed message(s) without an id", missing_ids);
        }
        debug!("Listing complete: {} id(s) over {} page(s)", message_ids.len(), pages);

        Ok(message_ids)
    }

    /// Retrieve and parse every message under the shared rate limiter.
    ///
    /// A message that fails to parse is dropped; a failed retrieval fails
    /// the batch.
    async fn get_messages(&self, message_ids: Vec<String>) -> Result<Vec<Message>, FetchError> {
        let rate_limiter = &self.rate_limiter;

        let parsed: Vec<Option<Message>> = stream::iter(message_ids)
            .map(|message_id| async move {
                rate_limiter.acquire().await;

                let raw = self
                    .timed("get message", self.api.get_message(&message_id), |e| {
                        FetchError::Message {
                            id: message_id.clone(),
                            reason: format!("{:#}", e),
                        }
                    })
                    .await?;

                match parse_message(raw) {
                    Ok(message) => Ok::<_, FetchError>(Some(message)),
                    Err(e) => {
                        warn!("Skipping message {}: {}", message_id, e);
                        Ok(None)
                    }
                }
            })
            .buffer_unordered(rate_limiter.limit())
            .try_collect()
            .await?;

        Ok(parsed.into_iter().flatten().collect())
    }

    async fn timed<T, F>(
        &self,
        operation: &str,
        future: F,
        on_error: impl FnOnce(anyhow::Error) -> FetchError,
    ) -> Result<T, FetchError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.config.request_timeout(), future).await {
            Ok(result) => result.map_err(on_error),
            Err(_) => Err(FetchError::Timeout {
                operation: operation.to_string(),
                seconds: self.config.request_timeout_secs,
            }),
        }
    }
}

impl<A: GmailApi> MailProvider for GmailService<A> {
    fn fetch_messages<'a>(
        &'a self,
        params: &'a FetchMessagesParams,
    ) -> BoxFuture<'a, Result<Option<Vec<Message>>, FetchError>> {
        Box::pin(self.fetch(params))
    }

    fn provider_name(&self) -> &str {
        "Gmail"
    }
}
