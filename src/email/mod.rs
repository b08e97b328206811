/// Mail provider abstraction used by the ingestion pipeline
use chrono::NaiveDate;
use futures::future::BoxFuture;

use crate::error::FetchError;
use crate::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchMessagesParams {
    /// Only messages received after this date are listed
    pub after_date: NaiveDate,
}

/// A mailbox that can hand over its recent messages.
///
/// `Ok(None)` means nothing new was listed, as opposed to a batch that
/// listed messages but yielded none after parsing.
pub trait MailProvider: Send + Sync {
    fn fetch_messages<'a>(
        &'a self,
        params: &'a FetchMessagesParams,
    ) -> BoxFuture<'a, Result<Option<Vec<Message>>, FetchError>>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &str;
}
