use anyhow::anyhow;
use chrono::NaiveDate;
use futures::future::BoxFuture;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use jobtrail::config::GmailConfig;
use jobtrail::email::{FetchMessagesParams, MailProvider};
use jobtrail::error::{FetchError, ParseError};
use jobtrail::gmail::parser::{RawBody, RawHeader, RawPart};
use jobtrail::gmail::{parse_message, GmailApi, GmailService, ListRequest, MessageListPage, RawMessage};

#[derive(Debug, Clone, PartialEq)]
struct ListCall {
    query: String,
    page_token: Option<String>,
    max_results: u32,
}

/// Programmable Gmail transport recording every call it receives
#[derive(Default)]
struct MockState {
    pages: HashMap<Option<String>, MessageListPage>,
    primary_probe: MessageListPage,
    messages: HashMap<String, RawMessage>,
    fail_listing: bool,
    failing_message: Option<String>,
    hang_on_get: bool,
    list_calls: Mutex<Vec<ListCall>>,
    get_calls: Mutex<Vec<(String, Instant)>>,
}

#[derive(Clone)]
struct MockGmail {
    state: Arc<MockState>,
}

impl MockGmail {
    fn new(state: MockState) -> Self {
        MockGmail {
            state: Arc::new(state),
        }
    }

    fn list_calls(&self) -> Vec<ListCall> {
        self.state.list_calls.lock().unwrap().clone()
    }

    fn get_calls(&self) -> Vec<(String, Instant)> {
        self.state.get_calls.lock().unwrap().clone()
    }
}

impl GmailApi for MockGmail {
    fn list_messages<'a>(&'a self, request: ListRequest<'a>) -> BoxFuture<'a, anyhow::Result<MessageListPage>> {
        Box::pin(async move {
            self.state.list_calls.lock().unwrap().push(ListCall {
                query: request.query.to_string(),
                page_token: request.page_token.map(str::to_string),
                max_results: request.max_results,
            });

            if self.state.fail_listing {
                return Err(anyhow!("403 Forbidden: insufficient authentication scopes"));
            }
            if request.query == "category:primary" {
                return Ok(self.state.primary_probe.clone());
            }

            let page_token = request.page_token.map(str::to_string);
            Ok(self.state.pages.get(&page_token).cloned().unwrap_or_default())
        })
    }

    fn get_message<'a>(&'a self, message_id: &'a str) -> BoxFuture<'a, anyhow::Result<RawMessage>> {
        Box::pin(async move {
            self.state
                .get_calls
                .lock()
                .unwrap()
                .push((message_id.to_string(), Instant::now()));

            if self.state.hang_on_get {
                futures::future::pending::<()>().await;
            }
            if self.state.failing_message.as_deref() == Some(message_id) {
                return Err(anyhow!("500 Backend Error"));
            }

            self.state
                .messages
                .get(message_id)
                .cloned()
                .ok_or_else(|| anyhow!("404 Not Found: {}", message_id))
        })
    }
}

fn raw_message(id: &str) -> RawMessage {
    RawMessage {
        id: Some(id.to_string()),
        internal_date: Some("1727870400000".to_string()),
        snippet: Some(format!("snippet of {}", id)),
        payload: Some(RawPart {
            mime_type: Some("text/plain".to_string()),
            headers: vec![RawHeader {
                name: Some("Subject".to_string()),
                value: Some(format!("Subject {}", id)),
            }],
            body: Some(RawBody {
                data: Some(format!("body of {}", id).into_bytes()),
            }),
            parts: None,
        }),
    }
}

fn page(ids: &[Option<&str>], next_page_token: Option<&str>) -> MessageListPage {
    MessageListPage {
        message_ids: ids.iter().map(|id| id.map(str::to_string)).collect(),
        next_page_token: next_page_token.map(str::to_string),
    }
}

fn mailbox(ids: &[&str]) -> HashMap<String, RawMessage> {
    ids.iter().map(|id| (id.to_string(), raw_message(id))).collect()
}

fn params() -> FetchMessagesParams {
    FetchMessagesParams {
        after_date: NaiveDate::from_ymd_opt(2024, 10, 1).unwrap(),
    }
}

fn sorted_ids(messages: &[jobtrail::message::Message]) -> Vec<String> {
    let mut ids: Vec<String> = messages.iter().map(|message| message.id.clone()).collect();
    ids.sort();
    ids
}

#[tokio::test]
async fn test_fetch_follows_pagination_and_collapses_duplicates() {
    let mut pages = HashMap::new();
    pages.insert(None, page(&[Some("a"), Some("b"), None], Some("page-2")));
    pages.insert(Some("page-2".to_string()), page(&[Some("b"), Some("c")], None));

    let api = MockGmail::new(MockState {
        pages,
        messages: mailbox(&["a", "b", "c"]),
        ..Default::default()
    });
    let service = GmailService::new(api.clone(), GmailConfig::default());

    let messages = service
        .fetch_messages(&params())
        .await
        .expect("Fetch should succeed")
        .expect("Messages should be returned");

    assert_eq!(sorted_ids(&messages), vec!["a", "b", "c"]);

    let list_calls = api.list_calls();
    assert_eq!(list_calls.len(), 2);
    assert_eq!(list_calls[0].query, "after:10/01/2024");
    assert_eq!(list_calls[0].page_token, None);
    assert_eq!(list_calls[0].max_results, 500);
    assert_eq!(list_calls[1].page_token.as_deref(), Some("page-2"));

    let fetched: HashSet<String> = api.get_calls().into_iter().map(|(id, _)| id).collect();
    assert_eq!(fetched.len(), 3, "Each id should be retrieved exactly once");
    assert_eq!(api.get_calls().len(), 3);

    println!("✅ {} messages fetched over {} pages", messages.len(), list_calls.len());
}

#[tokio::test]
async fn test_fetch_returns_none_when_nothing_is_listed() {
    let api = MockGmail::new(MockState::default());
    let service = GmailService::new(api.clone(), GmailConfig::default());

    let result = service.fetch_messages(&params()).await.expect("Fetch should succeed");

    assert!(result.is_none());
    assert!(api.get_calls().is_empty(), "No message should be retrieved");
}

#[tokio::test]
async fn test_fetch_returns_none_when_listed_entries_have_no_id() {
    let mut pages = HashMap::new();
    pages.insert(None, page(&[None, None], None));

    let api = MockGmail::new(MockState {
        pages,
        ..Default::default()
    });
    let service = GmailService::new(api.clone(), GmailConfig::default());

    let result = service.fetch_messages(&params()).await.expect("Fetch should succeed");
    assert!(result.is_none());
}

#[tokio::test]
async fn test_listing_failure_is_a_fetch_error() {
    let api = MockGmail::new(MockState {
        fail_listing: true,
        ..Default::default()
    });
    let service = GmailService::new(api, GmailConfig::default());

    let error = service
        .fetch_messages(&params())
        .await
        .expect_err("Listing failure should surface");

    assert!(matches!(error, FetchError::Listing(_)));
    assert!(error.to_string().starts_with("Error fetching messages"));
    assert!(error.to_string().contains("403"));
}

#[tokio::test]
async fn test_unparsable_message_is_dropped() {
    let mut pages = HashMap::new();
    pages.insert(None, page(&[Some("a"), Some("b")], None));

    let mut messages = mailbox(&["a"]);
    messages.insert("b".to_string(), RawMessage::default());

    let api = MockGmail::new(MockState {
        pages,
        messages,
        ..Default::default()
    });
    let service = GmailService::new(api, GmailConfig::default());

    let messages = service
        .fetch_messages(&params())
        .await
        .expect("Fetch should succeed")
        .expect("Messages should be returned");

    assert_eq!(sorted_ids(&messages), vec!["a"]);
}

#[tokio::test]
async fn test_failed_retrieval_fails_the_batch() {
    let mut pages = HashMap::new();
    pages.insert(None, page(&[Some("a"), Some("b"), Some("c")], None));

    let api = MockGmail::new(MockState {
        pages,
        messages: mailbox(&["a", "b", "c"]),
        failing_message: Some("b".to_string()),
        ..Default::default()
    });
    let service = GmailService::new(api, GmailConfig::default());

    match service.fetch_messages(&params()).await {
        Err(FetchError::Message { id, reason }) => {
            assert_eq!(id, "b");
            assert!(reason.contains("500"));
        }
        other => panic!("Expected a message error, got {:?}", other.map(|m| m.map(|m| m.len()))),
    }
}

#[tokio::test(start_paused = true)]
async fn test_retrievals_respect_the_rate_limit() {
    let ids: Vec<String> = (0..100).map(|i| format!("m{:03}", i)).collect();
    let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();

    let mut pages = HashMap::new();
    pages.insert(None, page(&id_refs.iter().copied().map(Some).collect::<Vec<_>>(), None));

    let api = MockGmail::new(MockState {
        pages,
        messages: mailbox(&id_refs),
        ..Default::default()
    });
    let config = GmailConfig {
        get_message_rate_limit: 25,
        rate_limit_window_ms: 1000,
        ..GmailConfig::default()
    };
    let service = GmailService::new(api.clone(), config);

    let start = Instant::now();
    let messages = service
        .fetch_messages(&params())
        .await
        .expect("Fetch should succeed")
        .expect("Messages should be returned");
    assert_eq!(messages.len(), 100);

    let mut instants: Vec<Instant> = api.get_calls().into_iter().map(|(_, at)| at).collect();
    instants.sort();
    assert_eq!(instants.len(), 100);

    for i in 0..(instants.len() - 25) {
        let spread = instants[i + 25] - instants[i];
        assert!(
            spread >= Duration::from_millis(1000),
            "26 calls within {:?} (from call {})",
            spread,
            i
        );
    }
    assert!(instants[99] - start >= Duration::from_millis(3000));

    println!("✅ 100 retrievals spread over {:?}", instants[99] - start);
}

#[tokio::test]
async fn test_primary_only_adds_category_when_user_has_categories() {
    let mut pages = HashMap::new();
    pages.insert(None, page(&[Some("a")], None));

    let api = MockGmail::new(MockState {
        pages,
        primary_probe: page(&[Some("a")], None),
        messages: mailbox(&["a"]),
        ..Default::default()
    });
    let config = GmailConfig {
        primary_only: true,
        ..GmailConfig::default()
    };
    let service = GmailService::new(api.clone(), config);

    service.fetch_messages(&params()).await.expect("Fetch should succeed");

    let list_calls = api.list_calls();
    assert_eq!(list_calls[0].query, "category:primary");
    assert_eq!(list_calls[0].max_results, 1);
    assert_eq!(list_calls[1].query, "after:10/01/2024 category:primary");
}

#[tokio::test]
async fn test_primary_only_keeps_plain_query_without_categories() {
    let api = MockGmail::new(MockState::default());
    let config = GmailConfig {
        primary_only: true,
        ..GmailConfig::default()
    };
    let service = GmailService::new(api.clone(), config);

    service.fetch_messages(&params()).await.expect("Fetch should succeed");

    let list_calls = api.list_calls();
    assert_eq!(list_calls.len(), 2);
    assert_eq!(list_calls[1].query, "after:10/01/2024");
}

#[tokio::test(start_paused = true)]
async fn test_hanging_retrieval_times_out() {
    let mut pages = HashMap::new();
    pages.insert(None, page(&[Some("a")], None));

    let api = MockGmail::new(MockState {
        pages,
        messages: mailbox(&["a"]),
        hang_on_get: true,
        ..Default::default()
    });
    let config = GmailConfig {
        request_timeout_secs: 30,
        ..GmailConfig::default()
    };
    let service = GmailService::new(api, config);

    match service.fetch_messages(&params()).await {
        Err(FetchError::Timeout { operation, seconds }) => {
            assert_eq!(operation, "get message");
            assert_eq!(seconds, 30);
        }
        other => panic!("Expected a timeout, got {:?}", other.map(|m| m.map(|m| m.len()))),
    }
}

#[test]
fn test_provider_name() {
    let service = GmailService::new(MockGmail::new(MockState::default()), GmailConfig::default());
    let provider: Arc<dyn MailProvider> = Arc::new(service);
    assert_eq!(provider.provider_name(), "Gmail");
}

#[test]
fn test_parse_multipart_fixture() {
    let content = fs::read_to_string("data_test/gmail_message.json")
        .expect("Failed to read test message file data_test/gmail_message.json");
    let raw: RawMessage = serde_json::from_str(&content).expect("Failed to deserialize message");

    let message = parse_message(raw).expect("Failed to parse message");

    assert_eq!(message.id, "18f2a1c3b4d5e6f7");
    assert_eq!(message.subject.as_deref(), Some("Your application to Acme"));
    assert_eq!(message.date.as_deref(), Some("1727870400000"));

    let sender = message.sender.as_ref().expect("Sender should be present");
    assert_eq!(sender.address().as_deref(), Some("jane.smith@acme.com"));
    assert_eq!(sender.domain().as_deref(), Some("acme.com"));

    let body = message.body.as_deref().expect("Body should be present");
    assert!(body.starts_with("Hi Alex,"));
    assert!(body.contains("Req #285343"));
    assert!(!body.contains("<p>"), "HTML alternative should not be used");

    let received = message.received_at().expect("Internal date should parse");
    assert_eq!(received.to_rfc3339(), "2024-10-02T12:00:00+00:00");

    println!("📧 Parsed '{}' from {}", message.subject.unwrap_or_default(), sender.address().unwrap_or_default());
}

#[test]
fn test_parse_single_part_fixture() {
    let content = fs::read_to_string("data_test/gmail_message_single_part.json")
        .expect("Failed to read test message file data_test/gmail_message_single_part.json");
    let raw: RawMessage = serde_json::from_str(&content).expect("Failed to deserialize message");

    let message = parse_message(raw).expect("Failed to parse message");

    assert_eq!(message.body.as_deref(), Some("Your verification code is 482913.\r\n"));
    assert_eq!(
        message.sender.and_then(|sender| sender.address()).as_deref(),
        Some("no-reply@accounts.example.com")
    );
}

#[test]
fn test_parse_rejects_message_without_id() {
    let mut raw = raw_message("a");
    raw.id = None;
    assert_eq!(parse_message(raw).unwrap_err(), ParseError::MissingId);
}
