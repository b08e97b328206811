/// Normalized mail message shared by every pipeline stage
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message as produced by the parser. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Provider receive time, epoch milliseconds as a decimal string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<Sender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Message {
    /// Convert the provider receive time into a timestamp
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        self.date
            .as_deref()
            .and_then(|millis| millis.trim().parse::<i64>().ok())
            .and_then(DateTime::from_timestamp_millis)
    }
}

/// Sender of a message.
///
/// The parser keeps the raw `From` header; other producers may hand over an
/// already split name/address pair. Both shapes round-trip through serde.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sender {
    Raw(String),
    Structured {
        #[serde(default)]
        name: Option<String>,
        address: String,
    },
}

impl Sender {
    /// Display name, if one can be determined
    pub fn name(&self) -> Option<String> {
        match self {
            Sender::Raw(raw) => parse_from_header(raw).and_then(|(name, _)| name),
            Sender::Structured { name, .. } => name.clone(),
        }
    }

    /// Mail address, if one can be determined
    pub fn address(&self) -> Option<String> {
        match self {
            Sender::Raw(raw) => parse_from_header(raw).and_then(|(_, address)| address),
            Sender::Structured { address, .. } => Some(address.clone()),
        }
    }

    /// Domain part of the address
    pub fn domain(&self) -> Option<String> {
        self.address()
            .and_then(|address| address.rsplit_once('@').map(|(_, domain)| domain.to_lowercase()))
    }
}

impl From<String> for Sender {
    fn from(raw: String) -> Self {
        Sender::Raw(raw)
    }
}

/// Split a raw `From` header value with the RFC 5322 address parser
fn parse_from_header(raw: &str) -> Option<(Option<String>, Option<String>)> {
    let header_block = format!("From: {}\r\n\r\n", raw.trim());
    let parsed = mail_parser::MessageParser::default().parse(header_block.as_bytes())?;
    let addr = parsed.from().and_then(|addrs| addrs.first())?;

    Some((
        addr.name.as_ref().map(|name| name.to_string()),
        addr.address.as_ref().map(|address| address.to_string()),
    ))
}

/// Classifier verdict for one message, correlated back by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedMessage {
    pub id: String,
    pub is_job_application_related: bool,
}
