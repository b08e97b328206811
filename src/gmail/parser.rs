/// Raw Gmail message structures and their conversion into `Message`
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use log::debug;
use serde::{Deserialize, Deserializer};

use crate::error::ParseError;
use crate::message::{Message, Sender};

const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";

/// Gmail sends unpadded base64url, older payloads sometimes carry padding
const BASE64URL: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

const BASE64_STANDARD: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Message resource as returned by `users.messages.get` (format=full)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub internal_date: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub payload: Option<RawPart>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPart {
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub headers: Vec<RawHeader>,
    #[serde(default)]
    pub body: Option<RawBody>,
    /// Present (possibly empty) only on multipart payloads
    #[serde(default)]
    pub parts: Option<Vec<RawPart>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHeader {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBody {
    /// Decoded payload bytes
    #[serde(default, deserialize_with = "deserialize_base64url")]
    pub data: Option<Vec<u8>>,
}

impl RawPart {
    /// First header value whose name matches exactly
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|header| header.name.as_deref() == Some(name))
            .and_then(|header| header.value.as_deref())
    }

    fn body_data(&self) -> Option<&[u8]> {
        self.body.as_ref().and_then(|body| body.data.as_deref())
    }
}

pub fn decode_base64url(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let trimmed = encoded.trim();
    BASE64URL
        .decode(trimmed)
        .or_else(|_| BASE64_STANDARD.decode(trimmed))
}

fn deserialize_base64url<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
where
    D: Deserializer<'de>,
{
    let encoded: Option<String> = Option::deserialize(deserializer)?;
    encoded
        .map(|data| decode_base64url(&data).map_err(serde::de::Error::custom))
        .transpose()
}

/// Normalize a raw provider message.
///
/// Fails only when the message has no id. Absent headers become `None`.
pub fn parse_message(raw: RawMessage) -> Result<Message, ParseError> {
    let id = raw.id.ok_or(ParseError::MissingId)?;

    let payload = raw.payload.unwrap_or_default();
    let subject = payload.header("Subject").map(str::to_string);
    let sender = payload.header("From").map(|from| Sender::Raw(from.to_string()));
    let body = extract_body(&payload);

    debug!("Parsed message {} (body: {} bytes)", id, body.len());

    Ok(Message {
        id,
        date: raw.internal_date,
        snippet: raw.snippet,
        subject,
        sender,
        body: Some(body),
    })
}

/// Plain-text body of a payload.
///
/// Multipart payloads yield their first `text/plain` part (searched
/// depth-first), single-part payloads their own body, anything else "".
pub fn extract_body(payload: &RawPart) -> String {
    let data = match &payload.parts {
        Some(parts) => find_plain_text_part(parts).and_then(RawPart::body_data),
        None => payload.body_data(),
    };

    data.map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .unwrap_or_default()
}

fn find_plain_text_part(parts: &[RawPart]) -> Option<&RawPart> {
    for part in parts {
        if part.mime_type.as_deref() == Some(PLAIN_TEXT_MIME_TYPE) {
            return Some(part);
        }
        if let Some(found) = part.parts.as_deref().and_then(find_plain_text_part) {
            return Some(found);
        }
    }
    None
}
