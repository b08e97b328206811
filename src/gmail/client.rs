use anyhow::{Context, Result};
use futures::future::BoxFuture;
use google_gmail1::api::{Message as GmailMessage, MessagePart, Scope};
use google_gmail1::{oauth2, Gmail};
use log::{debug, info};

use crate::config::GoogleOAuthConfig;
use crate::error::FetchError;
use crate::http::{HttpsClient, HttpsConnector};
use super::parser::{RawBody, RawHeader, RawMessage, RawPart};

const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Stored credential of one mailbox owner
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub email: String,
    pub refresh_token: String,
}

/// One `users.messages.list` call
#[derive(Debug, Clone, Copy)]
pub struct ListRequest<'a> {
    pub query: &'a str,
    pub page_token: Option<&'a str>,
    pub max_results: u32,
}

/// One page of a listing. Entries may lack an id.
#[derive(Debug, Clone, Default)]
pub struct MessageListPage {
    pub message_ids: Vec<Option<String>>,
    pub next_page_token: Option<String>,
}

/// Transport operations the fetch service needs from the Gmail API
pub trait GmailApi: Send + Sync {
    fn list_messages<'a>(&'a self, request: ListRequest<'a>) -> BoxFuture<'a, Result<MessageListPage>>;

    fn get_message<'a>(&'a self, message_id: &'a str) -> BoxFuture<'a, Result<RawMessage>>;
}

pub struct GmailClient {
    hub: Gmail<HttpsConnector>,
    user_id: String,
}

impl GmailClient {
    /// Exchange the user's refresh token for an access token and build the hub.
    ///
    /// The token is requested once here so that bad credentials fail before
    /// any listing starts; the authenticator refreshes it afterwards.
    pub async fn connect(
        client: HttpsClient,
        oauth: &GoogleOAuthConfig,
        credentials: &UserCredentials,
    ) -> std::result::Result<Self, FetchError> {
        info!("Connecting to Gmail API for {}", credentials.email);

        Self::build(client, oauth, credentials)
            .await
            .map_err(|e| FetchError::Auth(format!("{:#}", e)))
    }

    async fn build(client: HttpsClient, oauth: &GoogleOAuthConfig, credentials: &UserCredentials) -> Result<Self> {
        let secret = oauth2::authorized_user::AuthorizedUserSecret {
            client_id: oauth.client_id.clone(),
            client_secret: oauth.client_secret.clone(),
            refresh_token: credentials.refresh_token.clone(),
            key_type: "authorized_user".to_string(),
        };

        let auth = oauth2::AuthorizedUserAuthenticator::builder(secret)
            .build()
            .await
            .context("Unable to create OAuth2 authenticator")?;

        auth.token(&[GMAIL_READONLY_SCOPE])
            .await
            .context("Unable to exchange refresh token")?;

        let hub = Gmail::new(client, auth);

        info!("✅ Gmail API connection established for {}", credentials.email);

        Ok(GmailClient {
            hub,
            user_id: credentials.email.clone(),
        })
    }
}

impl GmailApi for GmailClient {
    fn list_messages<'a>(&'a self, request: ListRequest<'a>) -> BoxFuture<'a, Result<MessageListPage>> {
        Box::pin(async move {
            debug!("Listing messages: q='{}', page_token={:?}", request.query, request.page_token);

            let mut call = self.hub
                .users()
                .messages_list(&self.user_id)
                .q(request.query)
                .max_results(request.max_results)
                .add_scope(Scope::Readonly);

            if let Some(token) = request.page_token {
                call = call.page_token(token);
            }

            let (_, response) = call.doit().await.context("Error listing messages")?;

            Ok(MessageListPage {
                message_ids: response
                    .messages
                    .unwrap_or_default()
                    .into_iter()
                    .map(|message| message.id)
                    .collect(),
                next_page_token: response.next_page_token,
            })
        })
    }

    fn get_message<'a>(&'a self, message_id: &'a str) -> BoxFuture<'a, Result<RawMessage>> {
        Box::pin(async move {
            debug!("Retrieving message {}", message_id);

            let (_, message) = self.hub
                .users()
                .messages_get(&self.user_id, message_id)
                .format("full")
                .add_scope(Scope::Readonly)
                .doit()
                .await
                .context("Unable to retrieve message")?;

            Ok(RawMessage::from(message))
        })
    }
}

// The hub has already decoded part bodies into bytes
impl From<GmailMessage> for RawMessage {
    fn from(message: GmailMessage) -> Self {
        RawMessage {
            id: message.id,
            internal_date: message.internal_date.map(|millis| millis.to_string()),
            snippet: message.snippet,
            payload: message.payload.map(RawPart::from),
        }
    }
}

impl From<MessagePart> for RawPart {
    fn from(part: MessagePart) -> Self {
        RawPart {
            mime_type: part.mime_type,
            headers: part
                .headers
                .unwrap_or_default()
                .into_iter()
                .map(|header| RawHeader {
                    name: header.name,
                    value: header.value,
                })
                .collect(),
            body: part.body.map(|body| RawBody { data: body.data }),
            parts: part
                .parts
                .map(|parts| parts.into_iter().map(RawPart::from).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use google_gmail1::api::{MessagePartBody, MessagePartHeader};
    use crate::gmail::parser::parse_message;

    #[test]
    fn test_hub_message_converts_to_raw_message() {
        let message = GmailMessage {
            id: Some("18c2f9".to_string()),
            internal_date: Some(1727740800000),
            snippet: Some("Thanks for applying".to_string()),
            payload: Some(MessagePart {
                mime_type: Some("multipart/alternative".to_string()),
                headers: Some(vec![MessagePartHeader {
                    name: Some("Subject".to_string()),
                    value: Some("Your application to Acme".to_string()),
                }]),
                parts: Some(vec![MessagePart {
                    mime_type: Some("text/plain".to_string()),
                    body: Some(MessagePartBody {
                        data: Some(b"We received your application.".to_vec()),
                        ..Default::default()
                    }),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        };

        let parsed = parse_message(RawMessage::from(message)).unwrap();
        assert_eq!(parsed.id, "18c2f9");
        assert_eq!(parsed.date.as_deref(), Some("1727740800000"));
        assert_eq!(parsed.subject.as_deref(), Some("Your application to Acme"));
        assert_eq!(parsed.body.as_deref(), Some("We received your application."));
    }
}
