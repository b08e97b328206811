use futures::future::BoxFuture;
use google_gmail1::hyper;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::GeminiConfig;
use crate::error::ModelError;
use crate::http::HttpsClient;

/// A generative model that answers a prompt with JSON conforming to a schema
pub trait GenerativeModel: Send + Sync {
    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
        response_schema: &'a Value,
    ) -> BoxFuture<'a, Result<String, ModelError>>;
}

/// Gemini `generateContent` over the REST API
pub struct GeminiModel {
    client: HttpsClient,
    config: GeminiConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig<'a>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_mime_type: &'static str,
    response_schema: &'a Value,
}

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, parts concatenated
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect();

        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

impl GeminiModel {
    pub fn new(client: HttpsClient, config: GeminiConfig) -> Self {
        info!("Gemini model configured: {}", config.model);
        GeminiModel { client, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn generate(&self, prompt: &str, response_schema: &Value) -> Result<String, ModelError> {
        let request_body = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema,
            },
        };
        let body = serde_json::to_vec(&request_body).map_err(ModelError::Prompt)?;

        debug!("Calling {} (prompt: {} bytes)", self.config.model, prompt.len());

        let request = hyper::Request::builder()
            .method(hyper::Method::POST)
            .uri(self.endpoint())
            .header(hyper::header::CONTENT_TYPE, "application/json")
            .header("x-goog-api-key", &self.config.api_key)
            .body(hyper::Body::from(body))
            .map_err(|e| ModelError::Request(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body())
            .await
            .map_err(|e| ModelError::Request(e.to_string()))?;

        if !status.is_success() {
            return Err(ModelError::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        let envelope: GenerateContentResponse = serde_json::from_slice(&bytes)?;
        let text = envelope.text().ok_or(ModelError::EmptyResponse)?;

        debug!("Model answered with {} bytes", text.len());
        Ok(text)
    }
}

impl GenerativeModel for GeminiModel {
    fn generate_content<'a>(
        &'a self,
        prompt: &'a str,
        response_schema: &'a Value,
    ) -> BoxFuture<'a, Result<String, ModelError>> {
        Box::pin(async move {
            let timeout = self.config.request_timeout();
            match tokio::time::timeout(timeout, self.generate(prompt, response_schema)).await {
                Ok(result) => result,
                Err(_) => Err(ModelError::Timeout(self.config.request_timeout_secs)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_text_concatenates_parts() {
        let envelope: GenerateContentResponse = serde_json::from_str(
            r#"{
                "candidates": [
                    {"content": {"role": "model", "parts": [{"text": "[{\"id\":"}, {"text": "\"m1\"}]"}]}},
                    {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(envelope.text().as_deref(), Some(r#"[{"id":"m1"}]"#));
    }

    #[test]
    fn test_blocked_prompt_has_no_text() {
        let envelope: GenerateContentResponse = serde_json::from_str(
            r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#,
        )
        .unwrap();

        assert_eq!(envelope.text(), None);
    }

    #[test]
    fn test_request_body_shape() {
        let schema = serde_json::json!({"type": "ARRAY"});
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                response_schema: &schema,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(value["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(value["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }
}
