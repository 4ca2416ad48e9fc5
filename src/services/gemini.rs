use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::services::keys::{ApiKey, KeyRing};
use crate::services::providers::{
    Embedder, GenerationPurpose, GenerationRequest, GenerationResponse, ProviderError,
    TextGenerator,
};

fn default_base_url() -> String { "https://generativelanguage.googleapis.com/v1beta".to_string() }
fn default_generation_model() -> String { "gemini-2.5-flash".to_string() }
fn default_embedding_model() -> String { "text-embedding-004".to_string() }
fn default_request_timeout_secs() -> u64 { 30 }
fn default_temperature() -> f32 { 0.2 }

/// Connection settings for the Gemini REST API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_generation_model")]
    pub generation_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            generation_model: default_generation_model(),
            embedding_model: default_embedding_model(),
            request_timeout_secs: default_request_timeout_secs(),
            temperature: default_temperature(),
        }
    }
}

/// Gemini API client
///
/// Implements both provider traits. Every call walks the key ring for its
/// purpose and moves on to the next key when one is rejected or throttled.
pub struct GeminiClient {
    settings: GeminiSettings,
    client: Client,
    keys: KeyRing,
}

impl GeminiClient {
    pub fn new(settings: GeminiSettings, keys: KeyRing) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;

        Ok(Self {
            settings,
            client,
            keys,
        })
    }

    fn url(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.settings.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    async fn post_once(&self, url: &str, key: &ApiKey, body: &Value) -> Result<Value, ProviderError> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &key.secret)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(ProviderError::Unauthorized),
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimited),
            s if !s.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        Ok(response.json().await?)
    }

    /// POST with key rotation. Only key failures move on to the next key.
    async fn post(&self, purpose: GenerationPurpose, url: &str, body: Value) -> Result<Value, ProviderError> {
        let mut last_error = None;

        for key in self.keys.candidates(purpose) {
            tracing::debug!("Calling {} with key {} for {:?}", url, key.name, purpose);
            match self.post_once(url, &key, &body).await {
                Ok(value) => {
                    self.keys.report_success(&key.name);
                    return Ok(value);
                }
                Err(e) if e.is_key_failure() => {
                    self.keys.report_failure(&key.name);
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::error!("Provider call failed: {}", e);
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or(ProviderError::NoKeyAvailable(purpose)))
    }
}

fn generation_text(json: &Value) -> Result<String, ProviderError> {
    json.pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ProviderError::InvalidResponse("missing candidates[0].content.parts[0].text".into()))
}

fn embedding_values(json: &Value) -> Result<Vec<f32>, ProviderError> {
    let values = json
        .pointer("/embedding/values")
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing embedding.values".into()))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| ProviderError::InvalidResponse("non-numeric embedding value".into()))
        })
        .collect()
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let mut generation_config = json!({ "temperature": self.settings.temperature });
        if let Some(schema) = request.schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema;
        }

        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": generation_config,
        });

        let url = self.url(&self.settings.generation_model, "generateContent");
        let json = self.post(request.purpose, &url, body).await?;

        let model = json
            .get("modelVersion")
            .and_then(Value::as_str)
            .unwrap_or(&self.settings.generation_model)
            .to_string();

        Ok(GenerationResponse {
            text: generation_text(&json)?,
            model,
        })
    }

    fn model_id(&self) -> &str {
        &self.settings.generation_model
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let body = json!({
            "model": format!("models/{}", self.settings.embedding_model),
            "content": { "parts": [{ "text": text }] },
        });

        let url = self.url(&self.settings.embedding_model, "embedContent");
        let json = self.post(GenerationPurpose::Embedding, &url, body).await?;
        let values = embedding_values(&json)?;
        if values.is_empty() {
            return Err(ProviderError::InvalidResponse("empty embedding".into()));
        }
        Ok(values)
    }

    fn model_id(&self) -> &str {
        &self.settings.embedding_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::keys::KeySelectionPolicy;

    fn client(base_url: String, keys: Vec<(&str, &str)>) -> GeminiClient {
        let keys = keys
            .into_iter()
            .map(|(name, secret)| ApiKey {
                name: name.to_string(),
                secret: secret.to_string(),
                purpose: None,
            })
            .collect();
        GeminiClient::new(
            GeminiSettings {
                base_url,
                generation_model: "gemini-test".to_string(),
                embedding_model: "embed-test".to_string(),
                ..Default::default()
            },
            KeyRing::new(keys, KeySelectionPolicy::LeastRecentlyFailed, Duration::from_secs(60)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_generate_reads_first_candidate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/models/gemini-test:generateContent")
            .match_header("x-goog-api-key", "k1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"{\"ok\":true}"}]}}],"modelVersion":"gemini-test-001"}"#)
            .create_async()
            .await;

        let gemini = client(server.url(), vec![("primary", "k1")]);
        let response = gemini
            .generate(GenerationRequest {
                prompt: "hello".to_string(),
                purpose: GenerationPurpose::Recommendation,
                schema: Some(json!({"type": "OBJECT"})),
            })
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.text, r#"{"ok":true}"#);
        assert_eq!(response.model, "gemini-test-001");
    }

    #[tokio::test]
    async fn test_rate_limited_key_rotates() {
        let mut server = mockito::Server::new_async().await;
        let limited = server
            .mock("POST", "/models/embed-test:embedContent")
            .match_header("x-goog-api-key", "k1")
            .with_status(429)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/models/embed-test:embedContent")
            .match_header("x-goog-api-key", "k2")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"embedding":{"values":[0.1,0.2,0.3]}}"#)
            .create_async()
            .await;

        let gemini = client(server.url(), vec![("a", "k1"), ("b", "k2")]);
        let vector = gemini.embed("resume text").await.unwrap();

        limited.assert_async().await;
        ok.assert_async().await;
        assert_eq!(vector.len(), 3);
    }

    #[tokio::test]
    async fn test_server_error_does_not_rotate() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/models/gemini-test:generateContent")
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let gemini = client(server.url(), vec![("a", "k1"), ("b", "k2")]);
        let result = gemini
            .generate(GenerationRequest {
                prompt: "hello".to_string(),
                purpose: GenerationPurpose::SkillExtraction,
                schema: None,
            })
            .await;

        failing.assert_async().await;
        assert!(matches!(result, Err(ProviderError::Api { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_no_keys() {
        let gemini = client("http://127.0.0.1:9".to_string(), vec![]);
        let result = gemini.embed("x").await;
        assert!(matches!(result, Err(ProviderError::NoKeyAvailable(GenerationPurpose::Embedding))));
    }

    #[test]
    fn test_missing_text_is_invalid_response() {
        let result = generation_text(&json!({"candidates": []}));
        assert!(matches!(result, Err(ProviderError::InvalidResponse(_))));
    }
}
