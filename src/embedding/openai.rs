//! OpenAI embeddings over HTTP.

use super::{EmbeddingProvider, ProviderError};
use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedding provider for OpenAI-compatible `/embeddings` endpoints.
pub struct OpenAIProvider {
    client: Client,
    endpoint: String,
    model: String,
}

impl OpenAIProvider {
    /// Create a provider with an explicit key, base URL and request timeout.
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(IndexerError::Config("missing OpenAI API key".to_string()));
        }
        if model.trim().is_empty() {
            return Err(IndexerError::Config("missing embedding model name".to_string()));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| IndexerError::Config("invalid OpenAI API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
        })
    }

    /// Create a provider using `OPENAI_API_KEY` from the environment.
    pub fn from_env(base_url: &str, model: &str, timeout: Duration) -> Result<Self> {
        let key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| IndexerError::Config("OPENAI_API_KEY not set".to_string()))?;
        Self::new(&key, base_url, model, timeout)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[async_trait]
impl EmbeddingProvider for OpenAIProvider {
    #[instrument(skip(self, text), fields(len = text.len()))]
    async fn embed(&self, text: &str) -> std::result::Result<Vec<Vec<f64>>, ProviderError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(classify_status(status, body));
        }

        let payload: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(format!("response is not JSON: {}", e)))?;

        let vectors = parse_embeddings(&payload)?;
        debug!("Received {} embedding(s)", vectors.len());
        Ok(vectors)
    }
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    let message = format!("OpenAI returned {}: {}", status, body);
    if status == StatusCode::TOO_MANY_REQUESTS {
        ProviderError::RateLimited(message)
    } else if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
        ProviderError::Timeout(message)
    } else if status.is_server_error() {
        ProviderError::Transient(message)
    } else {
        ProviderError::Fatal(message)
    }
}

fn classify_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ProviderError::Transient(err.to_string())
    } else {
        ProviderError::Fatal(err.to_string())
    }
}

/// Pull `data[*].embedding` out of a response, ordered by `index`.
///
/// Numbers are returned as-is; finiteness is checked by the caller.
fn parse_embeddings(payload: &serde_json::Value) -> std::result::Result<Vec<Vec<f64>>, ProviderError> {
    let data = payload
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| ProviderError::Malformed("missing `data` array".to_string()))?;

    let mut entries = Vec::with_capacity(data.len());
    for (pos, entry) in data.iter().enumerate() {
        let index = entry
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(pos);
        let values = entry
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| {
                ProviderError::Malformed(format!("entry {} has no `embedding` array", pos))
            })?;

        let mut vector = Vec::with_capacity(values.len());
        for (i, value) in values.iter().enumerate() {
            let number = value.as_f64().ok_or_else(|| {
                ProviderError::Malformed(format!("entry {} element {} is not a number", pos, i))
            })?;
            vector.push(number);
        }
        entries.push((index, vector));
    }

    entries.sort_by_key(|(index, _)| *index);
    Ok(entries.into_iter().map(|(_, v)| v).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_provider_requires_key() {
        let result = OpenAIProvider::new(" ", "https://api.openai.com/v1", "m", Duration::from_secs(1));
        assert!(matches!(result, Err(IndexerError::Config(_))));
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let provider = OpenAIProvider::new(
            "sk-test",
            "https://api.openai.com/v1/",
            "text-embedding-ada-002",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(provider.endpoint, "https://api.openai.com/v1/embeddings");
        assert_eq!(provider.model, "text-embedding-ada-002");
    }

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ProviderError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY, String::new()),
            ProviderError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST, String::new()),
            ProviderError::Fatal(_)
        ));
    }

    #[test]
    fn test_parse_orders_by_index() {
        let payload = json!({
            "data": [
                {"index": 1, "embedding": [3.0, 4.0]},
                {"index": 0, "embedding": [1.0, 2.0]}
            ]
        });
        let vectors = parse_embeddings(&payload).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_parse_rejects_non_numeric_values() {
        let payload = json!({"data": [{"index": 0, "embedding": [1.0, "x"]}]});
        assert!(matches!(
            parse_embeddings(&payload),
            Err(ProviderError::Malformed(_))
        ));

        let payload = json!({"data": [{"index": 0, "embedding": "nope"}]});
        assert!(matches!(
            parse_embeddings(&payload),
            Err(ProviderError::Malformed(_))
        ));
    }
}
