//! Pinecone data-plane client.
//!
//! Talks to the index host directly: `POST /vectors/upsert` and
//! `GET /vectors/fetch?ids=...`.

use super::{StoredVector, UpsertRecord, VectorStore};
use crate::error::{IndexerError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Vector store backed by a Pinecone index.
pub struct PineconeStore {
    client: Client,
    base: Url,
    namespace: Option<String>,
}

impl PineconeStore {
    /// Create a store for the index served at `index_host`.
    ///
    /// The host may be given with or without a scheme; `https` is assumed.
    pub fn new(
        api_key: &str,
        index_host: &str,
        namespace: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(IndexerError::Config("missing Pinecone API key".to_string()));
        }

        let host = index_host.trim().trim_end_matches('/');
        let with_scheme = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{}", host)
        };
        let base = Url::parse(&with_scheme).map_err(|e| {
            IndexerError::Config(format!("invalid Pinecone index host '{}': {}", index_host, e))
        })?;

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Api-Key",
            HeaderValue::from_str(api_key.trim())
                .map_err(|_| IndexerError::Config("invalid Pinecone API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base,
            namespace: namespace.filter(|ns| !ns.is_empty()),
        })
    }

    /// Create a store using `PINECONE_API_KEY` from the environment.
    pub fn from_env(
        index_host: &str,
        namespace: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let key = std::env::var("PINECONE_API_KEY")
            .map_err(|_| IndexerError::Config("PINECONE_API_KEY not set".to_string()))?;
        Self::new(&key, index_host, namespace, timeout)
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| IndexerError::Config(format!("invalid Pinecone URL: {}", e)))
    }

    /// URL for fetching `ids`.
    fn fetch_url(&self, ids: &[String]) -> Result<Url> {
        let mut url = self.endpoint("vectors/fetch")?;
        {
            let mut query = url.query_pairs_mut();
            for id in ids {
                query.append_pair("ids", id);
            }
            if let Some(ns) = &self.namespace {
                query.append_pair("namespace", ns);
            }
        }
        Ok(url)
    }
}

/// Transport failures the index may recover from become `StoreUnavailable`.
fn send_error(op: &str, err: reqwest::Error) -> IndexerError {
    if err.is_timeout() || err.is_connect() {
        IndexerError::StoreUnavailable(format!("{} request failed: {}", op, err))
    } else {
        IndexerError::Http(err)
    }
}

/// 429 and 5xx are worth retrying; any other status is a rejection.
fn status_error(op: &str, status: StatusCode, body: &str) -> IndexerError {
    let detail = format!("{} failed ({}): {}", op, status, body);
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        IndexerError::StoreUnavailable(detail)
    } else {
        IndexerError::VectorStore(detail)
    }
}

async fn check_status(op: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<body unavailable>".to_string());
    Err(status_error(op, status, &body))
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [UpsertRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: Option<usize>,
}

#[derive(Deserialize)]
struct FetchResponse {
    vectors: Option<HashMap<String, StoredVector>>,
}

#[async_trait]
impl VectorStore for PineconeStore {
    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn upsert(&self, records: &[UpsertRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records,
            namespace: self.namespace.as_deref(),
        };
        let response = self
            .client
            .post(self.endpoint("vectors/upsert")?)
            .json(&request)
            .send()
            .await
            .map_err(|e| send_error("upsert", e))?;
        let response = check_status("upsert", response).await?;

        let parsed: UpsertResponse = response.json().await?;
        let count = parsed.upserted_count.unwrap_or(records.len());
        debug!("Upserted {} vectors", count);
        Ok(count)
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, StoredVector>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let response = self
            .client
            .get(self.fetch_url(ids)?)
            .send()
            .await
            .map_err(|e| send_error("fetch", e))?;
        let response = check_status("fetch", response).await?;

        let parsed: FetchResponse = response.json().await?;
        parsed.vectors.ok_or_else(|| {
            IndexerError::StoreUnavailable("fetch response has no vectors field".to_string())
        })
    }
}
