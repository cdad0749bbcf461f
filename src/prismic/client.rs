//! HTTP client for the Prismic REST API (v2)

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::document::ApiResponse;
use super::error::{ContentError, Result};
use super::query::{encode_orderings, encode_predicates, Predicate, QueryOptions};
use super::ContentClient;
use crate::config::PrismicConfig;

/// How long a fetched master ref is reused before asking the API root again
const MASTER_REF_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct ApiRoot {
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master: bool,
}

/// Content client backed by the Prismic HTTP API
#[derive(Debug)]
pub struct PrismicClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
    master_ref: Mutex<Option<(String, Instant)>>,
}

impl PrismicClient {
    /// Create a client for an API root such as `https://repo.cdn.prismic.io/api/v2`
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_token,
            master_ref: Mutex::new(None),
        }
    }

    /// Create from the site configuration
    pub fn from_config(config: &PrismicConfig) -> Self {
        Self::new(config.endpoint.clone(), config.access_token.clone())
    }

    /// Get the API root
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint)
    }

    /// Current master ref, refreshed after `MASTER_REF_TTL`
    async fn master_ref(&self) -> Result<String> {
        let mut cached = self.master_ref.lock().await;
        if let Some((reference, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < MASTER_REF_TTL {
                return Ok(reference.clone());
            }
        }

        let mut request = self.client.get(&self.endpoint);
        if let Some(token) = &self.access_token {
            request = request.query(&[("access_token", token)]);
        }
        let response = request.send().await?;
        let root: ApiRoot = Self::handle_response(response).await?;

        let reference = root
            .refs
            .into_iter()
            .find(|r| r.is_master)
            .map(|r| r.reference)
            .ok_or(ContentError::MissingMasterRef)?;

        tracing::debug!("Using master ref {}", reference);
        *cached = Some((reference.clone(), Instant::now()));
        Ok(reference)
    }

    /// Query string for a search request
    pub fn search_params(
        predicates: &[Predicate],
        options: &QueryOptions,
        reference: &str,
        access_token: Option<&str>,
    ) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("ref", reference.to_string()),
            ("q", encode_predicates(predicates)),
        ];
        if !options.fetch.is_empty() {
            params.push(("fetch", options.fetch.join(",")));
        }
        if let Some(size) = options.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if let Some(page) = options.page {
            params.push(("page", page.to_string()));
        }
        if let Some(after) = &options.after {
            params.push(("after", after.clone()));
        }
        if !options.orderings.is_empty() {
            params.push(("orderings", encode_orderings(&options.orderings)));
        }
        if let Some(token) = access_token {
            params.push(("access_token", token.to_string()));
        }
        params
    }

    /// Handle error responses.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status.is_success() {
            let body = response.bytes().await?;
            Ok(serde_json::from_slice(&body)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ContentError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl ContentClient for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<ApiResponse> {
        let reference = match &options.reference {
            Some(reference) => reference.clone(),
            None => self.master_ref().await?,
        };
        let params = Self::search_params(
            predicates,
            options,
            &reference,
            self.access_token.as_deref(),
        );

        tracing::debug!(
            "Querying {} q={} ref={}",
            self.search_url(),
            encode_predicates(predicates),
            reference
        );
        let response = self
            .client
            .get(self.search_url())
            .query(&params)
            .send()
            .await?;
        Self::handle_response(response).await
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiResponse> {
        if !self.accepts_cursor(cursor) {
            return Err(ContentError::ForeignCursor(cursor.to_string()));
        }
        tracing::debug!("Following cursor {}", cursor);
        let response = self.client.get(cursor).send().await?;
        Self::handle_response(response).await
    }

    fn accepts_cursor(&self, cursor: &str) -> bool {
        let (Ok(cursor), Ok(endpoint)) = (Url::parse(cursor), Url::parse(&self.endpoint)) else {
            return false;
        };
        cursor.scheme() == endpoint.scheme()
            && cursor.host_str() == endpoint.host_str()
            && cursor.port_or_known_default() == endpoint.port_or_known_default()
            && cursor.path().starts_with(endpoint.path())
    }
}
