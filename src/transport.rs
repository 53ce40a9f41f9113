/*============================================================
  Synavera Project: Syn-Cat
  Module: syncat_core::transport
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Define the HTTP boundary the session controller talks
    through, and its reqwest-backed implementation.

  Security / Safety Notes:
    Performs read-only HTTPS requests to the public catalog.
    No credentials are transmitted; bodies are never logged.

  Dependencies:
    reqwest for HTTP, async-trait for the object-safe trait.

  Operational Scope:
    One transport is shared by every call on a CatalogClient;
    tests substitute scripted implementations.

  Revision History:
    2025-11-12 COD  Authored catalog transport boundary.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Timeouts reported separately from other network faults
    - No retry policy hidden below the session controller
============================================================*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};

/// Status and decoded body of one catalog response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Requests the catalog protocol needs. Implementations must be safe to
/// share across concurrent searches.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpReply>;

    /// POST an `application/x-www-form-urlencoded` body.
    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpReply>;

    /// POST a `multipart/form-data` body holding a single text field.
    async fn post_multipart(&self, url: &str, field: &str, value: String) -> Result<HttpReply>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|err| CatalogError::Network(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }

    async fn execute(&self, url: &str, request: reqwest::RequestBuilder) -> Result<HttpReply> {
        let response = request.send().await.map_err(|err| classify(url, err))?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|err| classify(url, err))?;
        Ok(HttpReply { status, body })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpReply> {
        self.execute(url, self.client.get(url)).await
    }

    async fn post_form(&self, url: &str, form: &[(String, String)]) -> Result<HttpReply> {
        self.execute(url, self.client.post(url).form(form)).await
    }

    async fn post_multipart(&self, url: &str, field: &str, value: String) -> Result<HttpReply> {
        let form = Form::new().part(field.to_string(), Part::text(value));
        self.execute(url, self.client.post(url).multipart(form))
            .await
    }
}

fn classify(url: &str, err: reqwest::Error) -> CatalogError {
    if err.is_timeout() {
        CatalogError::Timeout {
            url: url.to_string(),
        }
    } else {
        CatalogError::Network(format!("Request to {url} failed: {err}"))
    }
}
