//! # 📡 THE SEARCH CLIENT
//!
//! 🎬 COLD OPEN — INT. SERVER ROOM — 3:47 AM
//!
//! The cluster is green. The index does not exist yet. Somewhere in Arizona,
//! a thousand imaginary cacti are waiting to be sold. One `reqwest::Client`
//! stands between them and their destiny.
//!
//! 🚀 This module is the only place that talks HTTP. Everything else builds bodies
//! and reads responses; [`SearchClient`] carries them across the wire:
//!
//! | call | endpoint | error kind on failure |
//! |---|---|---|
//! | [`SearchClient::connect`] | `GET /` | `Connection` |
//! | [`SearchClient::create_index`] | `PUT /{index}` | `IndexCreation` |
//! | [`SearchClient::delete_index`] | `DELETE /{index}` | `RemoteService` (404 is fine) |
//! | [`SearchClient::submit_batch`] | `POST /_bulk` | `BulkRequest` |
//! | [`SearchClient::refresh`] | `POST /{index}/_refresh` | `RemoteService` |
//! | [`SearchClient::execute`] | `POST /{index}/_search` | `Query` |
//!
//! 🔄 Nothing here retries. Retries are the caller's problem, and the caller has decided
//! it has no problems. 🦆

use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info, trace};

use crate::aggregation::{AggregationQuery, SalesBucket, parse_buckets};
use crate::bulk::{BulkReport, compose_bulk_body};
use crate::dataset::SalesRecord;
use crate::error::CactusError;
use crate::schema::SchemaDeclaration;

// 📡 ElasticsearchConfig — "It's just Elasticsearch", she said, before the cluster went red.
//
// 🔧 auth is tri-modal: username+password, api_key, or "I hope anonymous works"
// (on a localhost dev cluster, it does).
#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchConfig {
    /// 📡 Base URL of the cluster. Scheme + host + port. All of it.
    #[serde(default = "default_url")]
    pub url: String,
    /// 🔒 Username for basic auth. Optional, like flossing.
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key auth. Wins over basic auth when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// 📦 The index the sales live in.
    #[serde(default = "default_index")]
    pub index: String,
    /// ⏱️ None → whatever reqwest thinks is reasonable.
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

fn default_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "cactus".to_string()
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: None,
            password: None,
            api_key: None,
            index: default_index(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

/// 📡 A live handle to the search service.
///
/// Built by [`SearchClient::connect`], which refuses to hand one out unless the cluster
/// answered a ping. The connection pool is released when the handle drops;
/// [`SearchClient::close`] consumes it so the end of its life is explicit and logged.
#[derive(Debug)]
pub struct SearchClient {
    client: reqwest::Client,
    config: ElasticsearchConfig,
}

impl SearchClient {
    /// 🚀 Build the HTTP client and knock on the cluster's front door.
    ///
    /// 💀 [`CactusError::Connection`] if the host does not resolve, the TCP handshake
    /// fails, or the cluster answers the ping with anything but a 2xx (bad credentials
    /// included: a cluster that won't talk to us is as good as unreachable).
    pub async fn connect(config: ElasticsearchConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        if let Some(secs) = config.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .context("💀 The HTTP client refused to be born. Probably a missing TLS cert or a cursed system OpenSSL. Either way: tragic.")?;

        let this = Self { client, config };

        // 📡 Connectivity ping — "Hello? Is this thing on?"
        let root_url = this.endpoint("");
        let response = this
            .authorize(this.client.get(&root_url))
            .send()
            .await
            .map_err(|err| CactusError::Connection {
                url: root_url.clone(),
                reason: error_with_sources(&err),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CactusError::Connection {
                url: root_url,
                reason: format!("ping answered {status}: {body}"),
            }
            .into());
        }

        info!("✅ Connected to search service at {}", this.config.url);
        Ok(this)
    }

    /// 📦 The config this client was built from.
    pub fn config(&self) -> &ElasticsearchConfig {
        &self.config
    }

    /// 🏗️ `PUT /{index}` with the mapping. No existence check: if the index is already
    /// there, the cluster says `resource_already_exists_exception` and so do we.
    pub async fn create_index(&self, index: &str, schema: &SchemaDeclaration) -> Result<()> {
        let body = schema.to_request_body()?;
        let url = self.endpoint(index);
        debug!("🏗️ Creating index '{}' with mapping {}", index, body);

        let response = self
            .authorize(self.client.put(&url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .with_context(|| format!("💀 The create-index request for '{index}' never made it to the cluster."))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CactusError::IndexCreation {
                index: index.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        info!("✅ Index '{}' created", index);
        Ok(())
    }

    /// 🗑️ `DELETE /{index}`. A 404 means it was never there, which is what we wanted anyway.
    pub async fn delete_index(&self, index: &str) -> Result<()> {
        let url = self.endpoint(index);
        let response = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .with_context(|| format!("💀 The delete-index request for '{index}' got ghosted."))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            debug!("🗑️ Index '{}' did not exist, nothing to delete", index);
            return Ok(());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CactusError::RemoteService {
                operation: format!("delete index '{index}'"),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        info!("🗑️ Index '{}' deleted", index);
        Ok(())
    }

    /// 📡 Send every record in ONE `_bulk` request and read back the per-document verdicts.
    ///
    /// 💀 [`CactusError::BulkRequest`] only when the request as a whole fails. Per-document
    /// rejections come back inside the [`BulkReport`], not as an error.
    pub async fn submit_batch(&self, index: &str, records: &[SalesRecord]) -> Result<BulkReport> {
        let payload = compose_bulk_body(index, records)?;
        let bulk_url = self.endpoint("_bulk");
        debug!(
            "📡 Sending {} documents ({} bytes) to /_bulk",
            records.len(),
            payload.len()
        );

        let response = self
            .authorize(self.client.post(&bulk_url))
            // ⚠️ application/x-ndjson, not application/json. Elasticsearch cares.
            .header("Content-Type", "application/x-ndjson")
            .body(payload)
            .send()
            .await
            .map_err(|err| CactusError::BulkRequest(error_with_sources(&err)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| CactusError::BulkRequest(error_with_sources(&err)))?;
        if !status.is_success() {
            return Err(CactusError::BulkRequest(format!(
                "Elasticsearch answered {status}: {body}"
            ))
            .into());
        }

        let report = BulkReport::from_response_body(records.len(), &body)?;
        trace!(
            "🚀 Bulk landed: {}/{} indexed in {}ms",
            report.indexed, report.submitted, report.took_ms
        );
        Ok(report)
    }

    /// 🔄 `POST /{index}/_refresh` so freshly bulk-indexed documents are searchable now.
    pub async fn refresh(&self, index: &str) -> Result<()> {
        let url = self.endpoint(&format!("{index}/_refresh"));
        let response = self
            .authorize(self.client.post(&url))
            .send()
            .await
            .with_context(|| format!("💀 The refresh request for '{index}' never arrived."))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CactusError::RemoteService {
                operation: format!("refresh index '{index}'"),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        debug!("🔄 Index '{}' refreshed", index);
        Ok(())
    }

    /// 📊 Run the aggregation query and hand back the buckets in service order.
    pub async fn execute(&self, index: &str, query: &AggregationQuery) -> Result<Vec<SalesBucket>> {
        let url = self.endpoint(&format!("{index}/_search"));
        let body = serde_json::to_string(query.body())
            .context("💀 The aggregation query refused to become JSON.")?;
        debug!("📊 Querying '{}' with {}", index, body);

        let response = self
            .authorize(self.client.post(&url))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|err| CactusError::Query(error_with_sources(&err)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|err| CactusError::Query(error_with_sources(&err)))?;
        if !status.is_success() {
            return Err(CactusError::Query(format!("Elasticsearch answered {status}: {text}")).into());
        }

        parse_buckets(&text)
    }

    /// 🗑️ Consumes the handle; the pool is released on drop, this just makes it visible.
    ///
    /// Dropping without calling `close` releases the same resources. The only difference is the log line.
    pub fn close(self) {
        debug!("🗑️ Closing search client for {}", self.config.url);
    }

    // 📡 trim_end_matches('/') — one slash of difference, infinite suffering of difference.
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.url.trim_end_matches('/'), path)
    }

    // 🔒 API key wins over basic auth. This is not a democracy.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("ApiKey {api_key}"))
        } else if let Some(ref username) = self.config.username {
            request.basic_auth(username, self.config.password.as_ref())
        } else {
            request
        }
    }
}

// 🧅 reqwest's Display stops at the top layer; the interesting part ("connection refused")
// is usually two `source()`s down.
fn error_with_sources(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
