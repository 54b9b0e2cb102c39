// ai
//! 📡 Bulk — formatting cactus sales for the `_bulk` API and reading its verdict.
//!
//! 🎬 COLD OPEN — INT. ELASTICSEARCH CLUSTER — BULK ENDPOINT — HIGH NOON
//!
//! The bulk API has rules. Two lines per document: the action, then the source.
//! Newline-delimited. And the trailing newline on the whole body matters.
//! It MATTERS. Three engineers lost weekends to this.
//!
//! Going out: [`compose_bulk_body`] turns a slice of [`SalesRecord`]s into one NDJSON payload.
//! Coming back: [`BulkReport::from_response_body`] turns the response into a report
//! that says how many landed and which ones didn't, and why.
//!
//! ⚠️ A 200 from `_bulk` does NOT mean everything was indexed. It means the request
//! was understood. The per-item verdicts live in `items[]`, and `errors: true` is the
//! cluster's way of clearing its throat. Partial success is a real terminal state here:
//! we surface it, we don't retry it, we don't roll anything back. 🦆

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::json;

use crate::dataset::SalesRecord;

/// 📦 Compose the full `_bulk` NDJSON body for `records`, all targeting `index`.
///
/// ```text
/// {"index":{"_index":"cactus"}}
/// {"price":12.5,"date":"2024-01-01","state":"AZ","category":"Saguaro"}
/// ```
///
/// No `_id`: Elasticsearch generates one, the same way the classic demo let it.
pub fn compose_bulk_body(index: &str, records: &[SalesRecord]) -> Result<String> {
    // 🏗️ The action line is identical for every record, so serialize it once.
    let the_action_line = serde_json::to_string(&json!({ "index": { "_index": index } }))
        .context("💀 Failed to serialize bulk action metadata. The JSON that describes JSON has failed to become JSON.")?;

    let mut payload = String::with_capacity(records.len() * (the_action_line.len() + 96));
    for record in records {
        let the_source_line = serde_json::to_string(record)
            .with_context(|| format!("💀 Failed to serialize sales record {record:?}"))?;
        payload.push_str(&the_action_line);
        payload.push('\n');
        payload.push_str(&the_source_line);
        payload.push('\n');
    }

    // ✅ Trailing \n included — ES bulk requires it.
    Ok(payload)
}

// ============================================================
// 📬 What `_bulk` sends back
// ============================================================

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    took: u64,
    errors: bool,
    #[serde(default)]
    items: Vec<HashMap<String, BulkItemResult>>,
}

#[derive(Debug, Deserialize)]
struct BulkItemResult {
    #[serde(rename = "_index")]
    index: Option<String>,
    #[serde(rename = "_id")]
    id: Option<String>,
    status: u16,
    error: Option<BulkItemError>,
}

#[derive(Debug, Deserialize)]
struct BulkItemError {
    #[serde(rename = "type")]
    kind: String,
    reason: Option<String>,
}

/// 💀 One document the cluster refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkFailure {
    /// 🔢 Position of the document in the submitted batch (0-based).
    pub position: usize,
    pub index: String,
    pub id: String,
    pub status: u16,
    /// 📜 `"<error type>: <reason>"`, straight from the cluster.
    pub reason: String,
}

/// 📊 The outcome of one bulk submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    /// 📦 How many documents went out.
    pub submitted: usize,
    /// ✅ How many came back with a 2xx item status.
    pub indexed: usize,
    pub failures: Vec<BulkFailure>,
    /// 🚩 The top-level `errors` flag. Kept separately because the cluster can raise it
    /// without attaching an `error` to any item we could parse.
    pub errors_flagged: bool,
    pub took_ms: u64,
}

impl BulkReport {
    /// 🔍 Parse a `_bulk` response body. `submitted` is the number of documents we sent.
    pub fn from_response_body(submitted: usize, body: &str) -> Result<Self> {
        let response: BulkResponse = serde_json::from_str(body).with_context(|| {
            format!("💀 The bulk response was not the JSON we were promised. It read: '{body}'")
        })?;

        let mut indexed = 0;
        let mut failures = Vec::new();
        for (position, item) in response.items.into_iter().enumerate() {
            // 🎭 Each item is `{"<action>": {...}}` with exactly one action. We only send "index".
            let Some(result) = item.into_values().next() else {
                continue;
            };
            match result.error {
                Some(error) => failures.push(BulkFailure {
                    position,
                    index: result.index.unwrap_or_default(),
                    id: result.id.unwrap_or_default(),
                    status: result.status,
                    reason: match error.reason {
                        Some(reason) => format!("{}: {}", error.kind, reason),
                        None => error.kind,
                    },
                }),
                None if (200..300).contains(&result.status) => indexed += 1,
                None => failures.push(BulkFailure {
                    position,
                    index: result.index.unwrap_or_default(),
                    id: result.id.unwrap_or_default(),
                    status: result.status,
                    reason: format!("item returned status {} without an error body", result.status),
                }),
            }
        }

        Ok(Self {
            submitted,
            indexed,
            failures,
            errors_flagged: response.errors,
            took_ms: response.took,
        })
    }

    /// 🧮 Documents the response accounted for, landed or refused.
    pub fn accounted(&self) -> usize {
        self.indexed + self.failures.len()
    }

    /// 🕳️ Documents we sent that never showed up in `items[]`.
    pub fn missing(&self) -> usize {
        self.submitted.saturating_sub(self.accounted())
    }

    /// 🚩 True when anything was refused, or when the items don't add up to what we sent.
    pub fn has_failures(&self) -> bool {
        self.errors_flagged || !self.failures.is_empty() || self.accounted() != self.submitted
    }

    /// 📜 Human-readable summary of every failed document. Empty when nothing failed.
    pub fn failure_message(&self) -> String {
        if !self.has_failures() {
            return String::new();
        }

        let mut message = String::from("failure in bulk execution:");
        for failure in &self.failures {
            message.push_str(&format!(
                "\n[{}]: index [{}], id [{}], status [{}], message [{}]",
                failure.position, failure.index, failure.id, failure.status, failure.reason
            ));
        }
        if self.errors_flagged && self.failures.is_empty() {
            // 🤷 errors=true, but no item owned up to it
            message.push_str("\n[?]: the service reported errors without per-document detail");
        }
        if self.missing() > 0 {
            message.push_str(&format!(
                "\n[?]: {} documents missing from the bulk response",
                self.missing()
            ));
        } else if self.accounted() > self.submitted {
            message.push_str(&format!(
                "\n[?]: the bulk response accounted for {} documents, but {} were sent",
                self.accounted(),
                self.submitted
            ));
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::Value;

    fn a_record(price: f64, state: &str) -> SalesRecord {
        SalesRecord {
            price,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).expect("💀 New Year's Day exists"),
            state: state.to_string(),
            category: "Saguaro".to_string(),
        }
    }

    #[test]
    fn the_one_where_two_records_become_four_lines() -> Result<()> {
        let body = compose_bulk_body("cactus", &[a_record(1.0, "AZ"), a_record(50.0, "CA")])?;

        assert!(body.ends_with('\n'), "bulk body must end with a newline");
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);

        let action: Value = serde_json::from_str(lines[0])?;
        assert_eq!(action, json!({ "index": { "_index": "cactus" } }));
        let source: Value = serde_json::from_str(lines[3])?;
        assert_eq!(source["state"], "CA");
        assert_eq!(source["price"], 50.0);
        assert_eq!(source["date"], "2024-01-01");
        Ok(())
    }

    #[test]
    fn the_one_where_everything_lands() -> Result<()> {
        let body = json!({
            "took": 12,
            "errors": false,
            "items": [
                { "index": { "_index": "cactus", "_id": "a1", "status": 201, "result": "created" } },
                { "index": { "_index": "cactus", "_id": "a2", "status": 201, "result": "created" } }
            ]
        })
        .to_string();

        let report = BulkReport::from_response_body(2, &body)?;
        assert!(!report.has_failures());
        assert_eq!(report.indexed, 2);
        assert!(report.failures.is_empty());
        assert_eq!(report.took_ms, 12);
        assert_eq!(report.failure_message(), "");
        Ok(())
    }

    #[test]
    fn the_one_where_one_cactus_is_rejected() -> Result<()> {
        let body = json!({
            "took": 3,
            "errors": true,
            "items": [
                { "index": { "_index": "cactus", "_id": "ok", "status": 201 } },
                { "index": {
                    "_index": "cactus",
                    "_id": "nope",
                    "status": 400,
                    "error": {
                        "type": "mapper_parsing_exception",
                        "reason": "failed to parse field [price] of type [double]"
                    }
                } }
            ]
        })
        .to_string();

        let report = BulkReport::from_response_body(2, &body)?;
        assert!(report.has_failures());
        assert_eq!(report.indexed, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].position, 1);
        assert_eq!(report.failures[0].status, 400);

        let message = report.failure_message();
        assert!(message.starts_with("failure in bulk execution:"));
        assert!(message.contains("[1]: index [cactus], id [nope]"));
        assert!(message.contains("mapper_parsing_exception: failed to parse field [price]"));
        Ok(())
    }

    #[test]
    fn the_one_where_the_cluster_flags_errors_but_names_nobody() -> Result<()> {
        let body = json!({ "took": 1, "errors": true, "items": [] }).to_string();

        let report = BulkReport::from_response_body(1, &body)?;
        assert!(report.has_failures());
        assert!(!report.failure_message().is_empty());
        Ok(())
    }

    #[test]
    fn the_one_where_most_of_the_cacti_vanish_without_a_word() -> Result<()> {
        // 🕵️ errors=false and a 2xx, but only one of a thousand documents is accounted for
        let body = json!({
            "took": 2,
            "errors": false,
            "items": [
                { "index": { "_index": "cactus", "_id": "lonely", "status": 201 } }
            ]
        })
        .to_string();

        let report = BulkReport::from_response_body(1000, &body)?;
        assert_eq!(report.indexed, 1);
        assert_eq!(report.missing(), 999);
        assert!(report.has_failures());
        assert!(
            report
                .failure_message()
                .contains("[?]: 999 documents missing from the bulk response")
        );
        Ok(())
    }

    #[test]
    fn the_one_where_the_response_is_not_json_at_all() {
        let result = BulkReport::from_response_body(1, "<html>502 Bad Gateway</html>");
        assert!(result.is_err());
    }
}
