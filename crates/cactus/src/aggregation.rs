//! 📊 Aggregation — "how much cactus did we sell each month?", asked of Elasticsearch.
//!
//! One query, no filter, no hits (`size: 0`), one `date_histogram` on the date field
//! with a `sum` of the price nested inside each bucket. The cluster does all the math.
//! We just read the buckets back in whatever order it hands them over (chronological,
//! in practice) and give each one a typed key instead of a mystery `Value`.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::CactusError;

/// 🏷️ Name of the histogram aggregation in the request and response.
pub const HISTOGRAM_AGG_NAME: &str = "salesByDate";
/// 🏷️ Name of the nested sum aggregation.
pub const SUM_AGG_NAME: &str = "totalSales";

/// 🎛️ Which fields to group and sum, and how wide a bucket is.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    #[serde(default = "default_date_field")]
    pub date_field: String,
    #[serde(default = "default_sum_field")]
    pub sum_field: String,
    /// 📅 Elasticsearch calendar interval: `month` by default. `week`, `quarter`, `year` also work.
    #[serde(default = "default_calendar_interval")]
    pub calendar_interval: String,
}

fn default_date_field() -> String {
    "date".to_string()
}

fn default_sum_field() -> String {
    "price".to_string()
}

fn default_calendar_interval() -> String {
    "month".to_string()
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            date_field: default_date_field(),
            sum_field: default_sum_field(),
            calendar_interval: default_calendar_interval(),
        }
    }
}

/// 📦 A ready-to-send `_search` body.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregationQuery {
    body: Value,
}

impl AggregationQuery {
    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// 🚀 Build the monthly-sales query. Matches every document in the index.
pub fn build_aggregation_query(config: &AggregationConfig) -> AggregationQuery {
    let body = json!({
        "size": 0,
        "aggs": {
            HISTOGRAM_AGG_NAME: {
                "date_histogram": {
                    "field": config.date_field,
                    "calendar_interval": config.calendar_interval
                },
                "aggs": {
                    SUM_AGG_NAME: {
                        "sum": { "field": config.sum_field }
                    }
                }
            }
        }
    });
    AggregationQuery { body }
}

/// 🔑 A bucket key, typed. Date histograms hand back epoch millis; we hand back a date.
///
/// `Text` is the escape hatch for a key we could not read as a date. It should not
/// happen against a real `date` field, but the report can still print it if it does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BucketKey {
    Date(NaiveDate),
    Text(String),
}

/// 🪣 One month (or whatever interval) of sales.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesBucket {
    pub period: BucketKey,
    pub doc_count: u64,
    pub total: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    aggregations: Option<HashMap<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct HistogramAggregation {
    buckets: Vec<RawBucket>,
}

#[derive(Debug, Deserialize)]
struct RawBucket {
    key: Value,
    key_as_string: Option<String>,
    #[serde(default)]
    doc_count: u64,
    // 🎒 the nested sum rides along under its own name
    #[serde(flatten)]
    sub_aggregations: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
struct SumAggregation {
    value: Option<f64>,
}

/// 🔍 Read the buckets out of a `_search` response body, preserving service order.
///
/// 💀 [`CactusError::Query`] if the body is not JSON, the histogram is missing, or a
/// bucket has no sum. A report with silently missing months is worse than no report.
pub fn parse_buckets(body: &str) -> Result<Vec<SalesBucket>> {
    let response: SearchResponse = serde_json::from_str(body)
        .map_err(|err| CactusError::Query(format!("search response was not valid JSON: {err}")))?;

    let histogram = response
        .aggregations
        .and_then(|mut aggs| aggs.remove(HISTOGRAM_AGG_NAME))
        .ok_or_else(|| {
            CactusError::Query(format!("response carries no '{HISTOGRAM_AGG_NAME}' aggregation"))
        })?;
    let histogram: HistogramAggregation = serde_json::from_value(histogram).map_err(|err| {
        CactusError::Query(format!("'{HISTOGRAM_AGG_NAME}' has no readable buckets: {err}"))
    })?;

    let mut buckets = Vec::with_capacity(histogram.buckets.len());
    for mut raw in histogram.buckets {
        let sum = raw.sub_aggregations.remove(SUM_AGG_NAME).ok_or_else(|| {
            CactusError::Query(format!("bucket {} has no '{SUM_AGG_NAME}'", raw.key))
        })?;
        let sum: SumAggregation = serde_json::from_value(sum).map_err(|err| {
            CactusError::Query(format!("'{SUM_AGG_NAME}' in bucket {} is unreadable: {err}", raw.key))
        })?;

        buckets.push(SalesBucket {
            period: bucket_key(&raw.key, raw.key_as_string.as_deref()),
            doc_count: raw.doc_count,
            // 🕳️ an empty bucket sums to nothing; nothing is zero dollars
            total: sum.value.unwrap_or(0.0),
        });
    }
    Ok(buckets)
}

fn bucket_key(key: &Value, key_as_string: Option<&str>) -> BucketKey {
    if let Some(date) = key
        .as_i64()
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|instant| instant.date_naive())
    {
        return BucketKey::Date(date);
    }

    let text = key
        .as_str()
        .or(key_as_string)
        .map(str::to_string)
        .unwrap_or_else(|| key.to_string());
    match parse_date_text(&text) {
        Some(date) => BucketKey::Date(date),
        None => BucketKey::Text(text),
    }
}

fn parse_date_text(text: &str) -> Option<NaiveDate> {
    DateTime::parse_from_rfc3339(text)
        .map(|instant| instant.date_naive())
        .ok()
        .or_else(|| NaiveDate::parse_from_str(text, "%Y-%m-%d").ok())
}
