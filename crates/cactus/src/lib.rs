//! 🌵 cactus — sell a year of imaginary cacti to Elasticsearch, then ask it how we did.
//!
//! Two runs, one client:
//! - [`run_load`]: declare the mapping, create the index, generate the dataset,
//!   bulk it in with one request, optionally refresh.
//! - [`run_report`]: one date-histogram query, buckets back in service order.
//!
//! Both acquire a [`client::SearchClient`] up front and release it on the way out,
//! whether the middle part worked or not. 🦆

pub mod aggregation;
pub mod app_config;
pub mod bulk;
pub mod client;
pub mod dataset;
pub mod error;
pub mod report;
pub mod schema;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use crate::aggregation::{SalesBucket, build_aggregation_query};
use crate::app_config::AppConfig;
use crate::bulk::BulkReport;
use crate::client::SearchClient;
use crate::dataset::{generate_dataset, rng_from_seed};
use crate::schema::declare_schema;

/// 🚚 The load run. Returns the bulk report; per-document failures are in there, not in `Err`.
///
/// 💀 Anything else (unreachable cluster, index already exists, bulk request rejected
/// wholesale, refresh failed) is fatal and comes back as `Err`.
pub async fn run_load(app_config: &AppConfig) -> Result<BulkReport> {
    // 🔒 validate before touching the cluster, so a bad config doesn't leave an empty index behind
    app_config.dataset.validate()?;

    let client = SearchClient::connect(app_config.elasticsearch.clone()).await?;
    let outcome = load_with(&client, app_config).await;
    client.close();
    outcome
}

async fn load_with(client: &SearchClient, app_config: &AppConfig) -> Result<BulkReport> {
    let index = client.config().index.as_str();

    let schema = declare_schema();
    if app_config.loader.recreate_index {
        client.delete_index(index).await?;
    }
    client.create_index(index, &schema).await?;

    let mut rng = rng_from_seed(app_config.dataset.seed);
    let today = Local::now().date_naive();
    let records = generate_dataset(&mut rng, &app_config.dataset, today)
        .context("💀 The cactus factory broke down before the first sale.")?;
    info!("🌵 Generated {} sales records ending {}", records.len(), today);

    let report = client.submit_batch(index, &records).await?;
    if report.has_failures() {
        warn!(
            "⚠️ {} of {} documents were rejected by '{}'",
            report.submitted.saturating_sub(report.indexed),
            report.submitted,
            index
        );
    } else {
        info!("✅ All {} documents indexed into '{}'", report.indexed, index);
    }

    if app_config.loader.refresh_after_load {
        client.refresh(index).await?;
    }
    Ok(report)
}

/// 📊 The report run. Buckets come back exactly as the cluster ordered them.
pub async fn run_report(app_config: &AppConfig) -> Result<Vec<SalesBucket>> {
    let client = SearchClient::connect(app_config.elasticsearch.clone()).await?;
    let query = build_aggregation_query(&app_config.report.aggregation);
    let outcome = client
        .execute(&app_config.elasticsearch.index, &query)
        .await;
    client.close();

    let buckets = outcome?;
    info!("📊 Received {} buckets", buckets.len());
    Ok(buckets)
}
