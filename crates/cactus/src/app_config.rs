//! 🔧 App Configuration — the sacred TOML-to-struct pipeline, now with cacti.
//!
//! 📡 "Config not found: We looked everywhere. Under the couch. Behind the fridge.
//! Inside a Saguaro. Nothing." — every developer at 3am 🦆
//!
//! 🏗️ Powered by Figment, because manually parsing env vars is a form of
//! self-harm that even the borrow checker wouldn't approve of.
//!
//! Every section has serde defaults, so an empty file (or no file at all) still gives
//! you a run against `http://localhost:9200`, index `cactus`, 1000 records.

use anyhow::Context;
use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::aggregation::AggregationConfig;
use crate::client::ElasticsearchConfig;
use crate::dataset::DatasetConfig;
use crate::report::ReportFormat;

/// 📦 The AppConfig: one struct to rule them all, one struct to find them,
/// one struct to bring them all, and in the Figment bind them.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    /// 📡 Where the cluster lives and how to knock on its door.
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
    /// 🌵 What the fake sales look like. Ranges, vocabularies, how many.
    #[serde(default)]
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// 🚚 Knobs for the `load` run.
#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
    /// 🗑️ Delete the index before creating it. Off by default: a second run is
    /// supposed to fail loudly on the existing index, not quietly eat it.
    #[serde(default)]
    pub recreate_index: bool,
    /// 🔄 POST `/_refresh` after the bulk, so a report run right after sees everything.
    #[serde(default = "default_refresh_after_load")]
    pub refresh_after_load: bool,
}

fn default_refresh_after_load() -> bool {
    true
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            recreate_index: false,
            refresh_after_load: default_refresh_after_load(),
        }
    }
}

/// 📊 Knobs for the `report` run.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReportConfig {
    #[serde(default)]
    pub format: ReportFormat,
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// 🚀 Load the config — from a file, from env vars, or from the sheer power of hoping.
///
/// 🔧 Merges environment variables (`CACTUS_*`, nested keys split on `__`, so
/// `CACTUS_ELASTICSEARCH__URL` lands in `elasticsearch.url`) with an optional TOML file.
///
/// 📐 DESIGN NOTE:
///   - If `config_file_name` is None  → env vars only, then serde defaults.
///   - If `config_file_name` is Some  → env vars + TOML file, merged. TOML wins on conflicts.
///
/// 💀 Returns an error if the config is unparseable, with the file path in the message.
pub fn load_config(config_file_name: Option<&Path>) -> anyhow::Result<AppConfig> {
    info!(
        "🔧 Loading configuration: {:#?}",
        config_file_name.unwrap_or(Path::new(""))
    );

    let config = Figment::new().merge(Env::prefixed("CACTUS_").split("__"));

    // 🎯 Conditionally layer in TOML only if a file was actually provided.
    let config = match config_file_name {
        Some(file_name) => config.merge(Toml::file(file_name)),
        None => config,
    };

    let context_msg = match config_file_name {
        Some(path) => format!(
            "💀 Failed to parse configuration from file '{}' and environment variables (CACTUS_*). \
             Either the TOML is cursed or an env var is lying about its type.",
            path.display()
        ),
        None => "💀 Failed to parse configuration from environment variables (CACTUS_*). \
                 No file was provided — this one's all on the environment. Classic."
            .to_string(),
    };

    config.extract().context(context_msg)
}
