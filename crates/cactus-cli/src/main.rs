//! 🚀 cactus-cli — the front door, the bouncer, the maitre d' of the cactus stand.
//!
//! 📦 Thin wrapper: set up logging, parse args, load config, call into `cactus`,
//! print what the library hands back. Like a manager. 🦆

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cactus::error::CactusError;
use cactus::report::{ReportFormat, render, status_line};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

// 🔧 default: the ol' reliable, used only if it actually exists
const DEFAULT_CONFIG_FILE: &str = "cactus.toml";

#[derive(Debug, Parser)]
#[command(
    name = "cactus-cli",
    about = "🌵 Bulk-load synthetic cactus sales into Elasticsearch and report monthly totals"
)]
struct Cli {
    /// 📋 TOML config file. Defaults to ./cactus.toml when present; CACTUS_* env vars always apply.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 🚚 Create the index and bulk-load a fresh synthetic dataset
    Load,
    /// 📊 Print total sales per month
    Report {
        /// 🎨 Overrides `report.format` from the config
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Lines,
    Table,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Lines => ReportFormat::Lines,
            FormatArg::Table => ReportFormat::Table,
        }
    }
}

/// 🚀 main() — where it all begins.
///
/// 🔧 Steps:
/// 1. Init tracing (so we can see what goes wrong, and when)
/// 2. Parse args
/// 3. Load config
/// 4. Run the thing
/// 5. Handle errors (cry, then exit 1)
#[tokio::main]
async fn main() -> Result<()> {
    // 📡 Set up tracing — because println! debugging is a lifestyle choice
    // we're trying to move past. println! is reserved for the actual product output below.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!("💀 error: {}", err);
        // 🧅 peel the onion of sadness, one tear-jerking layer at a time
        let mut the_vibes_are_giving_connection_issues = false;
        for cause in err.chain() {
            if matches!(
                cause.downcast_ref::<CactusError>(),
                Some(CactusError::Connection { .. })
            ) {
                the_vibes_are_giving_connection_issues = true;
            }
            let cause_str = cause.to_string();
            if cause_str.contains("error sending request")
                || cause_str.contains("onnection refused")
                || cause_str.contains("tcp connect error")
                || cause_str.contains("dns error")
            {
                the_vibes_are_giving_connection_issues = true;
            }
        }
        for cause in err.chain().skip(1) {
            error!("⚠️  cause: {}", cause);
        }

        if the_vibes_are_giving_connection_issues {
            error!(
                "🔧 hint: looks like Elasticsearch isn't reachable. \
                Check `elasticsearch.url` (or CACTUS_ELASTICSEARCH__URL) and that the cluster is up. \
                If you're using Docker, `docker ps` will tell you who's awake. ☕"
            );
        }

        // 🗑️ Exit with prejudice.
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let config_file = resolve_config_file(cli.config.as_deref())?;
    let mut app_config = cactus::app_config::load_config(config_file.as_deref())
        .context("💀 In cactus-cli we couldn't load the config. Take a look at the file and the CACTUS_* env vars.")?;

    match cli.command {
        Command::Load => {
            let report = cactus::run_load(&app_config).await?;
            println!("{}", status_line(&report));
        }
        Command::Report { format } => {
            if let Some(format) = format {
                app_config.report.format = format.into();
            }
            let buckets = cactus::run_report(&app_config).await?;
            let rendered = render(&buckets, app_config.report.format);
            if !rendered.is_empty() {
                println!("{rendered}");
            }
        }
    }
    Ok(())
}

/// 🔒 An explicit `--config` must exist. No `--config` → `cactus.toml` if it's there, env only if not.
fn resolve_config_file(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let exists = path.try_exists().with_context(|| {
                format!(
                    "💀 Couldn't check whether the config file exists. Was checking here: '{}'",
                    path.display()
                )
            })?;
            if !exists {
                anyhow::bail!(
                    "💀 Configuration file '{}' does not exist. Relative paths are relative to the current directory; an absolute path removes all doubt.",
                    path.display()
                );
            }
            Ok(Some(path.to_path_buf()))
        }
        None => {
            let fallback = Path::new(DEFAULT_CONFIG_FILE);
            Ok(fallback.is_file().then(|| fallback.to_path_buf()))
        }
    }
}
