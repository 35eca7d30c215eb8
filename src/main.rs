use anyhow::{bail, Result};
use clap::Parser;
use patternedge::cli::Cli;
use patternedge::config::{AppConfig, LoggingConfig};
use patternedge::coordinator::StatisticalDecisionManager;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let read_only = cli.command.is_read_only();

    let mut app = AppConfig::load_from(&cli.config_dir)?;
    if let Some(dir) = &cli.data_dir {
        app.storage.data_dir = dir.clone();
    }

    if read_only {
        init_logging_simple();
    } else {
        init_logging(&app.logging);
    }

    if let Err(errors) = app.validate() {
        for e in &errors {
            error!("config: {}", e);
        }
        bail!("invalid configuration ({} problems)", errors.len());
    }
    debug!(data_dir = %app.storage.data_dir.display(), "configuration loaded");

    let manager = StatisticalDecisionManager::open(&app.storage, app.statistics.clone()).await;
    let result = cli.command.run(&manager).await;

    if !read_only {
        manager.close().await?;
    }
    result
}

fn init_logging(cfg: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},patternedge=debug", cfg.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let _ = if cfg.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn init_logging_simple() {
    // Minimal logging for read-only commands
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .try_init();
}
