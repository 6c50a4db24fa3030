use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use soflu::config::AppConfig;
use soflu::logging::{init_logging_with_options, log_build_summary, log_configuration_status, log_content_layout};
use soflu::state::AppState;
use soflu::watcher::ContentWatcher;

#[derive(Parser, Debug)]
#[command(author, version, about = "Builds and inspects SoFlu content manifests", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Content root, overrides the configuration file
    #[arg(long, global = true)]
    content_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Regenerate every category manifest and the category index
    Scan {
        /// Keep running and rebuild whenever the content tree changes
        #[arg(long)]
        watch: bool,
    },
    /// List available categories
    Categories,
    /// List display items of a category
    Items { category: String },
    /// Print the compiled route table
    Routes,
    /// Show which route renders a path
    Resolve { path: String },
    /// Print the breadcrumb trail for a path
    Breadcrumbs { path: String },
    /// Write the effective configuration to a file
    InitConfig { file: PathBuf },
}

fn load_config(cli: &Cli) -> anyhow::Result<(AppConfig, Option<PathBuf>)> {
    let path = cli
        .config
        .clone()
        .or_else(|| Some(AppConfig::default_config_path()).filter(|path| path.exists()));

    let mut config = match &path {
        Some(path) if path.exists() => AppConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        _ => AppConfig::default(),
    };

    if let Some(content_dir) = &cli.content_dir {
        config.content.root = content_dir.to_string_lossy().to_string();
    }

    Ok((config, path))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

async fn scan(state: &AppState, watch: bool) -> anyhow::Result<()> {
    let builder = state.manifest_builder();
    let summary = builder.build_all().await.context("Failed to build manifests")?;
    log_build_summary(&summary);

    if !watch {
        if !summary.errors.is_empty() {
            warn!("{} categories failed, see errors above", summary.errors.len());
        }
        return Ok(());
    }

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
        }
        signal_token.cancel();
    });

    let watcher = ContentWatcher::new(state.config.content.clone(), &state.config.watcher);
    watcher
        .run(&builder, shutdown)
        .await
        .context("Content watcher failed")?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(&cli)?;

    let level = if cli.debug { "debug" } else { config.logging.level.as_str() };
    init_logging_with_options(Some(level), cli.debug).context("Failed to initialize logging")?;
    log_configuration_status(config_path.as_deref(), &config);

    if let Command::InitConfig { file } = &cli.command {
        config
            .save_to_file(file)
            .with_context(|| format!("Failed to write configuration to {}", file.display()))?;
        info!("Configuration written to {}", file.display());
        return Ok(());
    }

    let state = AppState::new(config);
    log_content_layout(&state.config.content);

    match &cli.command {
        Command::Scan { watch } => scan(&state, *watch).await?,
        Command::Categories => print_json(&state.content.get_available_categories().await)?,
        Command::Items { category } => {
            let items = state.content.scan_category(category).await;
            print_json(items.as_slice())?;
        }
        Command::Routes => print_json(&state.navigation.generate_routes().await)?,
        Command::Resolve { path } => {
            let routes = state.navigation.generate_routes().await;
            print_json(&routes.resolve(path))?;
        }
        Command::Breadcrumbs { path } => print_json(&state.navigation.get_breadcrumbs(path).await)?,
        Command::InitConfig { .. } => {}
    }

    Ok(())
}
