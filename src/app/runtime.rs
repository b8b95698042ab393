use std::sync::Arc;

use albumcache_core::{AlbumService, ArtifactStore, GatewayClient, RemoteClient};
use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{command_dispatcher, config_runtime, exit_handler, terminal};
use crate::app_config::load_file_config;
use crate::cli::Cli;

pub(crate) async fn run_albumcache() -> Result<ProcessExit> {
    // Parse before tracing so --help works without logs
    let cli = Cli::parse();

    let loaded = load_file_config(cli.config.as_deref())?;
    let settings = config_runtime::resolve_settings(&cli, loaded.config.as_ref());

    let default_level = config_runtime::resolve_default_log_level(settings.verbosity);
    let no_color = terminal::should_disable_color(
        terminal::no_color_env_requested(),
        terminal::is_dumb_terminal(),
    );
    terminal::init_tracing(default_level, settings.force_cli_log_level, no_color);

    debug!(
        config_path = ?loaded.path,
        config_loaded = loaded.config.is_some(),
        verbosity = settings.verbosity.as_str(),
        "configuration resolved"
    );
    info!(
        base_dir = %settings.base_dir.display(),
        api = %settings.api_base_url,
        workers = settings.download_workers,
        "albumcache starting"
    );

    let client: Arc<dyn RemoteClient> = Arc::new(
        GatewayClient::with_timeouts(
            &settings.api_base_url,
            settings.connect_timeout_secs,
            settings.read_timeout_secs,
        )
        .with_context(|| format!("Invalid gateway URL '{}'", settings.api_base_url))?,
    );
    let service = AlbumService::new(
        client,
        ArtifactStore::new(settings.base_dir.clone()),
        settings.service_options(),
    )?;

    match command_dispatcher::dispatch(&cli.command, &service, &settings).await {
        Ok(text) => {
            println!("{text}");
            Ok(ProcessExit::Success)
        }
        Err(error) => {
            let exit = exit_handler::determine_exit_outcome(&error);
            if exit == ProcessExit::Busy {
                info!("request rejected as busy");
            } else {
                warn!(error = %error, "command failed");
            }
            eprintln!("Error: {error}");
            Ok(exit)
        }
    }
}
