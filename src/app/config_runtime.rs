//! Merges CLI flags, file config and built-in defaults into runtime settings.
//!
//! Precedence is command-line flag > config file > default.

use std::path::PathBuf;

use albumcache_core::client::{DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_READ_TIMEOUT_SECS};
use albumcache_core::{DEFAULT_KEYWORD_MAX_PAGES, DEFAULT_WORKERS, ServiceOptions};

use crate::app_config::{FileConfig, VerbositySetting};
use crate::cli::Cli;

pub(crate) const DEFAULT_BASE_DIR: &str = ".";
pub(crate) const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080/";

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RuntimeSettings {
    pub(crate) base_dir: PathBuf,
    pub(crate) api_base_url: String,
    pub(crate) download_workers: usize,
    pub(crate) keyword_max_pages: usize,
    pub(crate) connect_timeout_secs: u64,
    pub(crate) read_timeout_secs: u64,
    pub(crate) verbosity: VerbositySetting,
    /// True when -v/-q were given, so `RUST_LOG` is ignored.
    pub(crate) force_cli_log_level: bool,
}

impl RuntimeSettings {
    pub(crate) fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            download_workers: self.download_workers,
            keyword_max_pages: self.keyword_max_pages,
        }
    }

    pub(crate) fn is_quiet(&self) -> bool {
        self.verbosity == VerbositySetting::Quiet
    }
}

pub(crate) fn resolve_settings(cli: &Cli, file_config: Option<&FileConfig>) -> RuntimeSettings {
    let file = file_config.cloned().unwrap_or_default();
    let force_cli_log_level = cli.verbose > 0 || cli.quiet;

    let verbosity = if force_cli_log_level {
        cli_verbosity(cli.verbose, cli.quiet)
    } else {
        file.verbosity.unwrap_or(VerbositySetting::Default)
    };

    RuntimeSettings {
        base_dir: cli
            .base_dir
            .clone()
            .or(file.base_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_BASE_DIR)),
        api_base_url: cli
            .api_url
            .clone()
            .or(file.api_base_url)
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
        download_workers: cli
            .workers
            .map(usize::from)
            .or(file.download_workers)
            .unwrap_or(DEFAULT_WORKERS),
        keyword_max_pages: file.keyword_max_pages.unwrap_or(DEFAULT_KEYWORD_MAX_PAGES),
        connect_timeout_secs: file
            .connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        read_timeout_secs: file.read_timeout_secs.unwrap_or(DEFAULT_READ_TIMEOUT_SECS),
        verbosity,
        force_cli_log_level,
    }
}

fn cli_verbosity(verbose: u8, quiet: bool) -> VerbositySetting {
    if quiet {
        VerbositySetting::Quiet
    } else if verbose == 1 {
        VerbositySetting::Verbose
    } else if verbose > 1 {
        VerbositySetting::Debug
    } else {
        VerbositySetting::Default
    }
}

pub(crate) fn resolve_default_log_level(verbosity: VerbositySetting) -> &'static str {
    match verbosity {
        VerbositySetting::Default => "info",
        VerbositySetting::Verbose => "debug",
        VerbositySetting::Quiet => "error",
        VerbositySetting::Debug => "trace",
    }
}
