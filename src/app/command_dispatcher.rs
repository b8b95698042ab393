//! CLI command routing: runs info, download, search, author and recommend.
//!
//! Each handler calls one caller-facing service operation and returns the
//! text to print on stdout. Errors are returned unchanged so the exit
//! handler can tell a busy rejection from a plain failure.

use std::io::{self, IsTerminal};

use albumcache_core::{AlbumService, parse_ordinal};
use anyhow::{Result, bail};
use tracing::debug;

use crate::app::config_runtime::RuntimeSettings;
use crate::app::{progress_manager, terminal};
use crate::cli::{Command, split_ordinal};
use crate::output;

/// Runs `command` and returns its stdout text.
pub(crate) async fn dispatch(
    command: &Command,
    service: &AlbumService,
    settings: &RuntimeSettings,
) -> Result<String> {
    debug!(?command, "dispatching command");
    match command {
        Command::Info { id } => {
            let summary = service.resolve_by_id(id).await?;
            Ok(output::format_summary(&summary))
        }
        Command::Download { id } => {
            let use_spinner = terminal::should_use_spinner(
                io::stderr().is_terminal(),
                settings.is_quiet(),
                terminal::is_dumb_terminal(),
            );
            let (handle, stop) = progress_manager::spawn_progress_ui(use_spinner, id.clone());
            let outcome = service.resolve_document(id).await;
            progress_manager::stop_progress_ui(handle, &stop).await;
            Ok(output::format_document(&outcome?))
        }
        Command::Search { terms } => {
            let Some((keywords, raw_ordinal)) = split_ordinal(terms) else {
                bail!("search needs at least one keyword and an ordinal");
            };
            let ordinal = parse_ordinal(raw_ordinal)?;
            let summary = service.select_nth_by_keyword(keywords, ordinal).await?;
            Ok(output::format_summary(&summary))
        }
        Command::Author { terms } => {
            let Some((name_parts, raw_ordinal)) = split_ordinal(terms) else {
                bail!("author needs a name and an ordinal");
            };
            let ordinal = parse_ordinal(raw_ordinal)?;
            let author = name_parts.join(" ");
            let summary = service.select_nth_by_author(&author, ordinal).await?;
            Ok(output::format_author_summary(&author, &summary))
        }
        Command::Recommend => {
            let summary = service.recommend_random().await?;
            Ok(output::format_summary(&summary))
        }
    }
}
