//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Resolve remote albums into locally cached covers and documents.
///
/// Covers and documents are cached under the base directory and reused on
/// later requests. Concurrent requests for the same album are rejected as
/// busy instead of fetching twice.
#[derive(Parser, Debug)]
#[command(name = "albumcache")]
#[command(author, version, about)]
pub struct Cli {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Cache root holding picture/ and pdf/
    #[arg(long, value_name = "DIR", global = true)]
    pub base_dir: Option<PathBuf>,

    /// Base URL of the remote gateway
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Maximum concurrent bulk downloads (1-16)
    #[arg(long, global = true, value_parser = clap::value_parser!(u8).range(1..=16))]
    pub workers: Option<u8>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Show an album and cache its cover
    Info {
        /// Album id
        id: String,
    },

    /// Download an album's compiled document and print its path
    Download {
        /// Album id
        id: String,
    },

    /// Show the N-th keyword search result
    #[command(override_usage = "albumcache search <KEYWORD>... <ORDINAL>")]
    Search {
        /// One or more keywords followed by a 1-based ordinal
        #[arg(required = true, num_args = 2.., value_name = "KEYWORD... ORDINAL", allow_hyphen_values = true)]
        terms: Vec<String>,
    },

    /// Show an author's N-th work, newest first
    #[command(override_usage = "albumcache author <NAME>... <ORDINAL>")]
    Author {
        /// Author name words followed by a 1-based ordinal
        #[arg(required = true, num_args = 2.., value_name = "NAME... ORDINAL", allow_hyphen_values = true)]
        terms: Vec<String>,
    },

    /// Show a random album from this month's ranking
    Recommend,
}

/// Splits `terms` into leading words and the trailing ordinal text.
#[must_use]
pub fn split_ordinal(terms: &[String]) -> Option<(&[String], &str)> {
    let (ordinal, words) = terms.split_last()?;
    if words.is_empty() {
        return None;
    }
    Some((words, ordinal.as_str()))
}
