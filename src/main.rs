//! CLI entry point for the albumcache tool.

use std::process::ExitCode;

mod app;
mod app_config;
mod cli;
mod output;

/// Process outcome, mapped to the exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProcessExit {
    /// The command succeeded.
    Success,
    /// The command failed.
    Failure,
    /// The same operation is already running; retry later (`EX_TEMPFAIL`).
    Busy,
}

impl ProcessExit {
    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
            Self::Busy => 75,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match app::runtime::run_albumcache().await {
        Ok(exit) => ExitCode::from(exit.code()),
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(ProcessExit::Failure.code())
        }
    }
}
