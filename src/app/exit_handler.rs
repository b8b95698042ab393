//! Exit code logic for the albumcache process.
//!
//! Single responsibility: map a command failure to the process exit outcome.

use albumcache_core::ServiceError;

use crate::ProcessExit;

/// Determines the process exit outcome for a failed command.
///
/// A busy rejection is a temporary failure the caller should retry; every
/// other error is a plain failure.
pub(crate) fn determine_exit_outcome(error: &anyhow::Error) -> ProcessExit {
    match error.downcast_ref::<ServiceError>() {
        Some(service_error) if service_error.is_retryable() => ProcessExit::Busy,
        _ => ProcessExit::Failure,
    }
}
