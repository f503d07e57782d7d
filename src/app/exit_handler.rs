//! Exit code logic for the archiver process.
//!
//! Single responsibility: map download counts to the process exit outcome.

use crate::ProcessExit;

/// Determines the process exit outcome from downloaded and failed counts.
pub(crate) fn determine_exit_outcome(downloaded: usize, failed: usize) -> ProcessExit {
    if failed == 0 {
        ProcessExit::Success
    } else if downloaded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}
