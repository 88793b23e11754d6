//! Sub-agent job orchestration for Shelley power toys
//!
//! This crate tracks sub-agent tasks launched on a Shelley host, implementing:
//!
//! - **Job ledger**: a locked, atomically replaced TOML file recording every job
//! - **Status resolution**: mapping remote conversation state to job status
//! - **Launcher**: create a remote conversation, then record a pending job
//! - **Wait engine**: poll until all or any jobs resolve, with a deadline
//!
//! # Architecture
//!
//! ```text
//!                 toys-cli
//!                    |
//!                toys-spawn
//!                    |
//!           +--------+--------+
//!           |                 |
//!        toys-fs          toys-host
//! ```
//!
//! Every operation is a short-lived call. The ledger is the only shared
//! state, and its lock is never held across a network request.

pub mod clock;
pub mod error;
pub mod job;
pub mod launcher;
pub mod ledger;
pub mod refresh;
pub mod resolver;
pub mod settings;
pub mod wait;

pub use clock::{CancelFlag, Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use job::{Job, JobStatus};
pub use launcher::{LaunchOptions, SpawnLauncher};
pub use ledger::{JobLedger, MIN_PREFIX_LEN};
pub use refresh::{Freshness, JobView, refresh_all, refresh_job};
pub use resolver::{HostResolver, Resolution, Resolver, ResolverUnavailable};
pub use settings::{DEFAULT_MODEL, SpawnSettings};
pub use wait::{
    JobOutcome, Outcome, WaitEnd, WaitEngine, WaitMode, WaitOptions, WaitReport,
    DEFAULT_POLL_INTERVAL, MAX_POLL_INTERVAL, MIN_POLL_INTERVAL,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_id_lists_match_count() {
        let error = Error::AmbiguousId {
            prefix: "abcd".into(),
            matches: vec!["abcd-1".into(), "abcd-2".into()],
        };

        let display = error.to_string();
        assert!(display.contains("abcd"), "got: {}", display);
        assert!(display.contains("2 matches"), "got: {}", display);
        assert!(error.is_user_error());
    }
}
