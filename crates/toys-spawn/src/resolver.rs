//! Remote status resolution
//!
//! Translates the host's view of a sub-agent conversation into a job
//! [`Resolution`]. Anything short of an explicit answer from the host
//! (network errors, 5xx responses, garbled bodies) is reported as
//! [`ResolverUnavailable`]: "no information yet", never a job failure.

use toys_host::{ConversationState, HostPlatform};

/// What the host says about a job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Still has an open turn
    Running,
    /// Finished; carries the final assistant text
    Completed(String),
    /// The host reported an execution error
    Failed(String),
}

impl Resolution {
    /// Whether this observation ends the job
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl From<ConversationState> for Resolution {
    fn from(state: ConversationState) -> Self {
        match state {
            ConversationState::OpenTurn => Self::Running,
            ConversationState::FinalMessage(text) => Self::Completed(text),
            ConversationState::Error(error) => Self::Failed(error),
        }
    }
}

/// The host could not be asked; try again next round
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("status of {handle} unavailable: {reason}")]
pub struct ResolverUnavailable {
    pub handle: String,
    pub reason: String,
}

/// Source of remote job status
pub trait Resolver {
    /// Query the latest state of the conversation behind `remote_handle`.
    fn resolve(&self, remote_handle: &str) -> Result<Resolution, ResolverUnavailable>;
}

impl<R: Resolver + ?Sized> Resolver for &R {
    fn resolve(&self, remote_handle: &str) -> Result<Resolution, ResolverUnavailable> {
        (**self).resolve(remote_handle)
    }
}

/// [`Resolver`] backed by a host platform
#[derive(Debug, Clone)]
pub struct HostResolver<H> {
    host: H,
}

impl<H: HostPlatform> HostResolver<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }
}

impl<H: HostPlatform> Resolver for HostResolver<H> {
    fn resolve(&self, remote_handle: &str) -> Result<Resolution, ResolverUnavailable> {
        match self.host.conversation_state(remote_handle) {
            Ok(state) => Ok(state.into()),
            Err(e) => {
                tracing::warn!(handle = %remote_handle, error = %e, "status query failed");
                Err(ResolverUnavailable {
                    handle: remote_handle.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
