//! The host platform contract

use crate::error::Result;
use crate::types::{ConversationState, LaunchRequest};

/// Operations the orchestrator needs from the host platform.
///
/// Implementations must not retain per-call state: every invocation of the
/// tool is a fresh process, so all durable state lives in the job ledger.
pub trait HostPlatform {
    /// Create a new isolated conversation seeded with the request's task.
    ///
    /// Returns the remote handle of the new conversation.
    fn create_conversation(&self, request: &LaunchRequest) -> Result<String>;

    /// Fetch the latest state of a conversation.
    fn conversation_state(&self, handle: &str) -> Result<ConversationState>;
}

impl<T: HostPlatform + ?Sized> HostPlatform for &T {
    fn create_conversation(&self, request: &LaunchRequest) -> Result<String> {
        (**self).create_conversation(request)
    }

    fn conversation_state(&self, handle: &str) -> Result<ConversationState> {
        (**self).conversation_state(handle)
    }
}

impl<T: HostPlatform + ?Sized> HostPlatform for Box<T> {
    fn create_conversation(&self, request: &LaunchRequest) -> Result<String> {
        (**self).create_conversation(request)
    }

    fn conversation_state(&self, handle: &str) -> Result<ConversationState> {
        (**self).conversation_state(handle)
    }
}
