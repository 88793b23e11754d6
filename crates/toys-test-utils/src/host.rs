//! [`FakeHost`]: an in-memory [`HostPlatform`] with scripted behaviour.
//!
//! Each conversation handle owns a queue of [`Poll`] results. Every state
//! query pops the front of the queue; the last entry repeats forever, so a
//! script of `[Open, Open, Final("42")]` resolves on the third poll and stays
//! resolved. Handles without a script report an open turn.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use toys_host::{ConversationState, HostError, HostPlatform, LaunchRequest, Result};

/// One scripted answer to a state query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Poll {
    /// The agent still has an open turn
    Open,
    /// The agent finished with this text
    Final(String),
    /// The host reports an execution error
    Error(String),
    /// The host cannot be reached
    Unreachable,
}

impl Poll {
    /// Shorthand for [`Poll::Final`]
    pub fn done(text: &str) -> Self {
        Self::Final(text.to_string())
    }
}

#[derive(Debug, Default)]
struct State {
    next_handle: u32,
    scripts: HashMap<String, VecDeque<Poll>>,
    polls: HashMap<String, usize>,
    launches: Vec<LaunchRequest>,
    reject_launches: Option<(u16, String)>,
    launches_unreachable: bool,
}

/// In-memory host platform
#[derive(Debug, Default)]
pub struct FakeHost {
    state: Mutex<State>,
}

impl FakeHost {
    /// A host that accepts every launch and reports open turns.
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every subsequent launch with the given HTTP status and body.
    pub fn reject_launches(&self, status: u16, body: &str) {
        self.state.lock().unwrap().reject_launches = Some((status, body.to_string()));
    }

    /// Make every subsequent launch fail as if the host were down.
    pub fn unreachable_launches(&self) {
        self.state.lock().unwrap().launches_unreachable = true;
    }

    /// Replace the script for `handle`.
    pub fn script(&self, handle: &str, polls: impl IntoIterator<Item = Poll>) {
        self.state
            .lock()
            .unwrap()
            .scripts
            .insert(handle.to_string(), polls.into_iter().collect());
    }

    /// Script `handle` to answer `poll` from now on.
    pub fn set(&self, handle: &str, poll: Poll) {
        self.script(handle, [poll]);
    }

    /// Number of state queries made for `handle`.
    pub fn polls(&self, handle: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .polls
            .get(handle)
            .copied()
            .unwrap_or(0)
    }

    /// Every accepted launch request, in order.
    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.state.lock().unwrap().launches.clone()
    }
}

impl HostPlatform for FakeHost {
    fn create_conversation(&self, request: &LaunchRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if state.launches_unreachable {
            return Err(HostError::Unavailable {
                message: "connection refused".to_string(),
            });
        }
        if let Some((status, body)) = state.reject_launches.clone() {
            return Err(HostError::Rejected { status, body });
        }

        state.next_handle += 1;
        let handle = format!("c{:07}", state.next_handle);
        state.launches.push(request.clone());
        Ok(handle)
    }

    fn conversation_state(&self, handle: &str) -> Result<ConversationState> {
        let mut state = self.state.lock().unwrap();
        *state.polls.entry(handle.to_string()).or_insert(0) += 1;

        let poll = match state.scripts.get_mut(handle) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or(Poll::Open),
            Some(queue) => queue.front().cloned().unwrap_or(Poll::Open),
            None => Poll::Open,
        };

        match poll {
            Poll::Open => Ok(ConversationState::OpenTurn),
            Poll::Final(text) => Ok(ConversationState::FinalMessage(text)),
            Poll::Error(text) => Ok(ConversationState::Error(text)),
            Poll::Unreachable => Err(HostError::Unavailable {
                message: "connection refused".to_string(),
            }),
        }
    }
}
