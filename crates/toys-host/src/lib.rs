//! Host platform integration for Shelley power toys
//!
//! The host platform owns sub-agent conversations. This crate defines the
//! [`HostPlatform`] contract the rest of the workspace programs against and
//! a blocking HTTP implementation, [`ShelleyClient`], for the Shelley API:
//!
//! - create a conversation seeded with a task
//! - read a conversation's current state (open turn, final message, error)

pub mod client;
pub mod error;
pub mod platform;
pub mod types;

pub use client::{DEFAULT_API_BASE, DEFAULT_USER_ID, HostConfig, ShelleyClient};
pub use error::{HostError, Result};
pub use platform::HostPlatform;
pub use types::{ConversationSnapshot, ConversationState, LaunchRequest};
