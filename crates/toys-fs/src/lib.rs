//! Filesystem primitives for Shelley power toys
//!
//! Provides atomic replacement of state files, advisory lock files with
//! bounded acquisition, and format-aware loading of configuration.

pub mod config;
pub mod error;
pub mod io;
pub mod lock;

pub use config::ConfigStore;
pub use error::{Error, Result};
pub use io::RobustnessConfig;
pub use lock::{FileLock, LockMode};
