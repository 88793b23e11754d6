//! Shared test utilities for the power-toys workspace.
//!
//! This crate provides standardised test fixtures so crate test suites do
//! not each reinvent a host platform. It is a dev-dependency only, never
//! published.
//!
//! # Modules
//!
//! - [`host`]: [`FakeHost`], an in-memory host platform with scripted
//!   conversation states
//! - [`ledger`]: [`TestLedger`], a scratch directory holding a ledger path

pub mod host;
pub mod ledger;

pub use host::{FakeHost, Poll};
pub use ledger::TestLedger;
