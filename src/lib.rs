//! rebisect library crate.
//!
//! Reconciles two versions of a downstream patch set rebased onto different
//! upstream tags, and builds a branch that walks from the old tip to the new
//! tip one buildable commit at a time. The `rebisect` binary in
//! `crates/rebisect-cli` is the primary interface.

pub mod apply;
pub mod config;
pub mod disposition;
pub mod error;
pub mod fingerprint;
pub mod noop;
pub mod patchset;
pub mod plan;
pub mod resolve;
pub mod session;
pub mod walk;

pub use error::{Error, Result};
