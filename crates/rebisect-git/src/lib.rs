//! Git capability layer for rebisect.
//!
//! This crate defines the [`GitRepo`] trait, the narrow interface through
//! which the reconciliation engine touches a repository. The engine never
//! spawns git or opens a gix repository itself; it programs against the trait
//! so tests and embeddings can substitute their own backend.
//!
//! # Crate layout
//!
//! - [`repo`]: the [`GitRepo`] trait definition.
//! - [`types`]: value types used in trait signatures ([`GitOid`],
//!   [`CommitInfo`], [`StatusEntry`], [`StepOutcome`]).
//! - [`error`]: the [`GitError`] enum returned by all trait methods.

pub mod error;
pub mod repo;
pub mod types;

// CLI + gix backed implementation modules
mod exec;
mod git_cli;
mod objects_impl;
mod sequencer_impl;
mod status_impl;
mod diff_impl;
mod worktree_impl;

pub use git_cli::GitCli;

pub use error::GitError;
pub use repo::GitRepo;
pub use types::{CommitInfo, GitOid, OidParseError, StatusEntry, StepOutcome};
