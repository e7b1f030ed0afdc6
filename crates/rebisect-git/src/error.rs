//! Error types for git operations.
//!
//! [`GitError`] is the single error type returned by all [`GitRepo`](crate::GitRepo) trait
//! methods. Callers match on [`GitError::MergeConflict`] to enter conflict
//! handling; every other variant is treated as fatal by the engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`GitRepo`](crate::GitRepo) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// A requested object, ref, or revision range was not found.
    #[error("not found: {message}")]
    NotFound {
        /// Human-readable description of what was missing.
        message: String,
    },

    /// A ref could not be created because it already exists.
    #[error("ref conflict on `{ref_name}`: {message}")]
    RefConflict {
        /// The ref that could not be created.
        ref_name: String,
        /// Details about the clash.
        message: String,
    },

    /// An operation was refused because the working tree has uncommitted changes.
    #[error("dirty worktree at {}: {message}", path.display())]
    DirtyWorktree {
        /// Path to the worktree root.
        path: PathBuf,
        /// What was dirty.
        message: String,
    },

    /// An OID string could not be parsed or was otherwise invalid.
    #[error("invalid OID `{value}`: {reason}")]
    InvalidOid {
        /// The raw value that failed validation.
        value: String,
        /// Why validation failed.
        reason: String,
    },

    /// An I/O error occurred (file system, process spawn, etc.).
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// A cherry-pick or revert stopped on conflicts. The operation is still
    /// in progress in the working tree.
    #[error("merge conflict: {message}")]
    MergeConflict {
        /// Output of the failing git command.
        message: String,
    },

    /// A git subprocess exited unsuccessfully for a reason other than a
    /// conflict.
    #[error("`{command}` failed (exit {}): {stderr}", exit_code.map_or_else(|| "signal".to_owned(), |c| c.to_string()))]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Captured stderr, trimmed.
        stderr: String,
        /// Process exit code, `None` if killed by a signal.
        exit_code: Option<i32>,
    },

    /// The gix backend returned an unclassified error.
    #[error("git backend error: {message}")]
    BackendError {
        /// Freeform error description from the backend.
        message: String,
    },
}
