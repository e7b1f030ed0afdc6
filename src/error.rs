//! Engine error type.
//!
//! Every variant except [`Error::Stopped`] means the run cannot be trusted to
//! continue. `Stopped` is the operator's own cancellation; the partially built
//! branch is left in place for inspection.

use rebisect_git::{GitError, GitOid};
use thiserror::Error;

use crate::config::ConfigError;

/// Convenience alias used throughout the engine.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors surfaced by the reconciliation engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A git operation failed outside the conflict protocol.
    #[error(transparent)]
    Git(#[from] GitError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A patch-set range could not be resolved. Raised before any mutation.
    #[error("bad revision range `{range}`: {source}")]
    BadRange {
        /// The range that was requested.
        range: String,
        /// Underlying git failure.
        #[source]
        source: GitError,
    },

    /// The bisection branch already exists.
    #[error("branch `{name}` already exists; delete it or pick other versions")]
    BranchExists {
        /// Branch name.
        name: String,
    },

    /// The planner produced a disposition the filter cannot trial.
    #[error("internal consistency error: {0}")]
    Internal(String),

    /// The scratch checkout could not be returned to a clean state.
    #[error("scratch checkout at {path} could not be reset: {source}")]
    ScratchReset {
        /// Scratch worktree path.
        path: String,
        /// Underlying git failure.
        #[source]
        source: GitError,
    },

    /// The operator chose to stop at a conflict.
    #[error("stopped by operator while applying {oid} ({title})")]
    Stopped {
        /// Commit whose application conflicted.
        oid: GitOid,
        /// Its subject.
        title: String,
    },

    /// The closure commit did not make the tree identical to the target.
    #[error("tree still differs from `{target}` after the closure commit")]
    ClosureMismatch {
        /// The target ref.
        target: String,
    },

    /// The external build verifier could not be run.
    #[error("build verifier failed to run: {0}")]
    Verifier(String),
}
