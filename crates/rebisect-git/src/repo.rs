//! The [`GitRepo`] trait: the single boundary between the
//! reconciliation engine and git.
//!
//! Method groups:
//!
//! | Group      | Methods                                                         |
//! |------------|-----------------------------------------------------------------|
//! | Read       | `rev_parse`, `read_commit`, `list_commits`, `show_patch`        |
//! | Refs       | `checkout`, `create_branch`, `fetch`, `reset_hard`              |
//! | Sequencer  | `cherry_pick`, `revert`, `abort_in_progress`, `continue_in_progress` |
//! | Status     | `status`, `is_resolved`                                         |
//! | Diff       | `diff`, `apply_patch`                                           |
//! | Commit     | `commit_all`, `squash_last`                                     |
//! | Worktrees  | `worktree_add`, `worktree_remove`                               |

use std::path::Path;

use crate::error::GitError;
use crate::types::{CommitInfo, GitOid, StatusEntry, StepOutcome};

/// The git capability trait used by the engine.
///
/// Every call is blocking and operates on the working tree returned by
/// [`workdir`](Self::workdir). Implementations must leave no hidden state
/// behind between calls other than what git itself records (HEAD, index,
/// in-progress sequencer state).
///
/// # Object safety
///
/// This trait is object-safe: callers may use `&dyn GitRepo`.
pub trait GitRepo {
    /// Root of the working tree this handle operates on.
    fn workdir(&self) -> &Path;

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Resolve a revision specification to a commit OID.
    ///
    /// Returns [`GitError::NotFound`] if the spec cannot be resolved.
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError>;

    /// Read a commit object's metadata.
    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError>;

    /// List the commits of a revision range (e.g. `"v5.19..topic"`), oldest
    /// first.
    ///
    /// Replaces: `git rev-list --reverse <range>`.
    fn list_commits(&self, range: &str) -> Result<Vec<GitOid>, GitError>;

    /// The diff a commit introduces, without the commit header.
    ///
    /// Replaces: `git show --format= --no-color <oid>`.
    fn show_patch(&self, oid: GitOid) -> Result<String, GitError>;

    /// Subject line of a commit.
    fn commit_subject(&self, oid: GitOid) -> Result<String, GitError> {
        Ok(self.read_commit(oid)?.subject().to_owned())
    }

    /// Full message of a commit.
    fn commit_message(&self, oid: GitOid) -> Result<String, GitError> {
        Ok(self.read_commit(oid)?.message)
    }

    /// `true` if the commit has more than one parent.
    fn is_merge(&self, oid: GitOid) -> Result<bool, GitError> {
        Ok(self.read_commit(oid)?.is_merge())
    }

    // -----------------------------------------------------------------------
    // Refs and HEAD
    // -----------------------------------------------------------------------

    /// Check out a branch or detach at a revision.
    fn checkout(&self, spec: &str) -> Result<(), GitError>;

    /// Create branch `name` at `start`. Fails with [`GitError::RefConflict`]
    /// if the branch already exists.
    fn create_branch(&self, name: &str, start: &str) -> Result<(), GitError>;

    /// Fetch a remote.
    fn fetch(&self, remote: &str) -> Result<(), GitError>;

    /// Move HEAD, index and working tree to `spec`, discarding changes.
    fn reset_hard(&self, spec: &str) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Sequencer
    // -----------------------------------------------------------------------

    /// Cherry-pick a single commit onto HEAD.
    ///
    /// An empty result is reported as [`StepOutcome::Empty`] with the
    /// sequencer state already cleaned up. Conflicts are reported as
    /// [`GitError::MergeConflict`] with the cherry-pick left in progress.
    fn cherry_pick(&self, oid: GitOid) -> Result<StepOutcome, GitError>;

    /// Revert a single commit on top of HEAD. Same outcome contract as
    /// [`cherry_pick`](Self::cherry_pick).
    fn revert(&self, oid: GitOid) -> Result<StepOutcome, GitError>;

    /// Abort whatever cherry-pick or revert is in progress. No-op when none is.
    fn abort_in_progress(&self) -> Result<(), GitError>;

    /// Commit the resolution of the in-progress cherry-pick or revert.
    ///
    /// The caller must have checked [`is_resolved`](Self::is_resolved).
    fn continue_in_progress(&self) -> Result<StepOutcome, GitError>;

    // -----------------------------------------------------------------------
    // Status
    // -----------------------------------------------------------------------

    /// Tracked paths with changes, in porcelain encoding.
    ///
    /// Replaces: `git status --porcelain --untracked-files=no`.
    fn status(&self) -> Result<Vec<StatusEntry>, GitError>;

    /// `true` when no path has unstaged changes or unresolved conflicts.
    fn is_resolved(&self) -> Result<bool, GitError> {
        Ok(self.status()?.iter().all(StatusEntry::is_resolved))
    }

    // -----------------------------------------------------------------------
    // Diff
    // -----------------------------------------------------------------------

    /// Binary-safe diff text for a range or pair of revisions.
    ///
    /// Replaces: `git diff --binary <range>`.
    fn diff(&self, range: &str) -> Result<String, GitError>;

    /// Apply diff text to both index and working tree.
    ///
    /// Replaces: `git apply -p1 --index --binary`.
    fn apply_patch(&self, patch: &str) -> Result<(), GitError>;

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Stage everything and commit with `message`. Returns
    /// [`StepOutcome::Empty`] without committing when nothing changed.
    fn commit_all(&self, message: &str) -> Result<StepOutcome, GitError>;

    /// Replace the last `n` commits with a single commit carrying `message`.
    /// If the commits cancel out, HEAD ends at `HEAD~n` and
    /// [`StepOutcome::Empty`] is returned.
    fn squash_last(&self, n: usize, message: &str) -> Result<StepOutcome, GitError>;

    // -----------------------------------------------------------------------
    // Worktrees
    // -----------------------------------------------------------------------

    /// Create a linked worktree at `path` with HEAD detached at `target`.
    ///
    /// Replaces: `git worktree add --detach <path> <target>`.
    fn worktree_add(&self, path: &Path, target: GitOid) -> Result<(), GitError>;

    /// Remove a linked worktree and prune its administrative files.
    fn worktree_remove(&self, path: &Path) -> Result<(), GitError>;
}
