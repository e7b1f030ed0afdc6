//! The default implementation of [`GitRepo`].
//!
//! Object reads go through [gix](https://github.com/GitoxideLabs/gitoxide);
//! everything that mutates HEAD, the index, or the working tree shells out to
//! the `git` binary, because cherry-pick, revert, and `apply` semantics must
//! match what an operator sees when resolving conflicts by hand.

use std::path::{Path, PathBuf};

use crate::error::GitError;
use crate::repo::GitRepo;
use crate::types::{CommitInfo, GitOid, StatusEntry, StepOutcome};

/// A [`GitRepo`] bound to one working tree.
///
/// Construct via [`GitCli::open`].
pub struct GitCli {
    pub(crate) repo: gix::Repository,
    pub(crate) workdir: PathBuf,
}

impl GitCli {
    /// Open the git repository whose working tree is at or above `path`.
    ///
    /// Linked worktrees are supported; the handle operates on the worktree
    /// that contains `path`.
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = gix::open(path).map_err(|e| GitError::BackendError {
            message: format!("open {}: {e}", path.display()),
        })?;
        let workdir = repo
            .workdir()
            .map(Path::to_path_buf)
            .ok_or_else(|| GitError::NotFound {
                message: format!("{} is a bare repository", path.display()),
            })?;
        Ok(Self { repo, workdir })
    }
}

impl GitRepo for GitCli {
    fn workdir(&self) -> &Path {
        &self.workdir
    }

    // === Read ===
    fn rev_parse(&self, spec: &str) -> Result<GitOid, GitError> {
        crate::objects_impl::rev_parse(self, spec)
    }

    fn read_commit(&self, oid: GitOid) -> Result<CommitInfo, GitError> {
        crate::objects_impl::read_commit(self, oid)
    }

    fn list_commits(&self, range: &str) -> Result<Vec<GitOid>, GitError> {
        crate::objects_impl::list_commits(self, range)
    }

    fn show_patch(&self, oid: GitOid) -> Result<String, GitError> {
        crate::diff_impl::show_patch(self, oid)
    }

    // === Refs and HEAD ===
    fn checkout(&self, spec: &str) -> Result<(), GitError> {
        crate::worktree_impl::checkout(self, spec)
    }

    fn create_branch(&self, name: &str, start: &str) -> Result<(), GitError> {
        crate::worktree_impl::create_branch(self, name, start)
    }

    fn fetch(&self, remote: &str) -> Result<(), GitError> {
        crate::worktree_impl::fetch(self, remote)
    }

    fn reset_hard(&self, spec: &str) -> Result<(), GitError> {
        crate::sequencer_impl::reset_hard(self, spec)
    }

    // === Sequencer ===
    fn cherry_pick(&self, oid: GitOid) -> Result<StepOutcome, GitError> {
        crate::sequencer_impl::cherry_pick(self, oid)
    }

    fn revert(&self, oid: GitOid) -> Result<StepOutcome, GitError> {
        crate::sequencer_impl::revert(self, oid)
    }

    fn abort_in_progress(&self) -> Result<(), GitError> {
        crate::sequencer_impl::abort_in_progress(self)
    }

    fn continue_in_progress(&self) -> Result<StepOutcome, GitError> {
        crate::sequencer_impl::continue_in_progress(self)
    }

    // === Status ===
    fn status(&self) -> Result<Vec<StatusEntry>, GitError> {
        crate::status_impl::status(self)
    }

    // === Diff ===
    fn diff(&self, range: &str) -> Result<String, GitError> {
        crate::diff_impl::diff(self, range)
    }

    fn apply_patch(&self, patch: &str) -> Result<(), GitError> {
        crate::diff_impl::apply_patch(self, patch)
    }

    // === Commit ===
    fn commit_all(&self, message: &str) -> Result<StepOutcome, GitError> {
        crate::sequencer_impl::commit_all(self, message)
    }

    fn squash_last(&self, n: usize, message: &str) -> Result<StepOutcome, GitError> {
        crate::sequencer_impl::squash_last(self, n, message)
    }

    // === Worktrees ===
    fn worktree_add(&self, path: &Path, target: GitOid) -> Result<(), GitError> {
        crate::worktree_impl::worktree_add(self, path, target)
    }

    fn worktree_remove(&self, path: &Path) -> Result<(), GitError> {
        crate::worktree_impl::worktree_remove(self, path)
    }
}
