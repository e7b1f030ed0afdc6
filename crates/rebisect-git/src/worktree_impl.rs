//! Branch, checkout, fetch, and linked-worktree management.

use std::path::Path;

use crate::error::GitError;
use crate::exec::{git_ok, run_git};
use crate::git_cli::GitCli;
use crate::types::GitOid;

pub fn checkout(repo: &GitCli, spec: &str) -> Result<(), GitError> {
    git_ok(&repo.workdir, &["checkout", "-q", spec])?;
    Ok(())
}

pub fn create_branch(repo: &GitCli, name: &str, start: &str) -> Result<(), GitError> {
    let full = format!("refs/heads/{name}");
    let exists = run_git(
        &repo.workdir,
        &["rev-parse", "--verify", "--quiet", full.as_str()],
    )?;
    if exists.success {
        return Err(GitError::RefConflict {
            ref_name: full,
            message: "branch already exists".to_owned(),
        });
    }
    git_ok(&repo.workdir, &["branch", name, start])?;
    Ok(())
}

pub fn fetch(repo: &GitCli, remote: &str) -> Result<(), GitError> {
    git_ok(&repo.workdir, &["fetch", "-q", remote])?;
    Ok(())
}

pub fn worktree_add(repo: &GitCli, path: &Path, target: GitOid) -> Result<(), GitError> {
    let path_str = path.to_str().ok_or_else(|| GitError::BackendError {
        message: format!("worktree path is not UTF-8: {}", path.display()),
    })?;
    let sha = target.to_string();
    git_ok(
        &repo.workdir,
        &["worktree", "add", "-q", "--detach", "-f", path_str, sha.as_str()],
    )?;
    Ok(())
}

pub fn worktree_remove(repo: &GitCli, path: &Path) -> Result<(), GitError> {
    let path_str = path.to_str().ok_or_else(|| GitError::BackendError {
        message: format!("worktree path is not UTF-8: {}", path.display()),
    })?;
    git_ok(
        &repo.workdir,
        &["worktree", "remove", "--force", path_str],
    )?;
    git_ok(&repo.workdir, &["worktree", "prune"])?;
    Ok(())
}
