//! Patch text: per-commit diffs, range diffs, and `git apply`.

use crate::error::GitError;
use crate::exec::{git_ok, run_git_with_input};
use crate::git_cli::GitCli;
use crate::types::GitOid;

pub fn show_patch(repo: &GitCli, oid: GitOid) -> Result<String, GitError> {
    let sha = oid.to_string();
    git_ok(
        &repo.workdir,
        &[
            "--no-pager",
            "show",
            "--format=",
            "--no-color",
            "--no-ext-diff",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            sha.as_str(),
        ],
    )
}

/// Prefixes are pinned so `diff.noprefix` and friends cannot break
/// [`apply_patch`], which strips one leading component.
pub fn diff(repo: &GitCli, range: &str) -> Result<String, GitError> {
    git_ok(
        &repo.workdir,
        &[
            "--no-pager",
            "diff",
            "--binary",
            "--no-color",
            "--no-ext-diff",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            range,
        ],
    )
}

pub fn apply_patch(repo: &GitCli, patch: &str) -> Result<(), GitError> {
    if patch.trim().is_empty() {
        return Ok(());
    }
    let args = ["apply", "-p1", "--index", "--binary", "-"];
    run_git_with_input(&repo.workdir, &args, Some(patch))?.into_result(&args)?;
    Ok(())
}
