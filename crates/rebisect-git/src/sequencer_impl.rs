//! Cherry-pick, revert, and commit plumbing over the git CLI.
//!
//! git reports "the change is already there" and "the change conflicts" with
//! the same exit status, so both are told apart here: an empty result leaves
//! no unmerged paths and mentions `--allow-empty` / "is now empty" /
//! "nothing to commit" in its advice.

use crate::error::GitError;
use crate::exec::{git_ok, run_git, GitOutput};
use crate::git_cli::GitCli;
use crate::types::{GitOid, StepOutcome};

/// Which sequencer command is in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InProgress {
    CherryPick,
    Revert,
}

impl InProgress {
    const fn command(self) -> &'static str {
        match self {
            Self::CherryPick => "cherry-pick",
            Self::Revert => "revert",
        }
    }
}

pub fn cherry_pick(repo: &GitCli, oid: GitOid) -> Result<StepOutcome, GitError> {
    let sha = oid.to_string();
    let args = ["cherry-pick", "--no-rerere-autoupdate", sha.as_str()];
    let out = run_git(&repo.workdir, &args)?;
    classify(repo, &args, out)
}

pub fn revert(repo: &GitCli, oid: GitOid) -> Result<StepOutcome, GitError> {
    let sha = oid.to_string();
    let args = ["revert", "--no-edit", "--no-rerere-autoupdate", sha.as_str()];
    let out = run_git(&repo.workdir, &args)?;
    classify(repo, &args, out)
}

pub fn continue_in_progress(repo: &GitCli) -> Result<StepOutcome, GitError> {
    let Some(op) = in_progress(repo)? else {
        // The operator may have committed by hand; nothing left to continue.
        return Ok(StepOutcome::Committed);
    };
    let args = [op.command(), "--continue"];
    let out = run_git(&repo.workdir, &args)?;
    classify(repo, &args, out)
}

pub fn abort_in_progress(repo: &GitCli) -> Result<(), GitError> {
    if let Some(op) = in_progress(repo)? {
        tracing::debug!(command = op.command(), "aborting in-progress operation");
        git_ok(&repo.workdir, &[op.command(), "--abort"])?;
    }
    Ok(())
}

pub fn reset_hard(repo: &GitCli, spec: &str) -> Result<(), GitError> {
    git_ok(&repo.workdir, &["reset", "--hard", "-q", spec])?;
    Ok(())
}

pub fn commit_all(repo: &GitCli, message: &str) -> Result<StepOutcome, GitError> {
    git_ok(&repo.workdir, &["add", "-A"])?;
    commit_staged(repo, message)
}

pub fn squash_last(repo: &GitCli, n: usize, message: &str) -> Result<StepOutcome, GitError> {
    if n == 0 {
        return Ok(StepOutcome::Empty);
    }
    let base = format!("HEAD~{n}");
    git_ok(&repo.workdir, &["reset", "--soft", base.as_str()])?;
    commit_staged(repo, message)
}

fn commit_staged(repo: &GitCli, message: &str) -> Result<StepOutcome, GitError> {
    // `diff --cached --quiet` exits 0 when nothing is staged.
    let staged = run_git(&repo.workdir, &["diff", "--cached", "--quiet"])?;
    if staged.success {
        return Ok(StepOutcome::Empty);
    }
    git_ok(&repo.workdir, &["commit", "-q", "--no-verify", "-m", message])?;
    Ok(StepOutcome::Committed)
}

/// Map the result of a cherry-pick / revert / continue to an outcome.
fn classify(repo: &GitCli, args: &[&str], out: GitOutput) -> Result<StepOutcome, GitError> {
    if out.success {
        return Ok(StepOutcome::Committed);
    }

    let text = out.combined();
    let op = in_progress(repo)?;
    let unmerged = crate::status_impl::status(repo)?
        .iter()
        .any(crate::types::StatusEntry::is_unmerged);

    if !unmerged && is_empty_advice(&text) {
        if let Some(op) = op {
            git_ok(&repo.workdir, &[op.command(), "--skip"])?;
        }
        return Ok(StepOutcome::Empty);
    }

    if op.is_some() {
        return Err(GitError::MergeConflict {
            message: text.trim().to_owned(),
        });
    }

    out.into_result(args).map(|_| StepOutcome::Committed)
}

fn is_empty_advice(text: &str) -> bool {
    text.contains("--allow-empty")
        || text.contains("is now empty")
        || text.contains("nothing to commit")
}

fn in_progress(repo: &GitCli) -> Result<Option<InProgress>, GitError> {
    if git_path_exists(repo, "CHERRY_PICK_HEAD")? {
        Ok(Some(InProgress::CherryPick))
    } else if git_path_exists(repo, "REVERT_HEAD")? {
        Ok(Some(InProgress::Revert))
    } else {
        Ok(None)
    }
}

/// Check for a file inside the (per-worktree) git directory.
fn git_path_exists(repo: &GitCli, name: &str) -> Result<bool, GitError> {
    let raw = git_ok(&repo.workdir, &["rev-parse", "--git-path", name])?;
    let path = std::path::Path::new(raw.trim());
    let full = if path.is_absolute() {
        path.to_path_buf()
    } else {
        repo.workdir.join(path)
    };
    Ok(full.exists())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_advice_variants() {
        assert!(is_empty_advice(
            "The previous cherry-pick is now empty, possibly due to conflict resolution."
        ));
        assert!(is_empty_advice("    git commit --allow-empty\n"));
        assert!(is_empty_advice("nothing to commit, working tree clean"));
        assert!(!is_empty_advice("CONFLICT (content): Merge conflict in a.c"));
    }

    #[test]
    fn command_names() {
        assert_eq!(InProgress::CherryPick.command(), "cherry-pick");
        assert_eq!(InProgress::Revert.command(), "revert");
    }
}
