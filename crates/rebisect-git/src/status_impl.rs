//! Porcelain status parsing.

use crate::error::GitError;
use crate::exec::git_ok;
use crate::git_cli::GitCli;
use crate::types::StatusEntry;

pub fn status(repo: &GitCli) -> Result<Vec<StatusEntry>, GitError> {
    let out = git_ok(
        &repo.workdir,
        &["status", "--porcelain", "--untracked-files=no"],
    )?;
    Ok(parse_porcelain(&out))
}

/// Parse `git status --porcelain` (v1) output. Lines too short to carry
/// both status columns are ignored.
pub fn parse_porcelain(text: &str) -> Vec<StatusEntry> {
    text.lines()
        .filter_map(|line| {
            let mut chars = line.chars();
            let index = chars.next()?;
            let worktree = chars.next()?;
            let path = line.get(3..)?.to_owned();
            Some(StatusEntry {
                index,
                worktree,
                path,
            })
        })
        .collect()
}
