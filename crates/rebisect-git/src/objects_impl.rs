//! Commit reads (gix) and revision-range listing (git CLI).

use crate::error::GitError;
use crate::exec::run_git;
use crate::git_cli::GitCli;
use crate::types::{CommitInfo, GitOid};

/// Convert our `GitOid` to a `gix::ObjectId`.
fn to_gix_oid(oid: GitOid) -> gix::ObjectId {
    gix::ObjectId::from_bytes_or_panic(oid.as_bytes())
}

/// Convert a `gix::ObjectId` (or `&gix::oid`) to a `GitOid`.
fn from_gix_oid(oid: &gix::oid) -> GitOid {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(oid.as_bytes());
    GitOid::from_bytes(bytes)
}

pub fn rev_parse(repo: &GitCli, spec: &str) -> Result<GitOid, GitError> {
    // Tags in these ranges are annotated; always peel to the commit.
    let peeled = format!("{spec}^{{commit}}");
    let id = repo
        .repo
        .rev_parse_single(peeled.as_str())
        .map_err(|e| GitError::NotFound {
            message: format!("rev-parse '{spec}': {e}"),
        })?;
    Ok(from_gix_oid(id.as_ref()))
}

pub fn read_commit(repo: &GitCli, oid: GitOid) -> Result<CommitInfo, GitError> {
    let commit = repo
        .repo
        .find_commit(to_gix_oid(oid))
        .map_err(|e| GitError::NotFound {
            message: format!("commit {oid}: {e}"),
        })?;

    let decoded = commit.decode().map_err(|e| GitError::BackendError {
        message: format!("failed to decode commit {oid}: {e}"),
    })?;

    let parents = decoded.parents().map(|p| from_gix_oid(&p)).collect();
    let message = decoded.message.to_string();
    Ok(CommitInfo { parents, message })
}

pub fn list_commits(repo: &GitCli, range: &str) -> Result<Vec<GitOid>, GitError> {
    let args = ["rev-list", "--reverse", range];
    let out = run_git(&repo.workdir, &args)?;
    if !out.success {
        return Err(GitError::NotFound {
            message: format!("revision range '{range}': {}", out.stderr.trim()),
        });
    }
    out.stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(|l| {
            l.parse::<GitOid>().map_err(|e| GitError::InvalidOid {
                value: e.value,
                reason: e.reason,
            })
        })
        .collect()
}
