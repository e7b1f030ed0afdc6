//! Patch-set collection.
//!
//! A patch set is the ordered list of downstream commits sitting on top of an
//! upstream tag. Each record carries what the planner needs to match the same
//! logical change across a rebase: a content fingerprint, the subject, and the
//! Gerrit `Change-Id` trailer when present.

use rebisect_git::{GitOid, GitRepo};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;

/// Trailer key carrying the Gerrit change identity.
const CHANGE_ID_PREFIX: &str = "Change-Id: ";

/// One downstream commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Patch {
    /// Commit id on its branch. Never used for identity.
    pub oid: GitOid,
    /// Fingerprint of the commit's diff.
    pub fingerprint: Fingerprint,
    /// Commit subject.
    pub title: String,
    /// Value of the last `Change-Id:` trailer, if any.
    pub change_id: Option<String>,
}

impl Patch {
    /// `true` if both patches are the same logical change: equal change ids
    /// when both carry one, equal titles otherwise.
    #[must_use]
    pub fn is_same_change(&self, other: &Self) -> bool {
        match (&self.change_id, &other.change_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.title == other.title,
        }
    }
}

/// An upstream commit between two tags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UpstreamPatch {
    /// Commit id.
    #[serde(serialize_with = "crate::disposition::serialize_oid")]
    pub oid: GitOid,
    /// Commit subject.
    pub title: String,
}

/// Ordered patches, oldest first.
pub type PatchSet = Vec<Patch>;

/// Extract the change id from a commit message. Lines are trimmed; the last
/// `Change-Id:` line wins so reposted commits resolve to their newest id.
#[must_use]
pub fn change_id(message: &str) -> Option<String> {
    message
        .lines()
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(CHANGE_ID_PREFIX))
        .map(|id| id.trim().to_owned())
        .next_back()
}

/// Collect the patches in `base..tip`, oldest first.
///
/// Merge commits are left out with a warning: their parents' commits are
/// already in the range, and a merge cannot be reverted or picked without
/// choosing a mainline.
///
/// # Errors
/// [`Error::BadRange`] if the range cannot be listed; git errors reading an
/// individual commit are returned as-is.
pub fn collect(repo: &dyn GitRepo, base: &str, tip: &str) -> Result<PatchSet> {
    let range = format!("{base}..{tip}");
    let oids = list_range(repo, &range)?;
    tracing::info!(range = %range, count = oids.len(), "collecting patch set");

    let mut patches = Vec::with_capacity(oids.len());
    for oid in oids {
        let info = repo.read_commit(oid)?;
        if info.is_merge() {
            tracing::warn!(oid = %oid.short(), title = info.subject(), "skipping merge commit");
            continue;
        }
        let patch = repo.show_patch(oid)?;
        patches.push(Patch {
            oid,
            fingerprint: Fingerprint::of_patch(&patch),
            title: info.subject().to_owned(),
            change_id: change_id(&info.message),
        });
    }
    Ok(patches)
}

/// Collect upstream commits in `old_tag..new_tag`, oldest first, merges
/// excluded.
///
/// # Errors
/// [`Error::BadRange`] if the range cannot be listed.
pub fn collect_upstream(
    repo: &dyn GitRepo,
    old_tag: &str,
    new_tag: &str,
) -> Result<Vec<UpstreamPatch>> {
    let range = format!("{old_tag}..{new_tag}");
    let oids = list_range(repo, &range)?;
    tracing::info!(range = %range, count = oids.len(), "collecting upstream commits");

    let mut upstream = Vec::with_capacity(oids.len());
    for oid in oids {
        let info = repo.read_commit(oid)?;
        // Merges cannot be cherry-picked directly and carry no content of
        // their own once their parents are picked.
        if info.is_merge() {
            continue;
        }
        upstream.push(UpstreamPatch {
            oid,
            title: info.subject().to_owned(),
        });
    }
    Ok(upstream)
}

fn list_range(repo: &dyn GitRepo, range: &str) -> Result<Vec<GitOid>> {
    repo.list_commits(range).map_err(|source| Error::BadRange {
        range: range.to_owned(),
        source,
    })
}
