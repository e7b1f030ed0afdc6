//! Conflict handling seam for the applier.
//!
//! When a cherry-pick or revert stops on a conflict, the applier hands a
//! [`Conflict`] to a [`ConflictResolver`] and acts on the returned
//! [`ConflictDecision`]. The CLI resolves interactively on the terminal;
//! tests and automation use [`ScriptedResolver`] or a closure.

use std::collections::VecDeque;
use std::fmt;

use rebisect_git::{GitOid, StatusEntry};

/// Which history operation stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Revert,
    CherryPick,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Revert => f.write_str("revert"),
            Self::CherryPick => f.write_str("cherry-pick"),
        }
    }
}

/// A stopped operation awaiting a decision.
#[derive(Clone, Debug)]
pub struct Conflict {
    pub operation: Operation,
    pub oid: GitOid,
    pub title: String,
    /// `git status --porcelain` entries at the time of asking.
    pub paths: Vec<StatusEntry>,
    /// What git reported when the operation stopped.
    pub message: String,
    /// Set when the resolver answered `Continue` but paths remain unmerged.
    pub still_unresolved: bool,
}

impl Conflict {
    /// Entries that still need resolving.
    pub fn unresolved(&self) -> impl Iterator<Item = &StatusEntry> {
        self.paths.iter().filter(|e| !e.is_resolved())
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "conflict during {} of {} {}", self.operation, self.oid.short(), self.title)?;
        for entry in &self.paths {
            writeln!(f, "  {entry}")?;
        }
        Ok(())
    }
}

/// What to do about a [`Conflict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConflictDecision {
    /// The conflict was resolved in the worktree; continue the operation.
    Continue,
    /// Abort the operation and end the run, keeping completed commits.
    Stop,
    /// Abort the operation and skip the whole disposition.
    Drop,
}

/// Decides how to proceed on a conflict. Called synchronously; the run
/// blocks until it returns.
pub trait ConflictResolver {
    fn decide(&mut self, conflict: &Conflict) -> ConflictDecision;
}

impl<F> ConflictResolver for F
where
    F: FnMut(&Conflict) -> ConflictDecision,
{
    fn decide(&mut self, conflict: &Conflict) -> ConflictDecision {
        self(conflict)
    }
}

/// Replays a fixed list of decisions, then answers `Stop`.
#[derive(Debug, Default)]
pub struct ScriptedResolver {
    decisions: VecDeque<ConflictDecision>,
    seen: Vec<(GitOid, bool)>,
}

impl ScriptedResolver {
    #[must_use]
    pub fn new(decisions: impl IntoIterator<Item = ConflictDecision>) -> Self {
        Self {
            decisions: decisions.into_iter().collect(),
            seen: Vec::new(),
        }
    }

    /// Every conflict asked about: commit id and the `still_unresolved` flag.
    #[must_use]
    pub fn seen(&self) -> &[(GitOid, bool)] {
        &self.seen
    }
}

impl ConflictResolver for ScriptedResolver {
    fn decide(&mut self, conflict: &Conflict) -> ConflictDecision {
        self.seen.push((conflict.oid, conflict.still_unresolved));
        self.decisions.pop_front().unwrap_or(ConflictDecision::Stop)
    }
}
