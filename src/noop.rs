//! No-op detection for replacements.
//!
//! A `Replace` or `ReplaceFixup` whose new side introduces exactly what the
//! old side did (a rebase that only reworded context the fingerprint could
//! not see through) would revert and re-apply the same content. Such
//! candidates are proven no-ops by cherry-picking in a throwaway linked
//! worktree and dropped from the plan.
//!
//! Two trials are run per candidate:
//!
//! - forward: start at `old` (or `fixup_old`), pick the new side and expect
//!   nothing to change;
//! - reverse: start at `new` (or `fixup_new`), pick the old side likewise.
//!
//! Either trial succeeding is proof enough.

use std::path::PathBuf;

use rebisect_git::{GitCli, GitError, GitOid, GitRepo, StepOutcome};
use tempfile::TempDir;

use crate::disposition::Disposition;
use crate::error::{Error, Result};

/// A detached linked worktree in a temp dir, removed on drop.
pub struct Scratch<'r> {
    main: &'r dyn GitRepo,
    repo: GitCli,
    path: PathBuf,
    // Declared last so the directory outlives the worktree handle.
    _dir: TempDir,
}

impl<'r> Scratch<'r> {
    /// Add a worktree of `main` detached at `start`.
    ///
    /// # Errors
    /// Git or I/O errors creating or opening the worktree.
    pub fn create(main: &'r dyn GitRepo, start: GitOid) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("rebisect-scratch-")
            .tempdir()
            .map_err(GitError::from)?;
        let path = dir.path().join("worktree");
        main.worktree_add(&path, start)?;
        let repo = match GitCli::open(&path) {
            Ok(repo) => repo,
            Err(e) => {
                let _ = main.worktree_remove(&path);
                return Err(e.into());
            }
        };
        tracing::debug!(path = %path.display(), "scratch worktree ready");
        Ok(Self {
            main,
            repo,
            path,
            _dir: dir,
        })
    }

    /// The worktree's repository handle.
    #[must_use]
    pub const fn repo(&self) -> &GitCli {
        &self.repo
    }

    /// Abort anything in progress and move HEAD to `oid`.
    fn reset_to(&self, oid: GitOid) -> Result<()> {
        self.repo
            .abort_in_progress()
            .and_then(|()| self.repo.reset_hard(&oid.to_string()))
            .map_err(|source| Error::ScratchReset {
                path: self.path.display().to_string(),
                source,
            })
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.main.worktree_remove(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "could not remove scratch worktree");
        }
    }
}

// ---------------------------------------------------------------------------
// Trial inputs
// ---------------------------------------------------------------------------

/// The commits a no-op trial works with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrialInputs {
    pub old: Option<GitOid>,
    pub new: Option<GitOid>,
    pub fixup_old: Option<GitOid>,
    pub fixup_new: Option<GitOid>,
}

impl TrialInputs {
    /// Inputs for a replacement, `None` for dispositions never trialled.
    #[must_use]
    pub const fn of(d: &Disposition) -> Option<Self> {
        match *d {
            Disposition::Replace {
                old,
                new,
                fixup_old,
                fixup_new,
                ..
            } => Some(Self {
                old: Some(old),
                new: Some(new),
                fixup_old,
                fixup_new,
            }),
            Disposition::ReplaceFixup {
                fixup_old,
                fixup_new,
                ..
            } => Some(Self {
                old: None,
                new: None,
                fixup_old: Some(fixup_old),
                fixup_new: Some(fixup_new),
            }),
            Disposition::Revert { .. } | Disposition::Pick { .. } => None,
        }
    }

    /// `true` when only one side carries a fixup next to a base patch. No
    /// trial can show such a pair to be a no-op.
    #[must_use]
    pub const fn has_lopsided_fixup(&self) -> bool {
        self.old.is_some() && self.fixup_old.is_some() != self.fixup_new.is_some()
    }

    /// Check the shape invariants every trial relies on.
    ///
    /// # Errors
    /// [`Error::Internal`] if base or fixup commits are not paired, or
    /// nothing is given at all.
    pub fn validate(&self) -> Result<()> {
        if self.old.is_some() != self.new.is_some() {
            return Err(Error::Internal(format!(
                "trial needs both old and new or neither: {self:?}"
            )));
        }
        if self.old.is_none() {
            if self.fixup_old.is_none() && self.fixup_new.is_none() {
                return Err(Error::Internal("trial has nothing to pick".into()));
            }
            if self.fixup_old.is_some() != self.fixup_new.is_some() {
                return Err(Error::Internal(format!(
                    "fixup-only trial needs both fixups: {self:?}"
                )));
            }
        }
        Ok(())
    }

    fn forward(&self) -> Option<Trial> {
        Trial::build(self.old, self.new, self.fixup_old, self.fixup_new)
    }

    fn reverse(&self) -> Option<Trial> {
        Trial::build(self.new, self.old, self.fixup_new, self.fixup_old)
    }
}

/// A start commit and the picks that must each meet their expectation.
#[derive(Debug, PartialEq, Eq)]
struct Trial {
    start: GitOid,
    steps: Vec<(GitOid, StepOutcome)>,
}

impl Trial {
    /// Build a trial starting on the `from` side. `None` when the inputs do
    /// not describe a trial at all.
    fn build(
        from: Option<GitOid>,
        to: Option<GitOid>,
        fixup_from: Option<GitOid>,
        fixup_to: Option<GitOid>,
    ) -> Option<Self> {
        if let (Some(start), Some(to)) = (from, to) {
            let mut steps = vec![(to, StepOutcome::Empty)];
            steps.extend(fixup_from.map(|f| (f, StepOutcome::Committed)));
            steps.extend(fixup_to.map(|f| (f, StepOutcome::Empty)));
            return Some(Self { start, steps });
        }
        Some(Self {
            start: fixup_from?,
            steps: vec![(fixup_to?, StepOutcome::Empty)],
        })
    }
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

/// Outcome of [`filter_noops`].
#[derive(Debug)]
pub struct Filtered {
    pub kept: Vec<Disposition>,
    pub dropped: usize,
}

/// Drop every replacement proven to be a no-op.
///
/// Non-replacement dispositions pass through untouched, order is preserved.
/// The main worktree is never modified.
///
/// # Errors
/// Git failures outside trial steps, [`Error::ScratchReset`], or
/// [`Error::Internal`] for malformed trial inputs.
pub fn filter_noops(repo: &dyn GitRepo, dispositions: Vec<Disposition>) -> Result<Filtered> {
    let candidates = dispositions.iter().filter(|d| d.is_replacement()).count();
    let Some(first) = dispositions.iter().find_map(TrialInputs::of) else {
        return Ok(Filtered {
            kept: dispositions,
            dropped: 0,
        });
    };
    first.validate()?;
    let start = first
        .old
        .or(first.fixup_old)
        .ok_or_else(|| Error::Internal("replacement without a start commit".into()))?;
    let scratch = Scratch::create(repo, start)?;
    let _span = tracing::info_span!("noop_filter", candidates).entered();

    let mut kept = Vec::with_capacity(dispositions.len());
    let mut dropped = 0;
    let mut seen = 0;
    for d in dispositions {
        let Some(inputs) = TrialInputs::of(&d) else {
            kept.push(d);
            continue;
        };
        seen += 1;
        tracing::info!("[{seen}/{candidates}] trial {}", d.title());
        if is_noop(&scratch, &inputs)? {
            tracing::info!(title = d.title(), "no-op replacement dropped");
            dropped += 1;
        } else {
            kept.push(d);
        }
    }
    tracing::info!(candidates, dropped, "no-op filter done");
    Ok(Filtered { kept, dropped })
}

/// Run the forward then, if needed, the reverse trial.
fn is_noop(scratch: &Scratch<'_>, inputs: &TrialInputs) -> Result<bool> {
    inputs.validate()?;
    if inputs.has_lopsided_fixup() {
        return Ok(false);
    }
    let (Some(forward), Some(reverse)) = (inputs.forward(), inputs.reverse()) else {
        return Err(Error::Internal(format!("no trial for {inputs:?}")));
    };
    if run_trial(scratch, &forward)? {
        return Ok(true);
    }
    run_trial(scratch, &reverse)
}

fn run_trial(scratch: &Scratch<'_>, trial: &Trial) -> Result<bool> {
    scratch.reset_to(trial.start)?;
    for &(oid, expected) in &trial.steps {
        match scratch.repo().cherry_pick(oid) {
            Ok(outcome) if outcome == expected => {}
            Ok(_) => return Ok(false),
            Err(GitError::MergeConflict { .. }) => {
                tracing::debug!(oid = %oid.short(), "trial step conflicted");
                scratch.reset_to(trial.start)?;
                return Ok(false);
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}
