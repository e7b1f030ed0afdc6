//! Applying a plan to a new bisection branch.
//!
//! The branch starts at the old downstream tip and is walked towards the new
//! one in six phases:
//!
//! 1. revert old-only patches, each after its fixup (skip-listed titles kept);
//! 2. cherry-pick the upstream commits between the two tags;
//! 3. replace changed patches, one squashed commit each;
//! 4. replace changed fixups;
//! 5. cherry-pick new-only patches;
//! 6. commit whatever diff is still left against the new tip.
//!
//! Every commit in between is a buildable bisection point. Conflicts in
//! phases 1–5 go to a [`ConflictResolver`].

use rebisect_git::{GitError, GitOid, GitRepo, StepOutcome};

use crate::config::PlanConfig;
use crate::disposition::{Disposition, DispositionKind};
use crate::error::{Error, Result};
use crate::patchset::UpstreamPatch;
use crate::resolve::{Conflict, ConflictDecision, ConflictResolver, Operation};

/// Subject of the phase-6 commit.
fn closure_message(new: &str) -> String {
    format!("BISECT: commit all remaining diff from {new}")
}

/// Where the branch is built.
#[derive(Clone, Debug)]
pub struct ApplyTarget {
    /// Branch to create.
    pub branch: String,
    /// Ref the branch starts at.
    pub old: String,
    /// Ref whose tree the branch must end with.
    pub new: String,
}

/// What a run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Commits created on the branch, the closure commit included.
    pub commits: usize,
    /// Dispositions whose every step was already applied.
    pub empty: usize,
    /// Titles of dispositions dropped at a conflict.
    pub dropped: Vec<String>,
    /// Titles of reverts kept because of the skip list.
    pub skipped: Vec<String>,
    /// Whether a closure commit was needed.
    pub closure: bool,
}

/// One cherry-pick or revert inside a multi-step operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Step {
    op: Operation,
    oid: GitOid,
}

impl Step {
    const fn revert(oid: GitOid) -> Self {
        Self {
            op: Operation::Revert,
            oid,
        }
    }

    const fn pick(oid: GitOid) -> Self {
        Self {
            op: Operation::CherryPick,
            oid,
        }
    }
}

/// Result of one multi-step operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OpOutcome {
    /// Applied; `created` commits are new on HEAD.
    Applied { created: usize },
    /// Dropped at a conflict; HEAD is back where the operation started.
    Dropped,
}

/// Builds the bisection branch.
pub struct Applier<'a> {
    repo: &'a dyn GitRepo,
    config: &'a PlanConfig,
    resolver: &'a mut dyn ConflictResolver,
    report: ApplyReport,
}

impl<'a> Applier<'a> {
    #[must_use]
    pub fn new(
        repo: &'a dyn GitRepo,
        config: &'a PlanConfig,
        resolver: &'a mut dyn ConflictResolver,
    ) -> Self {
        Self {
            repo,
            config,
            resolver,
            report: ApplyReport::default(),
        }
    }

    /// Create `target.branch` and run all six phases.
    ///
    /// # Errors
    /// [`Error::BranchExists`], a dirty worktree, [`Error::Stopped`] when the
    /// resolver stops, [`Error::ClosureMismatch`], or any git failure. No
    /// rollback is attempted; commits made so far stay on the branch.
    pub fn apply(
        mut self,
        target: &ApplyTarget,
        dispositions: &[Disposition],
        upstream: &[UpstreamPatch],
    ) -> Result<ApplyReport> {
        self.prepare(target)?;

        self.phase("revert", dispositions, DispositionKind::Revert)?;
        self.upstream_phase(upstream)?;
        self.phase("replace", dispositions, DispositionKind::Replace)?;
        self.phase("replace-fixup", dispositions, DispositionKind::ReplaceFixup)?;
        self.phase("pick", dispositions, DispositionKind::Pick)?;
        self.closure(&target.new)?;

        tracing::info!(
            branch = %target.branch,
            commits = self.report.commits,
            dropped = self.report.dropped.len(),
            "bisection branch complete"
        );
        Ok(self.report)
    }

    fn prepare(&self, target: &ApplyTarget) -> Result<()> {
        let dirty = self.repo.status()?;
        if !dirty.is_empty() {
            return Err(GitError::DirtyWorktree {
                path: self.repo.workdir().to_path_buf(),
                message: format!("{} path(s) with uncommitted changes", dirty.len()),
            }
            .into());
        }
        self.repo
            .create_branch(&target.branch, &target.old)
            .map_err(|e| match e {
                GitError::RefConflict { .. } => Error::BranchExists {
                    name: target.branch.clone(),
                },
                other => other.into(),
            })?;
        self.repo.checkout(&target.branch)?;
        tracing::info!(branch = %target.branch, start = %target.old, "created bisection branch");
        Ok(())
    }

    fn phase(&mut self, name: &str, dispositions: &[Disposition], kind: DispositionKind) -> Result<()> {
        let selected: Vec<&Disposition> = dispositions.iter().filter(|d| d.kind() == kind).collect();
        let _span = tracing::info_span!("phase", name).entered();
        tracing::info!(count = selected.len(), "phase start");

        for (i, d) in selected.iter().enumerate() {
            if kind == DispositionKind::Revert && self.config.skips_revert(d.title()) {
                tracing::warn!(title = d.title(), "revert skipped by configuration");
                self.report.skipped.push(d.title().to_owned());
                continue;
            }
            tracing::info!("[{}/{}] {name} {}", i + 1, selected.len(), d.title());
            let steps = steps_for(d);
            match self.run(&steps)? {
                OpOutcome::Applied { created: 0 } => self.report.empty += 1,
                OpOutcome::Applied { created } => {
                    let created = if kind == DispositionKind::Replace && created > 1 {
                        self.squash(created)?
                    } else {
                        created
                    };
                    self.report.commits += created;
                }
                OpOutcome::Dropped => {
                    tracing::warn!(title = d.title(), "dropped at conflict");
                    self.report.dropped.push(d.title().to_owned());
                }
            }
        }
        Ok(())
    }

    fn upstream_phase(&mut self, upstream: &[UpstreamPatch]) -> Result<()> {
        let _span = tracing::info_span!("phase", name = "upstream").entered();
        tracing::info!(count = upstream.len(), "phase start");
        for (i, u) in upstream.iter().enumerate() {
            tracing::info!("[{}/{}] upstream {} {}", i + 1, upstream.len(), u.oid.short(), u.title);
            match self.run(&[Step::pick(u.oid)])? {
                OpOutcome::Applied { created } => {
                    self.report.commits += created;
                    if created == 0 {
                        self.report.empty += 1;
                    }
                }
                OpOutcome::Dropped => {
                    tracing::warn!(title = %u.title, "upstream commit dropped at conflict");
                    self.report.dropped.push(u.title.clone());
                }
            }
        }
        Ok(())
    }

    /// Run a multi-step operation. A `Drop` decision rewinds every step.
    fn run(&mut self, steps: &[Step]) -> Result<OpOutcome> {
        let start = self.repo.rev_parse("HEAD")?;
        let mut created = 0;
        for &step in steps {
            let attempt = match step.op {
                Operation::Revert => self.repo.revert(step.oid),
                Operation::CherryPick => self.repo.cherry_pick(step.oid),
            };
            let outcome = match attempt {
                Ok(outcome) => outcome,
                Err(GitError::MergeConflict { message }) => {
                    match self.resolve(step, message)? {
                        Some(outcome) => outcome,
                        None => {
                            self.repo.reset_hard(&start.to_string())?;
                            return Ok(OpOutcome::Dropped);
                        }
                    }
                }
                Err(e) => return Err(e.into()),
            };
            if outcome.committed() {
                created += 1;
            }
        }
        Ok(OpOutcome::Applied { created })
    }

    /// Ask the resolver until the conflict is settled. `None` means dropped
    /// (the in-progress operation is already aborted).
    fn resolve(&mut self, step: Step, mut message: String) -> Result<Option<StepOutcome>> {
        let title = self.repo.commit_subject(step.oid)?;
        let mut still_unresolved = false;
        loop {
            let conflict = Conflict {
                operation: step.op,
                oid: step.oid,
                title: title.clone(),
                paths: self.repo.status()?,
                message: message.clone(),
                still_unresolved,
            };
            tracing::warn!(
                operation = %step.op,
                oid = %step.oid.short(),
                paths = conflict.paths.len(),
                "conflict"
            );
            match self.resolver.decide(&conflict) {
                ConflictDecision::Continue => {
                    if !self.repo.is_resolved()? {
                        still_unresolved = true;
                        continue;
                    }
                    still_unresolved = false;
                    match self.repo.continue_in_progress() {
                        Ok(outcome) => return Ok(Some(outcome)),
                        Err(GitError::MergeConflict { message: next }) => message = next,
                        Err(e) => return Err(e.into()),
                    }
                }
                ConflictDecision::Stop => {
                    self.repo.abort_in_progress()?;
                    return Err(Error::Stopped {
                        oid: step.oid,
                        title,
                    });
                }
                ConflictDecision::Drop => {
                    self.repo.abort_in_progress()?;
                    return Ok(None);
                }
            }
        }
    }

    /// Squash the last `created` commits; returns how many remain (0 or 1).
    fn squash(&self, created: usize) -> Result<usize> {
        let range = format!("HEAD~{created}..HEAD");
        let subjects = self
            .repo
            .list_commits(&range)?
            .into_iter()
            .map(|oid| self.repo.commit_subject(oid))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let message = format!("Squash: [{}]", subjects.join(", "));
        let outcome = self.repo.squash_last(created, &message)?;
        if !outcome.committed() {
            tracing::info!("replacement nets to no change");
        }
        Ok(usize::from(outcome.committed()))
    }

    fn closure(&mut self, new: &str) -> Result<()> {
        let _span = tracing::info_span!("phase", name = "closure").entered();
        let range = format!("HEAD..{new}");
        let remaining = self.repo.diff(&range)?;
        if !remaining.is_empty() {
            tracing::info!(bytes = remaining.len(), "committing remaining diff");
            self.repo.apply_patch(&remaining)?;
            if self.repo.commit_all(&closure_message(new))?.committed() {
                self.report.commits += 1;
                self.report.closure = true;
            }
        }
        if !self.repo.diff(&range)?.is_empty() {
            return Err(Error::ClosureMismatch {
                target: new.to_owned(),
            });
        }
        Ok(())
    }
}

/// The steps of one disposition, in application order.
fn steps_for(d: &Disposition) -> Vec<Step> {
    match *d {
        Disposition::Revert { oid, fixup_old, .. } => fixup_old
            .map(Step::revert)
            .into_iter()
            .chain([Step::revert(oid)])
            .collect(),
        Disposition::Pick {
            oid,
            fixup_old,
            fixup_new,
            ..
        } => fixup_old
            .map(Step::revert)
            .into_iter()
            .chain([Step::pick(oid)])
            .chain(fixup_new.map(Step::pick))
            .collect(),
        Disposition::Replace {
            old,
            new,
            fixup_old,
            fixup_new,
            ..
        } => fixup_old
            .map(Step::revert)
            .into_iter()
            .chain([Step::revert(old), Step::pick(new)])
            .chain(fixup_new.map(Step::pick))
            .collect(),
        Disposition::ReplaceFixup {
            fixup_old,
            fixup_new,
            ..
        } => vec![Step::revert(fixup_old), Step::pick(fixup_new)],
    }
}
