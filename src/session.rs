//! End-to-end runs: plan, create and verify a bisection branch between two
//! versions.

use rebisect_git::GitRepo;

use crate::apply::{Applier, ApplyReport, ApplyTarget};
use crate::config::Config;
use crate::disposition::{PlanReport, PlanSummary};
use crate::error::Result;
use crate::noop::filter_noops;
use crate::patchset::{collect, collect_upstream};
use crate::plan::Planner;
use crate::resolve::ConflictResolver;
use crate::walk::{BuildVerifier, WalkReport, Walker};

/// Every ref a run touches, derived from two version strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Refs {
    pub old_downstream: String,
    pub new_downstream: String,
    pub old_tag: String,
    pub new_tag: String,
    pub branch: String,
}

impl Refs {
    #[must_use]
    pub fn for_versions(config: &Config, old: &str, new: &str) -> Self {
        Self {
            old_downstream: config.refs.downstream_ref(old),
            new_downstream: config.refs.downstream_ref(new),
            old_tag: config.refs.upstream_ref(old),
            new_tag: config.refs.upstream_ref(new),
            branch: config.refs.bisect_branch(old, new),
        }
    }
}

/// A repository plus the configuration driving it.
pub struct Session<'a> {
    repo: &'a dyn GitRepo,
    config: &'a Config,
}

impl<'a> Session<'a> {
    #[must_use]
    pub const fn new(repo: &'a dyn GitRepo, config: &'a Config) -> Self {
        Self { repo, config }
    }

    /// Fetch every configured remote.
    ///
    /// # Errors
    /// The first failing fetch.
    pub fn fetch(&self) -> Result<()> {
        for remote in &self.config.refs.remotes {
            tracing::info!(remote, "fetching");
            self.repo.fetch(remote)?;
        }
        Ok(())
    }

    /// Collect both patch sets and the upstream commits, plan, and drop
    /// no-op replacements. Read-only for the main worktree.
    ///
    /// # Errors
    /// [`crate::Error::BadRange`] for unknown refs, git failures, or no-op
    /// filter errors.
    pub fn plan(&self, refs: &Refs) -> Result<PlanReport> {
        let _span = tracing::info_span!("plan", branch = %refs.branch).entered();
        let old = collect(self.repo, &refs.old_tag, &refs.old_downstream)?;
        let new = collect(self.repo, &refs.new_tag, &refs.new_downstream)?;
        let upstream = collect_upstream(self.repo, &refs.old_tag, &refs.new_tag)?;

        let planned = Planner::new(&self.config.plan).plan(&old, &new, &upstream);
        let filtered = filter_noops(self.repo, planned)?;
        let summary = PlanSummary::of(&filtered.kept, upstream.len(), filtered.dropped);
        tracing::info!(
            reverts = summary.reverts,
            picks = summary.picks,
            replaces = summary.replaces,
            replace_fixups = summary.replace_fixups,
            upstream = summary.upstream,
            noops_dropped = summary.noops_dropped,
            "plan ready"
        );
        if self.config.plan.debug {
            for d in &filtered.kept {
                tracing::debug!(kind = ?d.kind(), oids = ?d.oids(), "{}", d.title());
            }
        }

        Ok(PlanReport {
            old: refs.old_downstream.clone(),
            new: refs.new_downstream.clone(),
            branch: refs.branch.clone(),
            summary,
            dispositions: filtered.kept,
            upstream,
        })
    }

    /// Build the bisection branch from a plan.
    ///
    /// # Errors
    /// See [`Applier::apply`].
    pub fn create(
        &self,
        plan: &PlanReport,
        resolver: &mut dyn ConflictResolver,
    ) -> Result<ApplyReport> {
        let target = ApplyTarget {
            branch: plan.branch.clone(),
            old: plan.old.clone(),
            new: plan.new.clone(),
        };
        Applier::new(self.repo, &self.config.plan, resolver).apply(
            &target,
            &plan.dispositions,
            &plan.upstream,
        )
    }

    /// Build-check the bisection branch in `steps` stops.
    ///
    /// # Errors
    /// See [`Walker::walk`].
    pub fn verify(
        &self,
        refs: &Refs,
        steps: usize,
        verifier: &mut dyn BuildVerifier,
    ) -> Result<WalkReport> {
        Walker::new(self.repo, &self.config.verify).walk(
            &refs.branch,
            &refs.old_downstream,
            steps,
            verifier,
        )
    }
}
