//! Disposition types: the operations that move the old patch set to the new.
//!
//! # Variants
//!
//! | Variant        | Meaning                                                    |
//! |----------------|------------------------------------------------------------|
//! | `Revert`       | patch only in the old set; undo it                         |
//! | `Pick`         | patch only in the new set; add it                          |
//! | `Replace`      | same logical change in both sets with different content    |
//! | `ReplaceFixup` | a `FIXUP: ` commit that changed while its target did not   |
//!
//! `fixup_old` is a fixup from the old set that is undone together with the
//! disposition; `fixup_new` is a fixup from the new set applied after it.

use rebisect_git::GitOid;
use serde::{Serialize, Serializer};

use crate::patchset::UpstreamPatch;

/// Title prefix marking a commit that amends an earlier patch.
pub const FIXUP_PREFIX: &str = "FIXUP: ";

/// One classified operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "disposition", rename_all = "kebab-case")]
pub enum Disposition {
    /// Undo a patch present only in the old set.
    Revert {
        #[serde(serialize_with = "serialize_oid")]
        oid: GitOid,
        title: String,
        #[serde(serialize_with = "serialize_opt_oid")]
        fixup_old: Option<GitOid>,
    },
    /// Add a patch present only in the new set.
    Pick {
        #[serde(serialize_with = "serialize_oid")]
        oid: GitOid,
        title: String,
        #[serde(serialize_with = "serialize_opt_oid")]
        fixup_old: Option<GitOid>,
        #[serde(serialize_with = "serialize_opt_oid")]
        fixup_new: Option<GitOid>,
    },
    /// Swap the old instance of a change for the new one.
    Replace {
        #[serde(serialize_with = "serialize_oid")]
        old: GitOid,
        #[serde(serialize_with = "serialize_oid")]
        new: GitOid,
        title: String,
        #[serde(serialize_with = "serialize_opt_oid")]
        fixup_old: Option<GitOid>,
        #[serde(serialize_with = "serialize_opt_oid")]
        fixup_new: Option<GitOid>,
    },
    /// Swap one fixup for another without touching its target.
    ReplaceFixup {
        #[serde(serialize_with = "serialize_oid")]
        fixup_old: GitOid,
        #[serde(serialize_with = "serialize_oid")]
        fixup_new: GitOid,
        title: String,
    },
}

/// Variant tag, for counting and phase selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispositionKind {
    Revert,
    Pick,
    Replace,
    ReplaceFixup,
}

impl Disposition {
    /// The disposition's title (the old title for replacements).
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Revert { title, .. }
            | Self::Pick { title, .. }
            | Self::Replace { title, .. }
            | Self::ReplaceFixup { title, .. } => title,
        }
    }

    /// Variant tag.
    #[must_use]
    pub const fn kind(&self) -> DispositionKind {
        match self {
            Self::Revert { .. } => DispositionKind::Revert,
            Self::Pick { .. } => DispositionKind::Pick,
            Self::Replace { .. } => DispositionKind::Replace,
            Self::ReplaceFixup { .. } => DispositionKind::ReplaceFixup,
        }
    }

    /// `true` if the title carries the fixup marker.
    #[must_use]
    pub fn is_fixup(&self) -> bool {
        self.title().starts_with(FIXUP_PREFIX)
    }

    /// `true` for the variants the no-op filter trials.
    #[must_use]
    pub const fn is_replacement(&self) -> bool {
        matches!(self, Self::Replace { .. } | Self::ReplaceFixup { .. })
    }

    /// Every commit this disposition references.
    #[must_use]
    pub fn oids(&self) -> Vec<GitOid> {
        match self {
            Self::Revert { oid, fixup_old, .. } => {
                std::iter::once(*oid).chain(*fixup_old).collect()
            }
            Self::Pick {
                oid,
                fixup_old,
                fixup_new,
                ..
            } => std::iter::once(*oid)
                .chain(*fixup_old)
                .chain(*fixup_new)
                .collect(),
            Self::Replace {
                old,
                new,
                fixup_old,
                fixup_new,
                ..
            } => [*old, *new]
                .into_iter()
                .chain(*fixup_old)
                .chain(*fixup_new)
                .collect(),
            Self::ReplaceFixup {
                fixup_old,
                fixup_new,
                ..
            } => vec![*fixup_old, *fixup_new],
        }
    }
}

// ---------------------------------------------------------------------------
// Summary and report
// ---------------------------------------------------------------------------

/// Disposition counts for a run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlanSummary {
    pub reverts: usize,
    pub picks: usize,
    pub replaces: usize,
    pub replace_fixups: usize,
    /// Upstream commits between the two tags.
    pub upstream: usize,
    /// Replacements removed by the no-op filter.
    pub noops_dropped: usize,
}

impl PlanSummary {
    /// Count a filtered disposition list.
    #[must_use]
    pub fn of(dispositions: &[Disposition], upstream: usize, noops_dropped: usize) -> Self {
        let mut summary = Self {
            upstream,
            noops_dropped,
            ..Self::default()
        };
        for d in dispositions {
            match d.kind() {
                DispositionKind::Revert => summary.reverts += 1,
                DispositionKind::Pick => summary.picks += 1,
                DispositionKind::Replace => summary.replaces += 1,
                DispositionKind::ReplaceFixup => summary.replace_fixups += 1,
            }
        }
        summary
    }
}

/// Machine-readable plan, written by `create --plan-out` and `plan --json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    /// Old downstream ref.
    pub old: String,
    /// New downstream ref.
    pub new: String,
    /// Branch the plan is (or would be) applied to.
    pub branch: String,
    pub summary: PlanSummary,
    pub dispositions: Vec<Disposition>,
    pub upstream: Vec<UpstreamPatch>,
}

impl PlanReport {
    /// Pretty-printed JSON.
    ///
    /// # Errors
    /// Serialization failures from `serde_json`.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub(crate) fn serialize_oid<S: Serializer>(oid: &GitOid, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(oid)
}

#[allow(clippy::ref_option)]
fn serialize_opt_oid<S: Serializer>(oid: &Option<GitOid>, s: S) -> Result<S::Ok, S::Error> {
    match oid {
        Some(oid) => s.collect_str(oid),
        None => s.serialize_none(),
    }
}
