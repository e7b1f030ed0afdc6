//! Disposition planning.
//!
//! Turns the old and new patch sets plus the upstream commits between the two
//! tags into a list of [`Disposition`]s:
//!
//! 1. Drop patches whose fingerprint appears on both sides (unchanged,
//!    including the many empty commits both branches carry).
//! 2. Old-only patches become reverts, new-only patches become picks.
//! 3. A revert and a pick of the same change (change id, else title) become a
//!    replace. Fixup reverts are never paired here.
//! 4. Unpaired reverts whose title landed upstream (optionally behind a
//!    `FROMLIST: ` / `FROMGIT: ` prefix) are dropped.
//! 5. `FIXUP: <t>` reverts and picks are folded into the disposition titled
//!    `<t>`.
//! 6. Leftover fixup revert/pick pairs with equal titles become
//!    replace-fixups.
//!
//! Matching is pairwise (O(n²)) over at most a few hundred patches. All
//! iteration follows patch-set order, so the output is deterministic.

use std::collections::HashSet;

use rebisect_git::GitOid;

use crate::config::PlanConfig;
use crate::disposition::{Disposition, FIXUP_PREFIX};
use crate::fingerprint::Fingerprint;
use crate::patchset::{Patch, UpstreamPatch};

const FROMLIST_PREFIX: &str = "FROMLIST: ";
const FROMGIT_PREFIX: &str = "FROMGIT: ";

/// Computes dispositions for one pair of patch sets.
pub struct Planner<'a> {
    config: &'a PlanConfig,
}

impl<'a> Planner<'a> {
    #[must_use]
    pub const fn new(config: &'a PlanConfig) -> Self {
        Self { config }
    }

    /// Plan the operations transforming `old` into `new`.
    ///
    /// Output order: reverts and replaces in old-set order, then picks in
    /// new-set order, then replace-fixups.
    #[must_use]
    pub fn plan(
        &self,
        old: &[Patch],
        new: &[Patch],
        upstream: &[UpstreamPatch],
    ) -> Vec<Disposition> {
        let (old_only, new_only) = drop_shared_content(old, new);
        tracing::info!(
            old = old.len(),
            new = new.len(),
            old_only = old_only.len(),
            new_only = new_only.len(),
            "deduplicated patch sets"
        );

        let pairs = self.squash_pairs(&old_only, &new_only);
        let upstream_titles: HashSet<&str> = upstream.iter().map(|u| u.title.as_str()).collect();

        let mut dispositions = Vec::with_capacity(old_only.len() + new_only.len());
        for (i, patch) in old_only.iter().enumerate() {
            if let Some(j) = pairs.revert_to_pick[i] {
                dispositions.push(Disposition::Replace {
                    old: patch.oid,
                    new: new_only[j].oid,
                    title: patch.title.clone(),
                    fixup_old: None,
                    fixup_new: None,
                });
            } else if is_upstreamed(&upstream_titles, &patch.title) {
                self.trace(format_args!("already upstream: {} {}", patch.oid.short(), patch.title));
            } else {
                dispositions.push(Disposition::Revert {
                    oid: patch.oid,
                    title: patch.title.clone(),
                    fixup_old: None,
                });
            }
        }
        for (j, patch) in new_only.iter().enumerate() {
            if !pairs.pick_taken[j] {
                dispositions.push(Disposition::Pick {
                    oid: patch.oid,
                    title: patch.title.clone(),
                    fixup_old: None,
                    fixup_new: None,
                });
            }
        }

        let dispositions = self.absorb_fixups(dispositions);
        self.pair_fixups(dispositions)
    }

    /// Step 3: one-to-one revert/pick pairing, first match wins.
    fn squash_pairs(&self, old_only: &[&Patch], new_only: &[&Patch]) -> SquashPairs {
        let mut pairs = SquashPairs {
            revert_to_pick: vec![None; old_only.len()],
            pick_taken: vec![false; new_only.len()],
        };
        for (i, revert) in old_only.iter().enumerate() {
            if revert.title.starts_with(FIXUP_PREFIX) {
                continue;
            }
            let found = new_only
                .iter()
                .enumerate()
                .find(|(j, pick)| !pairs.pick_taken[*j] && revert.is_same_change(pick));
            if let Some((j, pick)) = found {
                self.trace(format_args!(
                    "squash {} -> {} {}",
                    revert.oid.short(),
                    pick.oid.short(),
                    revert.title
                ));
                pairs.revert_to_pick[i] = Some(j);
                pairs.pick_taken[j] = true;
            }
        }
        pairs
    }

    /// Step 5: fold fixup reverts/picks into their targets.
    fn absorb_fixups(&self, mut dispositions: Vec<Disposition>) -> Vec<Disposition> {
        let mut absorbed = vec![false; dispositions.len()];

        for i in 0..dispositions.len() {
            let (fixup_oid, side, target) = match &dispositions[i] {
                Disposition::Revert { oid, title, .. } => (*oid, FixupSide::Old, title),
                Disposition::Pick { oid, title, .. } => (*oid, FixupSide::New, title),
                Disposition::Replace { .. } | Disposition::ReplaceFixup { .. } => continue,
            };
            let Some(target) = target.strip_prefix(FIXUP_PREFIX) else {
                continue;
            };
            let target = target.to_owned();

            let found = (0..dispositions.len()).find(|&j| {
                j != i
                    && !absorbed[j]
                    && !dispositions[j].is_fixup()
                    && dispositions[j].title() == target
                    && fixup_slot(&dispositions[j], side).is_some_and(|slot| slot.is_none())
            });
            if let Some(j) = found {
                if let Some(slot) = fixup_slot_mut(&mut dispositions[j], side) {
                    *slot = Some(fixup_oid);
                }
                absorbed[i] = true;
                self.trace(format_args!("fixup {} folded into {target}", fixup_oid.short()));
            }
        }

        dispositions
            .into_iter()
            .zip(absorbed)
            .filter_map(|(d, gone)| (!gone).then_some(d))
            .collect()
    }

    /// Step 6: pair leftover fixup reverts and picks sharing a title.
    fn pair_fixups(&self, dispositions: Vec<Disposition>) -> Vec<Disposition> {
        let mut consumed = vec![false; dispositions.len()];
        let mut replacements = Vec::new();

        for (i, revert) in dispositions.iter().enumerate() {
            let Disposition::Revert { oid: fixup_old, title, .. } = revert else {
                continue;
            };
            if !revert.is_fixup() {
                continue;
            }
            let found = dispositions.iter().enumerate().find_map(|(j, d)| match d {
                Disposition::Pick { oid, title: t, .. } if !consumed[j] && t == title => {
                    Some((j, *oid))
                }
                _ => None,
            });
            if let Some((j, fixup_new)) = found {
                consumed[i] = true;
                consumed[j] = true;
                self.trace(format_args!(
                    "fixup replace {} -> {} {title}",
                    fixup_old.short(),
                    fixup_new.short()
                ));
                replacements.push(Disposition::ReplaceFixup {
                    fixup_old: *fixup_old,
                    fixup_new,
                    title: title.clone(),
                });
            }
        }

        dispositions
            .into_iter()
            .zip(consumed)
            .filter_map(|(d, gone)| (!gone).then_some(d))
            .chain(replacements)
            .collect()
    }

    fn trace(&self, message: std::fmt::Arguments<'_>) {
        if self.config.debug {
            tracing::debug!("{message}");
        }
    }
}

struct SquashPairs {
    /// For each old-only patch, the index of the new-only patch it pairs with.
    revert_to_pick: Vec<Option<usize>>,
    pick_taken: Vec<bool>,
}

/// Which side of the rebase a fixup comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FixupSide {
    Old,
    New,
}

const fn fixup_slot(d: &Disposition, side: FixupSide) -> Option<&Option<GitOid>> {
    match (d, side) {
        (
            Disposition::Revert { fixup_old, .. }
            | Disposition::Pick { fixup_old, .. }
            | Disposition::Replace { fixup_old, .. },
            FixupSide::Old,
        ) => Some(fixup_old),
        (
            Disposition::Pick { fixup_new, .. } | Disposition::Replace { fixup_new, .. },
            FixupSide::New,
        ) => Some(fixup_new),
        _ => None,
    }
}

const fn fixup_slot_mut(d: &mut Disposition, side: FixupSide) -> Option<&mut Option<GitOid>> {
    match (d, side) {
        (
            Disposition::Revert { fixup_old, .. }
            | Disposition::Pick { fixup_old, .. }
            | Disposition::Replace { fixup_old, .. },
            FixupSide::Old,
        ) => Some(fixup_old),
        (
            Disposition::Pick { fixup_new, .. } | Disposition::Replace { fixup_new, .. },
            FixupSide::New,
        ) => Some(fixup_new),
        _ => None,
    }
}

/// Step 1: split both sets into the patches whose content is not shared.
fn drop_shared_content<'p>(old: &'p [Patch], new: &'p [Patch]) -> (Vec<&'p Patch>, Vec<&'p Patch>) {
    let old_prints: HashSet<Fingerprint> = old.iter().map(|p| p.fingerprint).collect();
    let shared: HashSet<Fingerprint> = new
        .iter()
        .map(|p| p.fingerprint)
        .filter(|f| old_prints.contains(f))
        .collect();
    let keep = |p: &&Patch| !shared.contains(&p.fingerprint);
    (
        old.iter().filter(keep).collect(),
        new.iter().filter(keep).collect(),
    )
}

/// Step 4 heuristic: exact title match, or match after removing one of the
/// two staging prefixes.
fn is_upstreamed(upstream_titles: &HashSet<&str>, title: &str) -> bool {
    upstream_titles.contains(title)
        || [FROMLIST_PREFIX, FROMGIT_PREFIX]
            .iter()
            .filter_map(|prefix| title.strip_prefix(prefix))
            .any(|stripped| upstream_titles.contains(stripped))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Property tests
// ---------------------------------------------------------------------------
