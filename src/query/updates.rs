// src/query/updates.rs

//! Installed/available partition and upgrade/downgrade relations

use super::PackageQuery;
use crate::pool::{NOARCH, PackageId, Pool, Solvable};
use crate::version::evrcmp;
use std::cmp::Ordering;

/// Whether an installed package of arch `installed` may be replaced by one of
/// arch `candidate` in an upgrade
fn upgrade_arch_compatible(candidate: &Solvable, installed: &Solvable) -> bool {
    if candidate.arch == installed.arch {
        return true;
    }
    if candidate.is_source() || installed.is_source() {
        return false;
    }
    candidate.arch == NOARCH || installed.arch == NOARCH
}

/// Installed packages named like `candidate` that satisfy `compatible`
fn installed_peers<'p>(
    pool: &'p Pool,
    candidate: &'p Solvable,
    compatible: impl Fn(&Solvable, &Solvable) -> bool + 'p,
) -> impl Iterator<Item = (PackageId, &'p Solvable)> + 'p {
    pool.ids_by_name(&candidate.name)
        .iter()
        .copied()
        .filter(move |id| pool.is_installed(*id))
        .map(move |id| (id, pool.solvable(id)))
        .filter(move |(_, installed)| compatible(candidate, installed))
}

/// The installed package `candidate` would upgrade
///
/// Same name, and the same arch unless one side is `noarch`. The candidate
/// must be newer than every such installed package; the lowest of them is
/// the target.
pub(crate) fn what_upgrades(pool: &Pool, candidate: PackageId) -> Option<PackageId> {
    let cand = pool.solvable(candidate);
    let mut target: Option<(PackageId, &Solvable)> = None;
    for (id, installed) in installed_peers(pool, cand, upgrade_arch_compatible) {
        if evrcmp(&installed.evr, &cand.evr) != Ordering::Less {
            return None;
        }
        if target.is_none_or(|(_, lowest)| evrcmp(&installed.evr, &lowest.evr) == Ordering::Less) {
            target = Some((id, installed));
        }
    }
    target.map(|(id, _)| id)
}

/// The installed package `candidate` would downgrade
///
/// Same name and arch. The candidate must be older than every such
/// installed package; the highest of them is the target.
pub(crate) fn what_downgrades(pool: &Pool, candidate: PackageId) -> Option<PackageId> {
    let cand = pool.solvable(candidate);
    let mut target: Option<(PackageId, &Solvable)> = None;
    for (id, installed) in installed_peers(pool, cand, |c, i| c.arch == i.arch) {
        if evrcmp(&installed.evr, &cand.evr) != Ordering::Greater {
            return None;
        }
        if target.is_none_or(|(_, highest)| evrcmp(&installed.evr, &highest.evr) == Ordering::Greater) {
            target = Some((id, installed));
        }
    }
    target.map(|(id, _)| id)
}

impl PackageQuery {
    /// Keep installed packages; empties the query when nothing is installed
    pub fn filter_installed(&mut self) {
        let matched = self.select_with(|pool, id| pool.is_installed(id));
        self.apply(&matched, false);
    }

    /// Drop installed packages
    pub fn filter_available(&mut self) {
        let matched = self.select_with(|pool, id| pool.is_installed(id));
        self.apply(&matched, true);
    }

    /// Keep available packages that upgrade an installed package
    pub fn filter_upgrades(&mut self) {
        self.filter_by_relation(what_upgrades);
    }

    /// Keep available packages that downgrade an installed package
    pub fn filter_downgrades(&mut self) {
        self.filter_by_relation(what_downgrades);
    }

    /// Keep installed packages some considered available package upgrades
    pub fn filter_upgradable(&mut self) {
        self.filter_by_target(what_upgrades);
    }

    /// Keep installed packages some considered available package downgrades
    pub fn filter_downgradable(&mut self) {
        self.filter_by_target(what_downgrades);
    }

    fn filter_by_relation(&mut self, relation: fn(&Pool, PackageId) -> Option<PackageId>) {
        if self.set.sack().pool().installed_repo().is_none() {
            self.clear();
            return;
        }
        let matched = self.select_with(|pool, id| !pool.is_installed(id) && relation(pool, id).is_some());
        self.apply(&matched, false);
    }

    fn filter_by_target(&mut self, relation: fn(&Pool, PackageId) -> Option<PackageId>) {
        if self.set.sack().pool().installed_repo().is_none() {
            self.clear();
            return;
        }
        let considered = self.considered_map();
        let mut targets = self.new_map();
        {
            let pool = self.set.sack().pool();
            for id in pool.package_ids() {
                if pool.is_installed(id) || considered.as_ref().is_some_and(|map| !map.contains(id)) {
                    continue;
                }
                if let Some(target) = relation(&pool, id) {
                    targets.add_unchecked(target);
                }
            }
        }
        self.apply(&targets, false);
    }
}
