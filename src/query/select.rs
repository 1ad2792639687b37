// src/query/select.rs

//! Selection filters: latest/earliest versions, repository priority,
//! duplicates, extras, installonly and versionlock

use super::PackageQuery;
use super::cmp::QueryCmp;
use crate::pool::PackageId;
use crate::sack::ExcludeFlags;
use crate::version::evrcmp;
use std::cmp::Ordering;

/// One member, flattened for sorting
struct Entry {
    id: PackageId,
    name: String,
    arch: String,
    evr: String,
}

impl PackageQuery {
    fn entries(&self) -> Vec<Entry> {
        let pool = self.set.sack().pool();
        self.set
            .ids()
            .map(|id| {
                let s = pool.solvable(id);
                Entry {
                    id,
                    name: s.name.clone(),
                    arch: s.arch.clone(),
                    evr: s.evr.clone(),
                }
            })
            .collect()
    }

    /// Keep EVR tiers per group, groups being name (and arch) blocks sorted
    /// newest first, or oldest first when `earliest` is set
    ///
    /// A positive `limit` keeps the first `limit` tiers, a negative one drops
    /// them. Packages sharing an EVR form one tier.
    fn filter_first_sorted_by(&mut self, limit: i32, earliest: bool, by_arch: bool) {
        let mut entries = self.entries();
        entries.sort_by(|a, b| {
            let evr_order = evrcmp(&b.evr, &a.evr);
            a.name
                .cmp(&b.name)
                .then_with(|| if by_arch { a.arch.cmp(&b.arch) } else { Ordering::Equal })
                .then(if earliest { evr_order.reverse() } else { evr_order })
                .then_with(|| a.id.cmp(&b.id))
        });

        let same_group = |a: &Entry, b: &Entry| a.name == b.name && (!by_arch || a.arch == b.arch);
        let mut matched = self.new_map();
        for group in entries.chunk_by(|a, b| same_group(a, b)) {
            let mut tier: u32 = 0;
            let mut previous_evr = &group[0].evr;
            for entry in group {
                if entry.evr != *previous_evr {
                    tier += 1;
                    previous_evr = &entry.evr;
                }
                let keep = if limit > 0 { tier < limit as u32 } else { tier >= limit.unsigned_abs() };
                if keep {
                    matched.add_unchecked(entry.id);
                }
            }
        }
        self.apply(&matched, false);
    }

    /// Keep the `limit` newest EVRs of each name and arch
    ///
    /// A negative `limit` drops the `-limit` newest instead; zero keeps
    /// everything.
    pub fn filter_latest_evr(&mut self, limit: i32) {
        self.filter_first_sorted_by(limit, false, true);
    }

    /// [`filter_latest_evr`](Self::filter_latest_evr) grouping by name only
    pub fn filter_latest_evr_any_arch(&mut self, limit: i32) {
        self.filter_first_sorted_by(limit, false, false);
    }

    /// Keep the `limit` oldest EVRs of each name and arch
    pub fn filter_earliest_evr(&mut self, limit: i32) {
        self.filter_first_sorted_by(limit, true, true);
    }

    pub fn filter_earliest_evr_any_arch(&mut self, limit: i32) {
        self.filter_first_sorted_by(limit, true, false);
    }

    /// Keep, per name and arch, only packages of the best-priority repository
    ///
    /// Lower priority numbers win. Installed packages are always kept.
    pub fn filter_priority(&mut self) {
        let mut best: std::collections::HashMap<(String, String), i32> = Default::default();
        {
            let pool = self.set.sack().pool();
            for id in self.set.ids() {
                if pool.is_installed(id) {
                    continue;
                }
                let s = pool.solvable(id);
                let priority = pool.repo(s.repo).priority;
                best.entry((s.name.clone(), s.arch.clone()))
                    .and_modify(|p| *p = (*p).min(priority))
                    .or_insert(priority);
            }
        }
        let matched = self.select_with(|pool, id| {
            if pool.is_installed(id) {
                return true;
            }
            let s = pool.solvable(id);
            best.get(&(s.name.clone(), s.arch.clone())) == Some(&pool.repo(s.repo).priority)
        });
        self.apply(&matched, false);
    }

    /// Keep installed packages whose name and arch occur more than once
    ///
    /// Installonly packages are expected to have several versions installed
    /// and are left out.
    pub fn filter_duplicates(&mut self) {
        self.filter_installed();

        let sack = self.set.sack().clone();
        let mut installonly = PackageQuery::with_flags(&sack, ExcludeFlags::IGNORE_EXCLUDES);
        installonly.filter_installonly();
        self.set -= &*installonly;

        let entries = self.entries();
        let mut counts: std::collections::HashMap<(&str, &str), usize> = Default::default();
        for entry in &entries {
            *counts.entry((entry.name.as_str(), entry.arch.as_str())).or_default() += 1;
        }
        let mut matched = self.new_map();
        for entry in &entries {
            if counts[&(entry.name.as_str(), entry.arch.as_str())] > 1 {
                matched.add_unchecked(entry.id);
            }
        }
        self.apply(&matched, false);
    }

    /// Keep installed packages no available package matches
    ///
    /// With `exact_evr` a match needs the same NEVRA, otherwise the same name
    /// and arch. Regular excludes do not hide available packages here.
    pub fn filter_extras(&mut self, exact_evr: bool) {
        self.filter_installed();
        let sack = self.set.sack().clone();
        let mut available = PackageQuery::with_flags(&sack, ExcludeFlags::IGNORE_REGULAR_EXCLUDES);
        available.filter_available();
        if exact_evr {
            self.filter_nevra_set(&available, QueryCmp::NEQ);
        } else {
            self.filter_name_arch(&available, QueryCmp::NEQ);
        }
    }

    /// Keep packages providing any configured `installonlypkgs` entry
    pub fn filter_installonly(&mut self) {
        let patterns = self.set.sack().config().installonlypkgs.clone();
        self.filter_provides(&patterns, QueryCmp::EQ);
    }

    /// Drop packages in the sack's versionlock excludes
    pub fn filter_versionlock(&mut self) {
        if let Some(excluded) = self.set.sack().versionlock_excludes() {
            self.set -= &excluded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::pool::{PackageInfo, Repo};
    use crate::sack::PackageSack;

    fn latest_sack() -> PackageSack {
        let sack = PackageSack::new();
        let a = sack.add_repo(Repo::new("a"));
        let b = sack.add_repo(Repo::new("b"));
        for (repo, evr, arch) in [
            (a, "1-1", "x86_64"),
            (a, "2-1", "x86_64"),
            (b, "2-1", "x86_64"),
            (a, "3-1", "x86_64"),
            (a, "3-1", "i686"),
        ] {
            sack.add_package(repo, PackageInfo::new("foo", evr, arch)).unwrap();
        }
        sack
    }

    fn latest(limit: i32, f: fn(&mut PackageQuery, i32)) -> Vec<String> {
        let sack = latest_sack();
        let mut query = PackageQuery::new(&sack);
        f(&mut query, limit);
        nevras(&query)
    }

    // ===================
    // Latest / earliest
    // ===================

    #[test]
    fn test_latest_tiers() {
        assert_eq!(
            latest(1, PackageQuery::filter_latest_evr),
            vec!["foo-3-1.i686@a", "foo-3-1.x86_64@a"]
        );
        // Packages sharing an EVR form one tier
        assert_eq!(latest(2, PackageQuery::filter_latest_evr).len(), 4);
        assert_eq!(
            latest(-1, PackageQuery::filter_latest_evr),
            vec!["foo-1-1.x86_64@a", "foo-2-1.x86_64@a", "foo-2-1.x86_64@b"]
        );
    }

    #[test]
    fn test_latest_zero_is_noop() {
        assert_eq!(latest(0, PackageQuery::filter_latest_evr).len(), 5);
    }

    #[test]
    fn test_latest_min_limit_drops_everything() {
        let sack = PackageSack::new();
        let repo = sack.add_repo(Repo::new("a"));
        for evr in ["1-1", "2-1"] {
            sack.add_package(repo, PackageInfo::new("foo", evr, "x86_64")).unwrap();
        }
        for f in [
            PackageQuery::filter_latest_evr,
            PackageQuery::filter_earliest_evr,
            PackageQuery::filter_latest_evr_any_arch,
            PackageQuery::filter_earliest_evr_any_arch,
        ] {
            let mut query = PackageQuery::new(&sack);
            f(&mut query, i32::MIN);
            assert!(query.is_empty());
        }
    }

    #[test]
    fn test_earliest_and_any_arch() {
        assert_eq!(
            latest(1, PackageQuery::filter_earliest_evr),
            vec!["foo-1-1.x86_64@a", "foo-3-1.i686@a"]
        );
        assert_eq!(
            latest(1, PackageQuery::filter_latest_evr_any_arch),
            vec!["foo-3-1.i686@a", "foo-3-1.x86_64@a"]
        );
        assert_eq!(
            latest(1, PackageQuery::filter_earliest_evr_any_arch),
            vec!["foo-1-1.x86_64@a"]
        );
    }

    // ===================
    // Priority / duplicates / extras
    // ===================

    #[test]
    fn test_priority_prefers_lower_number() {
        let sack = sample_sack();
        let mut query = PackageQuery::new(&sack);
        query.filter_name(&["bash", "vim"], QueryCmp::EQ);
        query.filter_priority();
        assert_eq!(
            nevras(&query),
            vec![
                "bash-1:4.0-1.x86_64@updates",
                "bash-5.1-1.x86_64@@System",
                "bash-5.2-1.i686@fedora",
                "bash-5.2-1.src@fedora",
                "bash-5.2-2.x86_64@updates",
                "vim-9.0-1.x86_64@fedora",
            ]
        );
    }

    #[test]
    fn test_duplicates_skip_installonly() {
        let sack = sample_sack();
        let system = sack.pool().find_repo("@System").unwrap();
        sack.add_package(system, PackageInfo::new("tzdata", "2023b-1", "noarch"))
            .unwrap();

        let mut query = PackageQuery::new(&sack);
        query.filter_duplicates();
        assert_eq!(
            nevras(&query),
            vec!["tzdata-2023a-1.noarch@@System", "tzdata-2023b-1.noarch@@System"]
        );
    }

    #[test]
    fn test_installonly_uses_config() {
        let sack = sample_sack();
        let mut query = PackageQuery::new(&sack);
        query.filter_installonly();
        assert_eq!(query.len(), 2);
    }

    #[test]
    fn test_extras() {
        let sack = sample_sack();
        let mut exact = PackageQuery::new(&sack);
        exact.filter_extras(true);
        assert_eq!(
            nevras(&exact),
            vec![
                "bash-5.1-1.x86_64@@System",
                "kernel-6.1-1.x86_64@@System",
                "kernel-6.2-1.x86_64@@System",
                "tzdata-2023a-1.noarch@@System",
            ]
        );

        let mut by_name = PackageQuery::new(&sack);
        by_name.filter_extras(false);
        assert_eq!(by_name.len(), 2);
    }

    #[test]
    fn test_versionlock_filter() {
        let sack = sample_sack();
        let mut vim = PackageQuery::new(&sack);
        vim.filter_name(&["vim"], QueryCmp::EQ);
        sack.set_versionlock_excludes(&vim);

        let mut query = PackageQuery::with_flags(&sack, ExcludeFlags::IGNORE_VERSIONLOCK);
        assert_eq!(query.len(), 14);
        query.filter_versionlock();
        assert_eq!(query.len(), 13);
    }
}
