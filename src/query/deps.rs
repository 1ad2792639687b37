// src/query/deps.rs

//! Dependency filters

use super::PackageQuery;
use super::cmp::{QueryCmp, check_supported, normalize_comparator};
use crate::package_set::PackageSet;
use crate::pool::{DepKind, ReldepId};
use crate::reldep::{Reldep, ReldepList};
use crate::solv_map::SolvMap;
use std::collections::HashMap;

/// Generates the string and [`ReldepList`] filters for one dependency kind,
/// plus the [`PackageSet`] filter when a set method name is given
macro_rules! dep_filters {
    ($kind:expr, $label:literal, $strings:ident, $reldeps:ident $(, $set:ident)?) => {
        #[doc = concat!("Keep members whose ", $label, " match any dependency string")]
        ///
        /// Supports EQ and GLOB; glob names expand over the provide names
        /// known to the pool.
        pub fn $strings<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
            self.filter_dep_strings($kind, stringify!($strings), patterns, cmp);
        }

        #[doc = concat!("Keep members whose ", $label, " match any listed dependency; supports EQ")]
        pub fn $reldeps(&mut self, reldeps: &ReldepList, cmp: QueryCmp) {
            self.filter_dep_reldeps($kind, stringify!($strings), reldeps, cmp);
        }

        $(
            #[doc = concat!("Keep members whose ", $label, " are satisfied by a member of `set`; supports EQ")]
            pub fn $set(&mut self, set: &PackageSet, cmp: QueryCmp) {
                self.filter_dep_set($kind, stringify!($strings), set, cmp);
            }
        )?
    };
}

impl PackageQuery {
    /// Parse dependency strings into a list, expanding glob names
    fn reldeps_from_strings<S: AsRef<str>>(&self, patterns: &[S], positive: QueryCmp) -> ReldepList {
        let sack = self.set.sack().clone();
        let mut list = ReldepList::new(&sack);
        for pattern in patterns {
            let pattern = pattern.as_ref();
            if normalize_comparator(positive, pattern) == QueryCmp::GLOB {
                list.add_reldep_with_glob(pattern);
            } else {
                list.add_reldep(pattern);
            }
        }
        list
    }

    /// Members with a `kind` dependency intersecting any of `reldeps`
    ///
    /// Provides are looked up through the provider index, which also covers
    /// file provides.
    pub(crate) fn dep_matches(&self, kind: DepKind, reldeps: &ReldepList) -> SolvMap {
        let wanted = reldeps.to_vec();
        if kind == DepKind::Provides {
            let mut matched = {
                let pool = self.set.sack().pool();
                let mut providers = SolvMap::new(pool.nsolvables());
                for reldep in &wanted {
                    providers |= &pool.whatprovides_all(reldep);
                }
                providers
            };
            matched &= self.set.map();
            return matched;
        }

        let ids = reldeps.ids();
        self.select_with(|pool, id| {
            pool.solvable(id).deps(kind).iter().any(|dep| {
                ids.contains(dep) || {
                    let dep = pool.reldep(*dep);
                    wanted.iter().any(|w| w.intersects(dep))
                }
            })
        })
    }

    fn filter_dep_strings<S: AsRef<str>>(&mut self, kind: DepKind, filter: &str, patterns: &[S], cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported(filter, positive, &[QueryCmp::EQ, QueryCmp::GLOB]);
        let reldeps = self.reldeps_from_strings(patterns, positive);
        let matched = self.dep_matches(kind, &reldeps);
        self.apply(&matched, negate);
    }

    fn filter_dep_reldeps(&mut self, kind: DepKind, filter: &str, reldeps: &ReldepList, cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported(filter, positive, &[QueryCmp::EQ]);
        assert!(
            self.set.sack().same_as(reldeps.sack()),
            "{}: used different sack",
            filter
        );
        let matched = self.dep_matches(kind, reldeps);
        self.apply(&matched, negate);
    }

    fn filter_dep_set(&mut self, kind: DepKind, filter: &str, set: &PackageSet, cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported(filter, positive, &[QueryCmp::EQ]);
        assert!(self.set.sack().same_as(set.sack()), "{}: used different sack", filter);

        let mut satisfied: HashMap<ReldepId, bool> = HashMap::new();
        let matched = self.select_with(|pool, id| {
            pool.solvable(id).deps(kind).iter().any(|dep| {
                *satisfied
                    .entry(*dep)
                    .or_insert_with(|| !pool.whatprovides_all(pool.reldep(*dep)).is_intersection_empty(set.map()))
            })
        });
        self.apply(&matched, negate);
    }

    // ========================================================================
    // Per-kind filters
    // ========================================================================

    dep_filters!(DepKind::Provides, "provides", filter_provides, filter_provides_reldeps);
    dep_filters!(
        DepKind::Requires,
        "requires",
        filter_requires,
        filter_requires_reldeps,
        filter_requires_set
    );
    dep_filters!(
        DepKind::Conflicts,
        "conflicts",
        filter_conflicts,
        filter_conflicts_reldeps,
        filter_conflicts_set
    );
    dep_filters!(DepKind::Obsoletes, "obsoletes", filter_obsoletes, filter_obsoletes_reldeps);
    dep_filters!(
        DepKind::Recommends,
        "recommends",
        filter_recommends,
        filter_recommends_reldeps,
        filter_recommends_set
    );
    dep_filters!(
        DepKind::Suggests,
        "suggests",
        filter_suggests,
        filter_suggests_reldeps,
        filter_suggests_set
    );
    dep_filters!(
        DepKind::Supplements,
        "supplements",
        filter_supplements,
        filter_supplements_reldeps,
        filter_supplements_set
    );
    dep_filters!(
        DepKind::Enhances,
        "enhances",
        filter_enhances,
        filter_enhances_reldeps,
        filter_enhances_set
    );

    /// Keep members obsoleting a member of `set`
    ///
    /// An obsolete matches a target when the names are equal and the
    /// target's EVR satisfies the obsolete's range. Supports EQ.
    pub fn filter_obsoletes_set(&mut self, set: &PackageSet, cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_obsoletes", positive, &[QueryCmp::EQ]);
        assert!(
            self.set.sack().same_as(set.sack()),
            "filter_obsoletes: used different sack"
        );

        let mut targets: HashMap<String, Vec<String>> = HashMap::new();
        {
            let pool = set.sack().pool();
            for id in set.ids() {
                let s = pool.solvable(id);
                targets.entry(s.name.clone()).or_default().push(s.evr.clone());
            }
        }

        let matched = self.select_with(|pool, id| {
            pool.solvable(id).obsoletes.iter().any(|dep| {
                let dep: &Reldep = pool.reldep(*dep);
                targets
                    .get(&dep.name)
                    .is_some_and(|evrs| evrs.iter().any(|evr| dep.matches_evr(&dep.name, evr)))
            })
        });
        self.apply(&matched, negate);
    }
}
