// src/query/attrs.rs

//! Filters on plain package attributes

use super::PackageQuery;
use super::cmp::{QueryCmp, StringMatcher, check_supported, normalize_comparator, ordering_matches};
use crate::package_set::PackageSet;
use crate::pool::Solvable;
use crate::version::{evrcmp_match_release, rpmvercmp};
use glob::Pattern;
use std::cmp::Ordering;
use std::collections::HashSet;

const STRING_CMPS: &[QueryCmp] = &[
    QueryCmp::EQ,
    QueryCmp::IEXACT,
    QueryCmp::GLOB,
    QueryCmp::IGLOB,
    QueryCmp::CONTAINS,
    QueryCmp::ICONTAINS,
];

const ORDER_CMPS: &[QueryCmp] = &[QueryCmp::EQ, QueryCmp::GT, QueryCmp::GTE, QueryCmp::LT, QueryCmp::LTE];

const ORDER_OR_GLOB_CMPS: &[QueryCmp] = &[
    QueryCmp::EQ,
    QueryCmp::GT,
    QueryCmp::GTE,
    QueryCmp::LT,
    QueryCmp::LTE,
    QueryCmp::GLOB,
];

const EXACT_OR_GLOB_CMPS: &[QueryCmp] = &[QueryCmp::EQ, QueryCmp::GLOB];

fn compile<S: AsRef<str>>(patterns: &[S], cmp: QueryCmp) -> Vec<StringMatcher> {
    patterns
        .iter()
        .filter_map(|pattern| StringMatcher::new(cmp, pattern.as_ref()))
        .collect()
}

/// Pattern for an ordered attribute: a glob or a value to compare against
enum OrderedPattern {
    Glob(Option<Pattern>),
    Value(String),
}

impl OrderedPattern {
    fn new(cmp: QueryCmp, pattern: &str) -> Self {
        if normalize_comparator(cmp, pattern) == QueryCmp::GLOB {
            Self::Glob(Pattern::new(pattern).ok())
        } else {
            Self::Value(pattern.to_string())
        }
    }

    fn matches(&self, cmp: QueryCmp, candidate: &str, compare: fn(&str, &str) -> Ordering) -> bool {
        match self {
            Self::Glob(Some(glob)) => glob.matches(candidate),
            Self::Glob(None) => false,
            Self::Value(value) => {
                // GLOB without metacharacters degrades to EQ
                let cmp = if cmp == QueryCmp::GLOB { QueryCmp::EQ } else { cmp };
                ordering_matches(cmp, compare(candidate, value))
            }
        }
    }
}

impl PackageQuery {
    /// Apply a string filter over one attribute of each member
    fn filter_string_attr<S: AsRef<str>>(
        &mut self,
        filter: &str,
        patterns: &[S],
        cmp: QueryCmp,
        supported: &[QueryCmp],
        attr: impl Fn(&Solvable) -> &str,
    ) {
        let (negate, positive) = cmp.split_not();
        check_supported(filter, positive, supported);
        let matchers = compile(patterns, positive);
        let matched = self.select(|s| {
            let value = attr(s);
            matchers.iter().any(|m| m.matches(value))
        });
        self.apply(&matched, negate);
    }

    /// Apply an ordered filter (rpmvercmp or EVR comparison) over one attribute
    fn filter_ordered_attr<S: AsRef<str>>(
        &mut self,
        filter: &str,
        patterns: &[S],
        cmp: QueryCmp,
        supported: &[QueryCmp],
        attr: impl Fn(&Solvable) -> &str,
        compare: fn(&str, &str) -> Ordering,
    ) {
        let (negate, positive) = cmp.split_not();
        check_supported(filter, positive, supported);
        let compiled: Vec<OrderedPattern> = patterns
            .iter()
            .map(|p| OrderedPattern::new(positive, p.as_ref()))
            .collect();
        let matched = self.select(|s| {
            let value = attr(s);
            compiled.iter().any(|p| p.matches(positive, value, compare))
        });
        self.apply(&matched, negate);
    }

    // ========================================================================
    // Identity
    // ========================================================================

    /// Filter by package name
    ///
    /// Supports EQ, IEXACT, GLOB, IGLOB, CONTAINS and ICONTAINS.
    ///
    /// # Panics
    ///
    /// Panics on any other comparator.
    pub fn filter_name<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_name", positive, STRING_CMPS);

        // Exact names go through the name index
        if positive == QueryCmp::EQ {
            let mut matched = self.new_map();
            {
                let pool = self.set.sack().pool();
                for pattern in patterns {
                    for id in pool.ids_by_name(pattern.as_ref()) {
                        if self.set.contains_id(*id) {
                            matched.add_unchecked(*id);
                        }
                    }
                }
            }
            self.apply(&matched, negate);
            return;
        }
        self.filter_string_attr("filter_name", patterns, cmp, STRING_CMPS, |s| &s.name);
    }

    /// Keep members sharing a name with a member of `set`
    ///
    /// Supports EQ only.
    pub fn filter_name_set(&mut self, set: &PackageSet, cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_name", positive, &[QueryCmp::EQ]);
        let names: HashSet<String> = set.iter().map(|pkg| pkg.name()).collect();
        let matched = self.select(|s| names.contains(&s.name));
        self.apply(&matched, negate);
    }

    /// Keep members sharing name and arch with a member of `set`
    ///
    /// Supports EQ only.
    pub fn filter_name_arch(&mut self, set: &PackageSet, cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_name_arch", positive, &[QueryCmp::EQ]);
        let keys: HashSet<(String, String)> = set.iter().map(|pkg| (pkg.name(), pkg.arch())).collect();
        let matched = self.select(|s| keys.contains(&(s.name.clone(), s.arch.clone())));
        self.apply(&matched, negate);
    }

    /// Filter by numeric epoch; supports EQ, GT, GTE, LT and LTE
    pub fn filter_epoch(&mut self, epochs: &[u64], cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_epoch", positive, ORDER_CMPS);
        let matched = self.select(|s| {
            epochs
                .iter()
                .any(|epoch| ordering_matches(positive, s.epoch.cmp(epoch)))
        });
        self.apply(&matched, negate);
    }

    /// Filter by epoch rendered as a decimal string; supports EQ and GLOB
    pub fn filter_epoch_str<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_epoch", positive, EXACT_OR_GLOB_CMPS);
        let matchers = compile(patterns, positive);
        let matched = self.select(|s| {
            let epoch = s.epoch.to_string();
            matchers.iter().any(|m| m.matches(&epoch))
        });
        self.apply(&matched, negate);
    }

    /// Filter by version; ordered comparators use rpmvercmp
    ///
    /// Supports EQ, GT, GTE, LT, LTE and GLOB.
    pub fn filter_version<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_ordered_attr(
            "filter_version",
            patterns,
            cmp,
            ORDER_OR_GLOB_CMPS,
            |s| &s.version,
            rpmvercmp,
        );
    }

    /// Filter by release; ordered comparators use rpmvercmp
    ///
    /// Supports EQ, GT, GTE, LT, LTE and GLOB.
    pub fn filter_release<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_ordered_attr(
            "filter_release",
            patterns,
            cmp,
            ORDER_OR_GLOB_CMPS,
            |s| &s.release,
            rpmvercmp,
        );
    }

    /// Filter by `[epoch:]version[-release]`
    ///
    /// The release of a pattern only takes part when present, so `1.0`
    /// equals every `1.0-*`. Supports EQ, GT, GTE, LT and LTE.
    pub fn filter_evr<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_ordered_attr(
            "filter_evr",
            patterns,
            cmp,
            ORDER_CMPS,
            |s| &s.evr,
            evrcmp_match_release,
        );
    }

    /// Filter by architecture; supports EQ and GLOB
    pub fn filter_arch<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_string_attr("filter_arch", patterns, cmp, EXACT_OR_GLOB_CMPS, |s| &s.arch);
    }

    /// Filter by the id of the owning repository; supports EQ and GLOB
    pub fn filter_repo_id<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_repo_id", positive, EXACT_OR_GLOB_CMPS);
        let matchers = compile(patterns, positive);
        let matched = self.select_with(|pool, id| {
            let repo = &pool.repo(pool.solvable(id).repo).id;
            matchers.iter().any(|m| m.matches(repo))
        });
        self.apply(&matched, negate);
    }

    /// Filter by package location inside the repository; supports EQ only
    pub fn filter_location<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_string_attr("filter_location", patterns, cmp, &[QueryCmp::EQ], |s| &s.location);
    }

    /// Filter by source rpm file name; supports EQ and GLOB
    pub fn filter_sourcerpm<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_string_attr("filter_sourcerpm", patterns, cmp, EXACT_OR_GLOB_CMPS, |s| &s.sourcerpm);
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Keep members shipping a file matching any pattern
    ///
    /// Supports EQ, IEXACT, GLOB, IGLOB, CONTAINS and ICONTAINS.
    pub fn filter_file<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported("filter_file", positive, STRING_CMPS);
        let matchers = compile(patterns, positive);
        let matched = self.select(|s| s.files.iter().any(|file| matchers.iter().any(|m| m.matches(file))));
        self.apply(&matched, negate);
    }

    pub fn filter_description<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_string_attr("filter_description", patterns, cmp, STRING_CMPS, |s| &s.description);
    }

    pub fn filter_summary<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_string_attr("filter_summary", patterns, cmp, STRING_CMPS, |s| &s.summary);
    }

    pub fn filter_url<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        self.filter_string_attr("filter_url", patterns, cmp, STRING_CMPS, |s| &s.url);
    }
}
