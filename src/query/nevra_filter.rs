// src/query/nevra_filter.rs

//! NEVRA filters: whole NEVRA strings, parsed [`Nevra`] patterns and
//! comparisons against another package set

use super::PackageQuery;
use super::cmp::{QueryCmp, StringMatcher, check_supported, normalize_comparator, ordering_matches};
use crate::nevra::Nevra;
use crate::package_set::PackageSet;
use crate::pool::{PackageId, Solvable};
use crate::solv_map::SolvMap;
use crate::version::evrcmp;
use std::cmp::Ordering;
use std::collections::HashMap;

/// `name-version-release.arch`, ignoring any epoch
fn nevra_without_epoch(s: &Solvable) -> String {
    format!("{}-{}-{}.{}", s.name, s.version, s.release, s.arch)
}

/// Split `name-[epoch:]version-release.arch` into name, EVR and arch
///
/// A `0:` epoch is dropped so the EVR compares equal to stored EVRs.
fn split_nevra(pattern: &str) -> Option<(&str, String, &str)> {
    let (rest, arch) = pattern.rsplit_once('.')?;
    let (rest, release) = rest.rsplit_once('-')?;
    let (name, ev) = rest.rsplit_once('-')?;
    if name.is_empty() || ev.is_empty() || release.is_empty() || arch.is_empty() {
        return None;
    }
    let ev = ev.strip_prefix("0:").unwrap_or(ev);
    Some((name, format!("{}-{}", ev, release), arch))
}

/// One field of a [`Nevra`] pattern
struct FieldPattern {
    matcher: Option<StringMatcher>,
}

impl FieldPattern {
    /// An empty field, or `*` under a glob comparator, accepts anything
    fn new(value: &str, cmp: QueryCmp, glob: bool) -> Self {
        let matcher = if value.is_empty() || (glob && value == "*") {
            None
        } else {
            StringMatcher::new(normalize_comparator(cmp, value), value)
        };
        Self { matcher }
    }

    fn matches(&self, candidate: &str) -> bool {
        self.matcher.as_ref().is_none_or(|m| m.matches(candidate))
    }
}

/// One member in a [`NevraIndex`]
struct IndexEntry {
    name: String,
    arch: String,
    evr: String,
    id: PackageId,
}

/// Members sorted by name, arch and EVR for binary searches
struct NevraIndex {
    entries: Vec<IndexEntry>,
}

impl NevraIndex {
    fn build(query: &PackageQuery) -> Self {
        let pool = query.set.sack().pool();
        let mut entries: Vec<IndexEntry> = query
            .set
            .ids()
            .map(|id| {
                let s = pool.solvable(id);
                IndexEntry {
                    name: s.name.clone(),
                    arch: s.arch.clone(),
                    evr: s.evr.clone(),
                    id,
                }
            })
            .collect();
        entries.sort_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.arch.cmp(&b.arch))
                .then_with(|| evrcmp(&a.evr, &b.evr))
        });
        Self { entries }
    }

    /// Members named `name` on `arch` whose EVR compares to `evr` as `cmp` asks
    fn matching(&self, name: &str, arch: &str, evr: &str, cmp: QueryCmp) -> impl Iterator<Item = PackageId> + '_ {
        let start = self
            .entries
            .partition_point(|e| (e.name.as_str(), e.arch.as_str()) < (name, arch));
        let len = self.entries[start..].partition_point(|e| e.name == name && e.arch == arch);
        let group = &self.entries[start..start + len];

        let lower = group.partition_point(|e| evrcmp(&e.evr, evr) == Ordering::Less);
        let upper = group.partition_point(|e| evrcmp(&e.evr, evr) != Ordering::Greater);
        let below = if cmp.contains(QueryCmp::LT) { 0 } else if cmp.contains(QueryCmp::EQ) { lower } else { upper };
        let above = if cmp.contains(QueryCmp::GT) {
            group.len()
        } else if cmp.contains(QueryCmp::EQ) {
            upper
        } else {
            lower
        };
        group[below..above.max(below)].iter().map(|e| e.id)
    }
}

impl PackageQuery {
    /// Members matching one NEVRA string pattern under a positive comparator
    pub(crate) fn nevra_string_matches(&self, pattern: &str, positive: QueryCmp) -> SolvMap {
        self.nevra_pattern_matches(pattern, positive, &mut None)
    }

    /// [`nevra_string_matches`](Self::nevra_string_matches) sharing a lazily
    /// built index across patterns
    fn nevra_pattern_matches(&self, pattern: &str, positive: QueryCmp, index: &mut Option<NevraIndex>) -> SolvMap {
        let cmp = normalize_comparator(positive, pattern);
        if cmp == QueryCmp::GLOB || cmp == QueryCmp::IGLOB {
            let Some(matcher) = StringMatcher::new(cmp, pattern) else {
                return self.new_map();
            };
            let with_epoch = pattern.contains(':');
            return self.select(|s| {
                let nevra = if with_epoch { s.full_nevra() } else { nevra_without_epoch(s) };
                matcher.matches(&nevra)
            });
        }
        if cmp == QueryCmp::IEXACT {
            let lowered = pattern.to_lowercase();
            return self.select(|s| s.nevra().to_lowercase() == lowered);
        }

        let mut matched = self.new_map();
        let Some((name, evr, arch)) = split_nevra(pattern) else {
            return matched;
        };
        let index = index.get_or_insert_with(|| NevraIndex::build(self));
        for id in index.matching(name, arch, &evr, cmp) {
            matched.add_unchecked(id);
        }
        matched
    }

    /// Members matching a parsed NEVRA pattern
    ///
    /// Each non-empty field must match; the epoch compares as its decimal
    /// string. `with_src = false` skips source packages.
    pub(crate) fn nevra_struct_matches(&self, pattern: &Nevra, positive: QueryCmp, with_src: bool) -> SolvMap {
        let glob = positive.contains(QueryCmp::GLOB);
        let name_cmp = normalize_comparator(positive, &pattern.name);
        let all_names = glob && pattern.name == "*";
        let name = (!all_names).then(|| StringMatcher::new(name_cmp, &pattern.name)).flatten();

        let epoch = FieldPattern::new(&pattern.epoch, positive, glob);
        let version = FieldPattern::new(&pattern.version, positive, glob);
        let release = FieldPattern::new(&pattern.release, positive, glob);
        let arch = FieldPattern::new(&pattern.arch, positive, glob);

        let valid = |s: &Solvable| {
            (with_src || !s.is_source())
                && epoch.matches(&s.epoch.to_string())
                && version.matches(&s.version)
                && release.matches(&s.release)
                && arch.matches(&s.arch)
        };

        if pattern.name.is_empty() {
            if pattern.is_empty() {
                return self.new_map();
            }
            return self.select(valid);
        }
        if name_cmp == QueryCmp::EQ {
            let mut matched = self.new_map();
            let pool = self.set.sack().pool();
            for id in pool.ids_by_name(&pattern.name) {
                if self.set.contains_id(*id) && valid(pool.solvable(*id)) {
                    matched.add_unchecked(*id);
                }
            }
            return matched;
        }
        self.select(|s| name.as_ref().is_none_or(|m| m.matches(&s.name)) && valid(s))
    }

    /// Filter by whole NEVRA strings
    ///
    /// EQ, GT, GTE, LT and LTE expect `name-[epoch:]version-release.arch`
    /// and compare EVRs with [`evrcmp`] among packages of the same name and
    /// arch, so EQ agrees with [`filter_nevra_set`](Self::filter_nevra_set):
    /// `1.00` equals `1.0`. GLOB and IGLOB match against the NEVRA without epoch, or with
    /// epoch when the pattern contains `:`. IEXACT ignores case.
    ///
    /// # Panics
    ///
    /// Panics on any other comparator.
    pub fn filter_nevra<S: AsRef<str>>(&mut self, patterns: &[S], cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported(
            "filter_nevra",
            positive,
            &[
                QueryCmp::EQ,
                QueryCmp::GT,
                QueryCmp::GTE,
                QueryCmp::LT,
                QueryCmp::LTE,
                QueryCmp::GLOB,
                QueryCmp::IGLOB,
                QueryCmp::IEXACT,
            ],
        );
        let mut matched = self.new_map();
        let mut index = None;
        for pattern in patterns {
            matched |= &self.nevra_pattern_matches(pattern.as_ref(), positive, &mut index);
        }
        self.apply(&matched, negate);
    }

    /// Filter by a parsed NEVRA pattern
    ///
    /// Supports EQ, IEXACT, GLOB and IGLOB, applied field by field. Empty
    /// fields accept anything; an entirely empty pattern matches nothing.
    pub fn filter_nevra_struct(&mut self, pattern: &Nevra, cmp: QueryCmp, with_src: bool) {
        let (negate, positive) = cmp.split_not();
        check_supported(
            "filter_nevra",
            positive,
            &[QueryCmp::EQ, QueryCmp::IEXACT, QueryCmp::GLOB, QueryCmp::IGLOB],
        );
        let matched = self.nevra_struct_matches(pattern, positive, with_src);
        self.apply(&matched, negate);
    }

    /// Compare members against the members of `set` with the same name and arch
    ///
    /// EQ keeps members whose NEVRA appears in `set`; GT, GTE, LT and LTE
    /// keep members ordered that way against at least one of them.
    pub fn filter_nevra_set(&mut self, set: &PackageSet, cmp: QueryCmp) {
        let (negate, positive) = cmp.split_not();
        check_supported(
            "filter_nevra",
            positive,
            &[QueryCmp::EQ, QueryCmp::GT, QueryCmp::GTE, QueryCmp::LT, QueryCmp::LTE],
        );

        let mut targets: HashMap<(String, String), Vec<String>> = HashMap::new();
        {
            let pool = set.sack().pool();
            for id in set.ids() {
                let s = pool.solvable(id);
                targets
                    .entry((s.name.clone(), s.arch.clone()))
                    .or_default()
                    .push(s.evr.clone());
            }
        }

        let matched = self.select(|s| {
            targets
                .get(&(s.name.clone(), s.arch.clone()))
                .is_some_and(|evrs| evrs.iter().any(|evr| ordering_matches(positive, evrcmp(&s.evr, evr))))
        });
        self.apply(&matched, negate);
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::pool::{PackageInfo, Repo};
    use crate::sack::PackageSack;

    fn query_with(f: impl FnOnce(&mut PackageQuery)) -> Vec<String> {
        let sack = sample_sack();
        let mut query = PackageQuery::new(&sack);
        f(&mut query);
        nevras(&query)
    }

    #[test]
    fn test_split_nevra() {
        assert_eq!(
            split_nevra("bash-0:5.2-1.fc39.x86_64"),
            Some(("bash", "5.2-1.fc39".to_string(), "x86_64"))
        );
        assert_eq!(
            split_nevra("perl-Foo-Bar-1:2-3.noarch"),
            Some(("perl-Foo-Bar", "1:2-3".to_string(), "noarch"))
        );
        assert_eq!(split_nevra("bash"), None);
    }

    // ===================
    // String patterns
    // ===================

    #[test]
    fn test_nevra_string_eq() {
        assert_eq!(
            query_with(|q| q.filter_nevra(&["bash-5.2-1.i686"], QueryCmp::EQ)),
            vec!["bash-5.2-1.i686@fedora"]
        );
        assert_eq!(
            query_with(|q| q.filter_nevra(&["bash-0:5.1-1.x86_64"], QueryCmp::EQ)),
            vec!["bash-5.1-1.x86_64@@System"]
        );
        assert_eq!(
            query_with(|q| q.filter_nevra(&["bash-1:4.0-1.x86_64"], QueryCmp::EQ)).len(),
            1
        );
        assert!(query_with(|q| q.filter_nevra(&["not a nevra"], QueryCmp::EQ)).is_empty());
    }

    #[test]
    fn test_nevra_string_eq_uses_evr_comparison() {
        let sack = PackageSack::new();
        let repo = sack.add_repo(Repo::new("base"));
        sack.add_package(repo, PackageInfo::new("foo", "1.0-1", "x86_64")).unwrap();
        sack.add_package(repo, PackageInfo::new("foo", "1.1-1", "x86_64")).unwrap();
        sack.add_package(repo, PackageInfo::new("foo", "1.0-1", "noarch")).unwrap();

        let mut by_string = PackageQuery::new(&sack);
        by_string.filter_nevra(&["foo-1.00-1.x86_64"], QueryCmp::EQ);
        assert_eq!(nevras(&by_string), vec!["foo-1.0-1.x86_64@base"]);

        let mut by_set = PackageQuery::new(&sack);
        by_set.filter_nevra_set(&by_string, QueryCmp::EQ);
        assert_eq!(nevras(&by_set), nevras(&by_string));
    }

    #[test]
    fn test_nevra_string_patterns_share_one_index() {
        let got = query_with(|q| {
            q.filter_nevra(
                &["bash-5.2-1.x86_64", "glibc-2.35-1.x86_64", "bash-5.2-1.i686", "nothing-1-1.x86_64"],
                QueryCmp::GTE,
            )
        });
        assert_eq!(
            got,
            vec![
                "bash-1:4.0-1.x86_64@updates",
                "bash-5.2-1.i686@fedora",
                "bash-5.2-1.x86_64@fedora",
                "bash-5.2-2.x86_64@updates",
                "glibc-2.35-1.x86_64@updates",
            ]
        );
    }

    #[test]
    fn test_nevra_string_ordering() {
        let got = query_with(|q| q.filter_nevra(&["bash-5.2-1.x86_64"], QueryCmp::GT));
        assert_eq!(got, vec!["bash-1:4.0-1.x86_64@updates", "bash-5.2-2.x86_64@updates"]);

        let got = query_with(|q| q.filter_nevra(&["bash-5.2-1.x86_64"], QueryCmp::LTE));
        assert_eq!(got, vec!["bash-5.1-1.x86_64@@System", "bash-5.2-1.x86_64@fedora"]);
    }

    #[test]
    fn test_nevra_string_glob_and_iexact() {
        assert_eq!(query_with(|q| q.filter_nevra(&["bash-5.2-*.x86_64"], QueryCmp::GLOB)).len(), 2);
        // Without ':' the epoch is not part of the matched string
        assert_eq!(query_with(|q| q.filter_nevra(&["bash-4.0-*"], QueryCmp::GLOB)).len(), 1);
        assert_eq!(query_with(|q| q.filter_nevra(&["bash-1:*"], QueryCmp::GLOB)).len(), 1);
        assert_eq!(query_with(|q| q.filter_nevra(&["bash-0:5*"], QueryCmp::GLOB)).len(), 5);
        assert_eq!(query_with(|q| q.filter_nevra(&["VIM-9.0-1.X86_64"], QueryCmp::IEXACT)).len(), 1);
        assert_eq!(
            query_with(|q| q.filter_nevra(&["vim-9.0-1.x86_64"], QueryCmp::NEQ)).len(),
            13
        );
    }

    // ===================
    // Parsed patterns
    // ===================

    #[test]
    fn test_nevra_struct_fields() {
        let pattern = Nevra::new("bash", "", "5.2", "", "");
        assert_eq!(query_with(|q| q.filter_nevra_struct(&pattern, QueryCmp::EQ, true)).len(), 4);
        assert_eq!(query_with(|q| q.filter_nevra_struct(&pattern, QueryCmp::EQ, false)).len(), 3);

        let pattern = Nevra::new("bash", "1", "", "", "");
        assert_eq!(
            query_with(|q| q.filter_nevra_struct(&pattern, QueryCmp::EQ, true)),
            vec!["bash-1:4.0-1.x86_64@updates"]
        );

        let pattern = Nevra::new("bash", "0", "5.2", "1", "x86_64");
        assert_eq!(query_with(|q| q.filter_nevra_struct(&pattern, QueryCmp::EQ, true)).len(), 1);
    }

    #[test]
    fn test_nevra_struct_globs_and_case() {
        let all = Nevra::new("*", "", "", "", "noarch");
        assert_eq!(query_with(|q| q.filter_nevra_struct(&all, QueryCmp::GLOB, true)).len(), 2);

        let pattern = Nevra::new("b?sh", "", "5.*", "", "*");
        assert_eq!(query_with(|q| q.filter_nevra_struct(&pattern, QueryCmp::GLOB, false)).len(), 4);

        let pattern = Nevra::new("BASH", "", "", "", "I686");
        assert_eq!(query_with(|q| q.filter_nevra_struct(&pattern, QueryCmp::IEXACT, true)).len(), 1);

        let no_name = Nevra::new("", "", "", "", "i686");
        assert_eq!(query_with(|q| q.filter_nevra_struct(&no_name, QueryCmp::EQ, true)).len(), 1);
        assert!(query_with(|q| q.filter_nevra_struct(&Nevra::default(), QueryCmp::EQ, true)).is_empty());
    }

    // ===================
    // Package sets
    // ===================

    #[test]
    fn test_nevra_set() {
        let sack = sample_sack();
        let mut installed = PackageQuery::new(&sack);
        installed.filter_installed();

        let mut same = PackageQuery::new(&sack);
        same.filter_available();
        same.filter_nevra_set(&installed, QueryCmp::EQ);
        assert_eq!(nevras(&same), vec!["glibc-2.34-1.x86_64@fedora"]);

        let mut newer = PackageQuery::new(&sack);
        newer.filter_available();
        newer.filter_nevra_set(&installed, QueryCmp::GT);
        assert_eq!(
            nevras(&newer),
            vec![
                "bash-1:4.0-1.x86_64@updates",
                "bash-5.2-1.x86_64@fedora",
                "bash-5.2-2.x86_64@updates",
                "glibc-2.35-1.x86_64@updates",
                "tzdata-2024a-1.noarch@updates",
            ]
        );
    }
}
