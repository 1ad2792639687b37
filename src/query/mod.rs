// src/query/mod.rs

//! Package queries
//!
//! A [`PackageQuery`] is a [`PackageSet`] that starts out as every package
//! the sack considers (for the query's [`ExcludeFlags`]) and is narrowed in
//! place by filters. Filters only ever remove packages.
//!
//! Every filter takes a [`QueryCmp`]. The positive part selects the matching
//! members; with `NOT` the matching members are removed instead. An empty
//! pattern list therefore empties the query, or leaves it untouched under
//! `NOT`. Passing a comparator a filter does not support panics.

mod attrs;
pub mod cmp;
mod deps;
mod nevra_filter;
mod resolve;
mod select;
mod updates;

pub use cmp::{QueryCmp, is_glob_pattern, normalize_comparator};
pub use resolve::ResolveSpecSettings;

use crate::package_set::PackageSet;
use crate::pool::{PackageId, Pool, Solvable};
use crate::sack::{ExcludeFlags, PackageSack};
use crate::solv_map::SolvMap;
use std::fmt;
use std::ops::{BitAndAssign, BitOrAssign, Deref, SubAssign};

/// A package set narrowed by filters
#[derive(Clone)]
pub struct PackageQuery {
    set: PackageSet,
    flags: ExcludeFlags,
}

impl PackageQuery {
    /// Every package surviving all exclude layers
    pub fn new(sack: &PackageSack) -> Self {
        Self::with_flags(sack, ExcludeFlags::APPLY_EXCLUDES)
    }

    /// Every package surviving the exclude layers `flags` does not ignore
    pub fn with_flags(sack: &PackageSack, flags: ExcludeFlags) -> Self {
        let mut map = sack.pool().all_packages_map();
        if let Some(considered) = considered_for(sack, flags) {
            map &= &considered;
        }
        Self {
            set: PackageSet::from_map(sack, map),
            flags,
        }
    }

    /// A query with no members
    pub fn empty(sack: &PackageSack, flags: ExcludeFlags) -> Self {
        Self {
            set: PackageSet::new(sack),
            flags,
        }
    }

    /// A query over exactly the members of `set`
    pub fn from_set(set: &PackageSet, flags: ExcludeFlags) -> Self {
        Self {
            set: set.clone(),
            flags,
        }
    }

    pub fn flags(&self) -> ExcludeFlags {
        self.flags
    }

    pub fn into_set(self) -> PackageSet {
        self.set
    }

    pub fn clear(&mut self) {
        self.set.clear();
    }

    // ========================================================================
    // Filter plumbing
    // ========================================================================

    /// Map sized for the current pool
    fn new_map(&self) -> SolvMap {
        SolvMap::new(self.set.sack().pool().nsolvables())
    }

    /// Members whose solvable satisfies `pred`
    fn select(&self, mut pred: impl FnMut(&Solvable) -> bool) -> SolvMap {
        self.select_with(|pool, id| pred(pool.solvable(id)))
    }

    /// Members for which `pred` holds, with access to the whole pool
    fn select_with(&self, mut pred: impl FnMut(&Pool, PackageId) -> bool) -> SolvMap {
        let pool = self.set.sack().pool();
        let mut matched = SolvMap::new(pool.nsolvables());
        for id in self.set.ids() {
            if pred(&*pool, id) {
                matched.add_unchecked(id);
            }
        }
        matched
    }

    /// Keep the members of `matched`, or drop them when `negate` is set
    fn apply(&mut self, matched: &SolvMap, negate: bool) {
        if negate {
            *self.set.map_mut() -= matched;
        } else {
            *self.set.map_mut() &= matched;
        }
    }

    /// Considered map for this query's flags; `None` means no restriction
    fn considered_map(&self) -> Option<SolvMap> {
        considered_for(self.set.sack(), self.flags)
    }
}

/// The sack's considered map for `flags`, refreshing the pool's copy first
fn considered_for(sack: &PackageSack, flags: ExcludeFlags) -> Option<SolvMap> {
    if flags == ExcludeFlags::APPLY_EXCLUDES {
        sack.recompute_considered_in_pool();
        sack.pool().considered_map().cloned()
    } else {
        sack.compute_considered_map(flags)
    }
}

impl Deref for PackageQuery {
    type Target = PackageSet;

    fn deref(&self) -> &PackageSet {
        &self.set
    }
}

impl BitOrAssign<&PackageSet> for PackageQuery {
    fn bitor_assign(&mut self, other: &PackageSet) {
        self.set |= other;
    }
}

impl BitAndAssign<&PackageSet> for PackageQuery {
    fn bitand_assign(&mut self, other: &PackageSet) {
        self.set &= other;
    }
}

impl SubAssign<&PackageSet> for PackageQuery {
    fn sub_assign(&mut self, other: &PackageSet) {
        self.set -= other;
    }
}

impl<'a> IntoIterator for &'a PackageQuery {
    type Item = crate::package::Package;
    type IntoIter = crate::package_set::Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.set.iter()
    }
}

impl fmt::Debug for PackageQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageQuery")
            .field("flags", &self.flags)
            .field("packages", &self.set)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::pool::{PackageInfo, Repo};
    use crate::sack::PackageSack;
    use crate::sack::config::ConfigMain;

    /// A sack with an installed repo and two available repos
    ///
    /// Installed: bash-5.1-1.x86_64, glibc-2.34-1.x86_64, kernel-6.1-1.x86_64,
    /// kernel-6.2-1.x86_64, tzdata-2023a-1.noarch.
    /// fedora (priority 99): bash-5.2-1.x86_64, bash-5.2-1.i686,
    /// bash-5.2-1.src, glibc-2.34-1.x86_64, vim-9.0-1.x86_64.
    /// updates (priority 10): bash-5.2-2.x86_64, bash-1:4.0-1.x86_64,
    /// glibc-2.35-1.x86_64, tzdata-2024a-1.noarch.
    pub(crate) fn sample_sack() -> PackageSack {
        let sack = PackageSack::with_config(ConfigMain::default());
        let system = sack.add_system_repo();
        let fedora = sack.add_repo(Repo::new("fedora"));
        let mut updates = Repo::new("updates");
        updates.priority = 10;
        let updates = sack.add_repo(updates);

        let add = |repo, info: PackageInfo| {
            sack.add_package(repo, info).unwrap();
        };

        add(
            system,
            PackageInfo::new("bash", "5.1-1", "x86_64")
                .with_requires(["libc.so.6", "/bin/sh"])
                .with_provides(["/bin/sh"])
                .with_files(["/usr/bin/bash"])
                .with_summary("The GNU Bourne Again shell"),
        );
        add(system, PackageInfo::new("glibc", "2.34-1", "x86_64").with_provides(["libc.so.6"]));
        add(system, PackageInfo::new("kernel", "6.1-1", "x86_64"));
        add(system, PackageInfo::new("kernel", "6.2-1", "x86_64"));
        add(system, PackageInfo::new("tzdata", "2023a-1", "noarch"));

        add(
            fedora,
            PackageInfo::new("bash", "5.2-1", "x86_64")
                .with_requires(["libc.so.6"])
                .with_files(["/usr/bin/bash"])
                .with_url("https://www.gnu.org/software/bash")
                .with_sourcerpm("bash-5.2-1.src.rpm"),
        );
        add(fedora, PackageInfo::new("bash", "5.2-1", "i686"));
        add(fedora, PackageInfo::new("bash", "5.2-1", "src"));
        add(fedora, PackageInfo::new("glibc", "2.34-1", "x86_64").with_provides(["libc.so.6"]));
        add(
            fedora,
            PackageInfo::new("vim", "9.0-1", "x86_64")
                .with_obsoletes(["vi < 10"])
                .with_files(["/usr/bin/vim"])
                .with_description("Vim is an advanced text editor"),
        );

        add(updates, PackageInfo::new("bash", "5.2-2", "x86_64").with_location("Packages/b/bash.rpm"));
        add(updates, PackageInfo::new("bash", "1:4.0-1", "x86_64"));
        add(updates, PackageInfo::new("glibc", "2.35-1", "x86_64").with_provides(["libc.so.6"]));
        add(updates, PackageInfo::new("tzdata", "2024a-1", "noarch"));
        sack
    }

    pub(crate) fn nevras(set: &crate::package_set::PackageSet) -> Vec<String> {
        let mut out: Vec<String> = set.iter().map(|pkg| format!("{}@{}", pkg.nevra(), pkg.repo_id())).collect();
        out.sort();
        out
    }
}
