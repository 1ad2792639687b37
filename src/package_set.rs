// src/package_set.rs

//! Sets of packages from one sack

use crate::package::Package;
use crate::pool::PackageId;
use crate::sack::PackageSack;
use crate::solv_map::{SolvMap, SolvMapIter};
use std::fmt;
use std::ops::{BitAndAssign, BitOrAssign, SubAssign};

/// A set of packages belonging to one sack, backed by a bitmap over the
/// sack's id space
///
/// Set algebra between sets of different sacks is a programming error and
/// panics.
#[derive(Clone)]
pub struct PackageSet {
    sack: PackageSack,
    map: SolvMap,
}

impl PackageSet {
    /// An empty set
    pub fn new(sack: &PackageSack) -> Self {
        let size = sack.pool().nsolvables();
        Self {
            sack: sack.clone(),
            map: SolvMap::new(size),
        }
    }

    pub(crate) fn from_map(sack: &PackageSack, map: SolvMap) -> Self {
        Self {
            sack: sack.clone(),
            map,
        }
    }

    pub fn sack(&self) -> &PackageSack {
        &self.sack
    }

    pub(crate) fn map(&self) -> &SolvMap {
        &self.map
    }

    pub(crate) fn map_mut(&mut self) -> &mut SolvMap {
        &mut self.map
    }

    pub(crate) fn into_map(self) -> SolvMap {
        self.map
    }

    fn check_sack(&self, other: &PackageSack) {
        assert!(self.sack.same_as(other), "PackageSet: used different sack");
    }

    /// # Panics
    ///
    /// Panics when `package` belongs to a different sack.
    pub fn add(&mut self, package: &Package) {
        self.check_sack(package.sack());
        self.add_id(package.id());
    }

    pub(crate) fn add_id(&mut self, id: PackageId) {
        self.map.add_grow(id, 0);
    }

    pub fn remove(&mut self, package: &Package) {
        self.check_sack(package.sack());
        if self.map.contains(package.id()) {
            self.map.remove_unchecked(package.id());
        }
    }

    pub fn contains(&self, package: &Package) -> bool {
        self.sack.same_as(package.sack()) && self.map.contains(package.id())
    }

    pub fn contains_id(&self, id: PackageId) -> bool {
        self.map.contains(id)
    }

    pub fn len(&self) -> usize {
        self.map.size()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// Ids of the members, ascending
    pub fn ids(&self) -> SolvMapIter<'_> {
        self.map.iter()
    }

    /// Members in ascending id order
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            sack: &self.sack,
            inner: self.map.iter(),
        }
    }

    /// Add every member of `other`
    pub fn update(&mut self, other: &PackageSet) {
        *self |= other;
    }

    /// True when the sets share at least one package
    pub fn intersects(&self, other: &PackageSet) -> bool {
        self.check_sack(&other.sack);
        !self.map.is_intersection_empty(&other.map)
    }
}

impl BitOrAssign<&PackageSet> for PackageSet {
    fn bitor_assign(&mut self, other: &PackageSet) {
        self.check_sack(&other.sack);
        self.map |= &other.map;
    }
}

impl BitAndAssign<&PackageSet> for PackageSet {
    fn bitand_assign(&mut self, other: &PackageSet) {
        self.check_sack(&other.sack);
        self.map &= &other.map;
    }
}

impl SubAssign<&PackageSet> for PackageSet {
    fn sub_assign(&mut self, other: &PackageSet) {
        self.check_sack(&other.sack);
        self.map -= &other.map;
    }
}

impl PartialEq for PackageSet {
    fn eq(&self, other: &Self) -> bool {
        self.sack.same_as(&other.sack) && self.map == other.map
    }
}

impl fmt::Debug for PackageSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|pkg| pkg.nevra())).finish()
    }
}

/// Iterator over the members of a [`PackageSet`]
pub struct Iter<'a> {
    sack: &'a PackageSack,
    inner: SolvMapIter<'a>,
}

impl Iterator for Iter<'_> {
    type Item = Package;

    fn next(&mut self) -> Option<Package> {
        self.inner.next().map(|id| Package::new(self.sack, id))
    }
}

impl<'a> IntoIterator for &'a PackageSet {
    type Item = Package;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{PackageInfo, Repo};

    fn sack_with(n: usize) -> (PackageSack, Vec<Package>) {
        let sack = PackageSack::new();
        let repo = sack.add_repo(Repo::new("r"));
        let pkgs = (0..n)
            .map(|i| {
                let id = sack
                    .add_package(repo, PackageInfo::new(format!("p{}", i), "1-1", "noarch"))
                    .unwrap();
                Package::new(&sack, id)
            })
            .collect();
        (sack, pkgs)
    }

    #[test]
    fn test_membership() {
        let (sack, pkgs) = sack_with(3);
        let mut set = PackageSet::new(&sack);
        assert!(set.is_empty());
        set.add(&pkgs[0]);
        set.add(&pkgs[2]);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&pkgs[2]));
        assert!(!set.contains(&pkgs[1]));
        set.remove(&pkgs[0]);
        set.remove(&pkgs[1]);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![pkgs[2].clone()]);
    }

    #[test]
    fn test_algebra() {
        let (sack, pkgs) = sack_with(4);
        let mut a = PackageSet::new(&sack);
        let mut b = PackageSet::new(&sack);
        for p in &pkgs[..3] {
            a.add(p);
        }
        for p in &pkgs[1..] {
            b.add(p);
        }

        let mut union = a.clone();
        union |= &b;
        assert_eq!(union.len(), 4);

        let mut inter = a.clone();
        inter &= &b;
        assert_eq!(inter.ids().map(|id| id.as_u32()).collect::<Vec<_>>(), vec![2, 3]);

        let mut diff = a.clone();
        diff -= &b;
        assert_eq!(diff.iter().collect::<Vec<_>>(), vec![pkgs[0].clone()]);
        assert!(a.intersects(&b));
        assert!(!diff.intersects(&b));
    }

    #[test]
    fn test_set_grows_with_sack() {
        let (sack, _) = sack_with(1);
        let mut set = PackageSet::new(&sack);
        let repo = sack.pool().find_repo("r").unwrap();
        let id = sack
            .add_package(repo, PackageInfo::new("late", "1-1", "noarch"))
            .unwrap();
        set.add(&Package::new(&sack, id));
        assert_eq!(set.len(), 1);
    }

    #[test]
    #[should_panic(expected = "used different sack")]
    fn test_cross_sack_panics() {
        let (sack_a, _) = sack_with(1);
        let (sack_b, _) = sack_with(1);
        let mut a = PackageSet::new(&sack_a);
        a |= &PackageSet::new(&sack_b);
    }
}
