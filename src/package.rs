// src/package.rs

//! Lightweight package handles

use crate::nevra::{AsNevra, Nevra};
use crate::pool::{DepKind, PackageId, RepoId, Solvable};
use crate::reldep::ReldepList;
use crate::sack::PackageSack;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A package in a sack
///
/// Holds only the sack handle and the id; attributes are read from the
/// pool on demand.
#[derive(Clone)]
pub struct Package {
    sack: PackageSack,
    id: PackageId,
}

impl Package {
    /// # Panics
    ///
    /// Panics when `id` does not name a package of `sack`.
    pub fn new(sack: &PackageSack, id: PackageId) -> Self {
        assert!(sack.pool().is_valid(id), "invalid package id {}", id);
        Self {
            sack: sack.clone(),
            id,
        }
    }

    pub fn id(&self) -> PackageId {
        self.id
    }

    pub fn sack(&self) -> &PackageSack {
        &self.sack
    }

    fn with<R>(&self, f: impl FnOnce(&Solvable) -> R) -> R {
        f(self.sack.pool().solvable(self.id))
    }

    pub fn name(&self) -> String {
        self.with(|s| s.name.clone())
    }

    pub fn epoch(&self) -> u64 {
        self.with(|s| s.epoch)
    }

    pub fn version(&self) -> String {
        self.with(|s| s.version.clone())
    }

    pub fn release(&self) -> String {
        self.with(|s| s.release.clone())
    }

    pub fn arch(&self) -> String {
        self.with(|s| s.arch.clone())
    }

    /// `[epoch:]version-release`, epoch omitted when zero
    pub fn evr(&self) -> String {
        self.with(|s| s.evr.clone())
    }

    /// `name-[epoch:]version-release.arch`, epoch omitted when zero
    pub fn nevra(&self) -> String {
        self.with(Solvable::nevra)
    }

    /// `name-epoch:version-release.arch`
    pub fn full_nevra(&self) -> String {
        self.with(Solvable::full_nevra)
    }

    pub fn to_nevra(&self) -> Nevra {
        self.with(|s| Nevra::new(&s.name, s.epoch.to_string(), &s.version, &s.release, &s.arch))
    }

    pub fn repo(&self) -> RepoId {
        self.with(|s| s.repo)
    }

    /// Id string of the owning repository
    pub fn repo_id(&self) -> String {
        let pool = self.sack.pool();
        pool.repo(pool.solvable(self.id).repo).id.clone()
    }

    pub fn is_installed(&self) -> bool {
        self.sack.pool().is_installed(self.id)
    }

    /// True for `src` and `nosrc` packages
    pub fn is_source(&self) -> bool {
        self.with(Solvable::is_source)
    }

    /// Whether the package survives the sack's current excludes
    pub fn is_considered(&self) -> bool {
        self.sack.recompute_considered_in_pool();
        self.sack.pool().is_considered(self.id)
    }

    pub fn deps(&self, kind: DepKind) -> ReldepList {
        let ids = self.with(|s| s.deps(kind).to_vec());
        ReldepList::from_ids(&self.sack, ids)
    }

    pub fn provides(&self) -> ReldepList {
        self.deps(DepKind::Provides)
    }

    pub fn requires(&self) -> ReldepList {
        self.deps(DepKind::Requires)
    }

    pub fn conflicts(&self) -> ReldepList {
        self.deps(DepKind::Conflicts)
    }

    pub fn obsoletes(&self) -> ReldepList {
        self.deps(DepKind::Obsoletes)
    }

    pub fn recommends(&self) -> ReldepList {
        self.deps(DepKind::Recommends)
    }

    pub fn suggests(&self) -> ReldepList {
        self.deps(DepKind::Suggests)
    }

    pub fn supplements(&self) -> ReldepList {
        self.deps(DepKind::Supplements)
    }

    pub fn enhances(&self) -> ReldepList {
        self.deps(DepKind::Enhances)
    }

    pub fn files(&self) -> Vec<String> {
        self.with(|s| s.files.clone())
    }

    pub fn summary(&self) -> String {
        self.with(|s| s.summary.clone())
    }

    pub fn description(&self) -> String {
        self.with(|s| s.description.clone())
    }

    pub fn url(&self) -> String {
        self.with(|s| s.url.clone())
    }

    pub fn location(&self) -> String {
        self.with(|s| s.location.clone())
    }

    pub fn sourcerpm(&self) -> String {
        self.with(|s| s.sourcerpm.clone())
    }
}

impl AsNevra for Package {
    fn as_nevra(&self) -> Cow<'_, Nevra> {
        Cow::Owned(self.to_nevra())
    }
}

impl PartialEq for Package {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.sack.same_as(&other.sack)
    }
}

impl Eq for Package {}

impl Hash for Package {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Packages order by id, the order they were loaded in
impl PartialOrd for Package {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Package {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nevra())
    }
}

impl fmt::Debug for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Package({}: {})", self.id, self.nevra())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nevra::cmp_nevra;
    use crate::pool::PackageInfo;

    fn sack_with_packages() -> (PackageSack, PackageId, PackageId) {
        let sack = PackageSack::new();
        let system = sack.add_system_repo();
        let fedora = sack.add_repo(crate::pool::Repo::new("fedora"));
        let a = sack
            .add_package(
                system,
                PackageInfo::new("bash", "5.1-1", "x86_64")
                    .with_requires(["glibc >= 2.34"])
                    .with_files(["/usr/bin/bash"])
                    .with_summary("The GNU Bourne Again shell"),
            )
            .unwrap();
        let b = sack
            .add_package(fedora, PackageInfo::new("bash", "1:5.2-1", "x86_64"))
            .unwrap();
        (sack, a, b)
    }

    #[test]
    fn test_attributes() {
        let (sack, a, b) = sack_with_packages();
        let bash = Package::new(&sack, a);
        assert_eq!(bash.name(), "bash");
        assert_eq!(bash.evr(), "5.1-1");
        assert_eq!(bash.full_nevra(), "bash-0:5.1-1.x86_64");
        assert_eq!(bash.repo_id(), "@System");
        assert!(bash.is_installed());
        assert_eq!(bash.files(), vec!["/usr/bin/bash"]);
        assert_eq!(bash.requires().len(), 1);
        // the implicit self-provide
        assert_eq!(bash.provides().get(0).unwrap().to_string(), "bash = 5.1-1");

        let newer = Package::new(&sack, b);
        assert_eq!(newer.epoch(), 1);
        assert_eq!(newer.nevra(), "bash-1:5.2-1.x86_64");
        assert!(!newer.is_installed());
        assert_eq!(newer.repo_id(), "fedora");
    }

    #[test]
    fn test_identity() {
        let (sack, a, b) = sack_with_packages();
        assert_eq!(Package::new(&sack, a), Package::new(&sack, a));
        assert_ne!(Package::new(&sack, a), Package::new(&sack, b));
        assert!(Package::new(&sack, a) < Package::new(&sack, b));
        assert_eq!(format!("{}", Package::new(&sack, a)), "bash-5.1-1.x86_64");
    }

    #[test]
    fn test_nevra_comparison() {
        let (sack, a, b) = sack_with_packages();
        let old = Package::new(&sack, a);
        let new = Package::new(&sack, b);
        assert_eq!(cmp_nevra(&old, &new), Ordering::Less);
        assert_eq!(old.to_nevra().epoch, "0");
    }

    #[test]
    #[should_panic(expected = "invalid package id")]
    fn test_invalid_id_panics() {
        let sack = PackageSack::new();
        Package::new(&sack, PackageId::new(1));
    }
}
