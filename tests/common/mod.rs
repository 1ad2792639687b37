// tests/common/mod.rs

//! Shared fixtures for integration tests.

#![allow(dead_code)]

use pkgsack::{PackageId, PackageInfo, PackageSack, PackageSet, Repo, RepoId};
use tracing_subscriber::EnvFilter;

/// Route crate logging to the test harness; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}

/// A small system: an installed repo plus a base and an updates repository.
pub struct Universe {
    pub sack: PackageSack,
    pub system: RepoId,
    pub base: RepoId,
    pub updates: RepoId,
}

impl Universe {
    pub fn new() -> Self {
        init_tracing();
        let sack = PackageSack::new();
        let system = sack.add_system_repo();
        let base = sack.add_repo(Repo::new("base"));
        let mut updates = Repo::new("updates");
        updates.priority = 10;
        let updates = sack.add_repo(updates);
        Self {
            sack,
            system,
            base,
            updates,
        }
    }

    pub fn add(&self, repo: RepoId, info: PackageInfo) -> PackageId {
        self.sack.add_package(repo, info).unwrap()
    }

    pub fn installed(&self, name: &str, evr: &str, arch: &str) -> PackageId {
        self.add(self.system, PackageInfo::new(name, evr, arch))
    }

    pub fn base(&self, name: &str, evr: &str, arch: &str) -> PackageId {
        self.add(self.base, PackageInfo::new(name, evr, arch))
    }

    pub fn update(&self, name: &str, evr: &str, arch: &str) -> PackageId {
        self.add(self.updates, PackageInfo::new(name, evr, arch))
    }
}

/// Sorted NEVRA strings of a set.
pub fn nevras(set: &PackageSet) -> Vec<String> {
    let mut names: Vec<String> = set.iter().map(|pkg| pkg.nevra()).collect();
    names.sort();
    names
}
