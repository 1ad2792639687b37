// src/pool/repo.rs

//! Repositories known to the pool

use super::PackageId;
use crate::sack::config::RepoConfig;
use std::fmt;

/// Name of the repository holding the installed packages
pub const SYSTEM_REPO_NAME: &str = "@System";

/// Handle of a repository inside one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RepoId(pub(crate) u32);

impl RepoId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "repo#{}", self.0)
    }
}

/// A loaded repository and its exclude/include policy
#[derive(Debug, Clone)]
pub struct Repo {
    pub id: String,
    pub enabled: bool,
    /// Lower number means higher priority
    pub priority: i32,
    pub cost: i32,
    /// Set once an includepkgs list restricts this repository
    pub use_includes: bool,
    pub excludepkgs: Vec<String>,
    pub includepkgs: Vec<String>,
    /// Smallest and one-past-largest package id owned by this repo
    pub(crate) start: u32,
    pub(crate) end: u32,
    pub(crate) count: usize,
}

impl Repo {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            priority: 99,
            cost: 1000,
            use_includes: false,
            excludepkgs: Vec::new(),
            includepkgs: Vec::new(),
            start: 0,
            end: 0,
            count: 0,
        }
    }

    /// Build a repository from its configuration section
    pub fn from_config(id: impl Into<String>, config: &RepoConfig) -> Self {
        Self {
            enabled: config.enabled,
            priority: config.priority,
            cost: config.cost,
            excludepkgs: config.excludepkgs.clone(),
            includepkgs: config.includepkgs.clone(),
            ..Self::new(id)
        }
    }

    /// Number of packages loaded into this repository
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Id range covering every package of this repository
    ///
    /// The range may also contain packages of other repositories when loading
    /// was interleaved; callers check ownership per id.
    pub fn id_range(&self) -> std::ops::Range<u32> {
        self.start..self.end
    }

    pub(crate) fn record_package(&mut self, id: PackageId) {
        let raw = id.as_u32();
        if self.count == 0 {
            self.start = raw;
            self.end = raw + 1;
        } else {
            self.start = self.start.min(raw);
            self.end = self.end.max(raw + 1);
        }
        self.count += 1;
    }
}
