// src/pool/mod.rs

//! In-memory package pool
//!
//! The pool is an arena of package records ("solvables") indexed by a dense,
//! monotonically growing id space. Id 0 is reserved and never names a
//! package. Repository loaders fill the pool through [`Pool::add_package`];
//! everything else in the crate reads it.
//!
//! The pool also interns dependency expressions, keeps name/provide/file
//! indexes for fast lookups, and holds the active "considered" map computed
//! by the package sack.

mod repo;

pub use repo::{Repo, RepoId, SYSTEM_REPO_NAME};

use crate::error::{Error, Result};
use crate::reldep::Reldep;
use crate::solv_map::SolvMap;
use crate::version::{Evr, format_evr};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::trace;

/// Handle of a package inside one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct PackageId(u32);

impl PackageId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    pub(crate) fn index(&self) -> usize {
        self.0 as usize
    }

    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of an interned dependency expression
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReldepId(u32);

impl ReldepId {
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

/// The dependency lists a package carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepKind {
    Provides,
    Requires,
    Conflicts,
    Obsoletes,
    Recommends,
    Suggests,
    Supplements,
    Enhances,
}

/// Architectures that never take part in binary upgrades
pub const SOURCE_ARCHES: [&str; 2] = ["src", "nosrc"];

/// Architecture compatible with every other binary architecture
pub const NOARCH: &str = "noarch";

/// Loader-side description of a package
///
/// ```
/// use pkgsack::pool::PackageInfo;
///
/// let info = PackageInfo::new("bash", "5.2.15-3", "x86_64")
///     .with_requires(["glibc >= 2.34"])
///     .with_files(["/usr/bin/bash"]);
/// assert_eq!(info.epoch, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PackageInfo {
    pub name: String,
    pub epoch: u64,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    pub conflicts: Vec<String>,
    pub obsoletes: Vec<String>,
    pub recommends: Vec<String>,
    pub suggests: Vec<String>,
    pub supplements: Vec<String>,
    pub enhances: Vec<String>,
    pub files: Vec<String>,
    pub summary: String,
    pub description: String,
    pub url: String,
    pub location: String,
    pub sourcerpm: String,
}

fn strings<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl PackageInfo {
    /// Describe a package by name, `[epoch:]version-release` and arch
    ///
    /// A non-numeric epoch is treated as 0.
    pub fn new(name: impl Into<String>, evr: &str, arch: impl Into<String>) -> Self {
        let parsed = Evr::parse(evr);
        Self {
            name: name.into(),
            epoch: parsed.epoch.parse().unwrap_or(0),
            version: parsed.version.to_string(),
            release: parsed.release.unwrap_or_default().to_string(),
            arch: arch.into(),
            ..Default::default()
        }
    }

    pub fn with_provides<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.provides = strings(deps);
        self
    }

    pub fn with_requires<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.requires = strings(deps);
        self
    }

    pub fn with_conflicts<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.conflicts = strings(deps);
        self
    }

    pub fn with_obsoletes<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.obsoletes = strings(deps);
        self
    }

    pub fn with_recommends<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.recommends = strings(deps);
        self
    }

    pub fn with_suggests<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.suggests = strings(deps);
        self
    }

    pub fn with_supplements<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.supplements = strings(deps);
        self
    }

    pub fn with_enhances<I: IntoIterator<Item = S>, S: Into<String>>(mut self, deps: I) -> Self {
        self.enhances = strings(deps);
        self
    }

    pub fn with_files<I: IntoIterator<Item = S>, S: Into<String>>(mut self, files: I) -> Self {
        self.files = strings(files);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_sourcerpm(mut self, sourcerpm: impl Into<String>) -> Self {
        self.sourcerpm = sourcerpm.into();
        self
    }
}

/// A package record stored in the pool
#[derive(Debug, Clone)]
pub struct Solvable {
    pub name: String,
    pub epoch: u64,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub repo: RepoId,
    /// `[epoch:]version-release`, epoch omitted when zero
    pub evr: String,
    pub provides: Vec<ReldepId>,
    pub requires: Vec<ReldepId>,
    pub conflicts: Vec<ReldepId>,
    pub obsoletes: Vec<ReldepId>,
    pub recommends: Vec<ReldepId>,
    pub suggests: Vec<ReldepId>,
    pub supplements: Vec<ReldepId>,
    pub enhances: Vec<ReldepId>,
    pub files: Vec<String>,
    pub summary: String,
    pub description: String,
    pub url: String,
    pub location: String,
    pub sourcerpm: String,
}

impl Solvable {
    pub fn deps(&self, kind: DepKind) -> &[ReldepId] {
        match kind {
            DepKind::Provides => &self.provides,
            DepKind::Requires => &self.requires,
            DepKind::Conflicts => &self.conflicts,
            DepKind::Obsoletes => &self.obsoletes,
            DepKind::Recommends => &self.recommends,
            DepKind::Suggests => &self.suggests,
            DepKind::Supplements => &self.supplements,
            DepKind::Enhances => &self.enhances,
        }
    }

    /// `name-[epoch:]version-release.arch`, epoch omitted when zero
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.evr, self.arch)
    }

    /// `name-epoch:version-release.arch`, epoch always present
    pub fn full_nevra(&self) -> String {
        format!(
            "{}-{}:{}-{}.{}",
            self.name, self.epoch, self.version, self.release, self.arch
        )
    }

    pub fn is_source(&self) -> bool {
        SOURCE_ARCHES.contains(&self.arch.as_str())
    }
}

/// Arena of packages, repositories and interned dependencies
#[derive(Debug, Default)]
pub struct Pool {
    /// Package `id` lives at index `id - 1`
    solvables: Vec<Solvable>,
    repos: Vec<Repo>,
    installed: Option<RepoId>,
    reldeps: Vec<Reldep>,
    reldep_lookup: HashMap<Reldep, ReldepId>,
    by_name: HashMap<String, Vec<PackageId>>,
    /// Provide name -> (provider, provide expression)
    providers: BTreeMap<String, Vec<(PackageId, ReldepId)>>,
    file_owners: HashMap<String, Vec<PackageId>>,
    considered: Option<SolvMap>,
}

impl Pool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of the id space, including the reserved id 0
    pub fn nsolvables(&self) -> usize {
        self.solvables.len() + 1
    }

    /// True when `id` names a loaded package
    pub fn is_valid(&self, id: PackageId) -> bool {
        id.0 != 0 && id.index() <= self.solvables.len()
    }

    /// # Panics
    ///
    /// Panics when `id` does not name a loaded package.
    pub fn solvable(&self, id: PackageId) -> &Solvable {
        assert!(self.is_valid(id), "invalid package id {}", id);
        &self.solvables[id.index() - 1]
    }

    /// Every package id in ascending order
    pub fn package_ids(&self) -> impl Iterator<Item = PackageId> + '_ {
        (1..=self.solvables.len() as u32).map(PackageId)
    }

    /// Map with every loaded package set
    pub fn all_packages_map(&self) -> SolvMap {
        let mut map = SolvMap::new_full(self.nsolvables());
        map.remove_unchecked(PackageId(0));
        map
    }

    // ========================================================================
    // Repositories
    // ========================================================================

    pub fn add_repo(&mut self, repo: Repo) -> RepoId {
        let id = RepoId(self.repos.len() as u32);
        self.repos.push(repo);
        id
    }

    /// # Panics
    ///
    /// Panics when `id` was not returned by this pool.
    pub fn repo(&self, id: RepoId) -> &Repo {
        &self.repos[id.index()]
    }

    pub fn repo_mut(&mut self, id: RepoId) -> &mut Repo {
        &mut self.repos[id.index()]
    }

    pub fn repos(&self) -> impl Iterator<Item = (RepoId, &Repo)> {
        self.repos
            .iter()
            .enumerate()
            .map(|(i, repo)| (RepoId(i as u32), repo))
    }

    pub fn repos_mut(&mut self) -> impl Iterator<Item = &mut Repo> {
        self.repos.iter_mut()
    }

    pub fn find_repo(&self, name: &str) -> Option<RepoId> {
        self.repos
            .iter()
            .position(|repo| repo.id == name)
            .map(|i| RepoId(i as u32))
    }

    /// Mark a repository as the one holding installed packages
    pub fn set_installed(&mut self, id: RepoId) {
        self.installed = Some(id);
    }

    pub fn installed_repo(&self) -> Option<RepoId> {
        self.installed
    }

    pub fn is_installed(&self, id: PackageId) -> bool {
        self.installed
            .is_some_and(|repo| self.solvable(id).repo == repo)
    }

    /// Ids of the packages owned by `repo`, ascending
    pub fn repo_package_ids(&self, repo: RepoId) -> impl Iterator<Item = PackageId> + '_ {
        self.repos[repo.index()]
            .id_range()
            .map(PackageId)
            .filter(move |id| self.solvable(*id).repo == repo)
    }

    /// Ids of the installed packages, ascending; empty without an installed repo
    pub fn installed_ids(&self) -> Vec<PackageId> {
        match self.installed {
            Some(repo) => self.repo_package_ids(repo).collect(),
            None => Vec::new(),
        }
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Load a package into `repo`
    ///
    /// Every package also provides `name = evr`. Fails when a dependency
    /// string does not parse; the pool is left untouched in that case.
    pub fn add_package(&mut self, repo: RepoId, info: PackageInfo) -> Result<PackageId> {
        if repo.index() >= self.repos.len() {
            return Err(Error::UnknownRepo(repo.to_string()));
        }

        let parse_all = |deps: &[String]| -> Result<Vec<Reldep>> {
            deps.iter().map(|dep| Reldep::parse(dep)).collect()
        };
        let provides = parse_all(&info.provides)?;
        let requires = parse_all(&info.requires)?;
        let conflicts = parse_all(&info.conflicts)?;
        let obsoletes = parse_all(&info.obsoletes)?;
        let recommends = parse_all(&info.recommends)?;
        let suggests = parse_all(&info.suggests)?;
        let supplements = parse_all(&info.supplements)?;
        let enhances = parse_all(&info.enhances)?;

        let evr = format_evr(info.epoch, &info.version, &info.release);
        let id = PackageId(self.solvables.len() as u32 + 1);

        let self_provide = Reldep::new(info.name.clone(), crate::reldep::CmpType::EQ, evr.clone());
        let mut provide_ids = vec![self.intern_reldep(self_provide)];
        for dep in provides {
            let dep_id = self.intern_reldep(dep);
            if !provide_ids.contains(&dep_id) {
                provide_ids.push(dep_id);
            }
        }
        for dep_id in &provide_ids {
            let name = self.reldeps[dep_id.0 as usize].name.clone();
            self.providers.entry(name).or_default().push((id, *dep_id));
        }

        let mut intern_all =
            |deps: Vec<Reldep>| -> Vec<ReldepId> { deps.into_iter().map(|d| self.intern_reldep(d)).collect() };
        let requires = intern_all(requires);
        let conflicts = intern_all(conflicts);
        let obsoletes = intern_all(obsoletes);
        let recommends = intern_all(recommends);
        let suggests = intern_all(suggests);
        let supplements = intern_all(supplements);
        let enhances = intern_all(enhances);

        for file in &info.files {
            self.file_owners.entry(file.clone()).or_default().push(id);
        }
        self.by_name.entry(info.name.clone()).or_default().push(id);
        self.repos[repo.index()].record_package(id);

        trace!("Loaded {}-{}.{} as {}", info.name, evr, info.arch, id);

        self.solvables.push(Solvable {
            name: info.name,
            epoch: info.epoch,
            version: info.version,
            release: info.release,
            arch: info.arch,
            repo,
            evr,
            provides: provide_ids,
            requires,
            conflicts,
            obsoletes,
            recommends,
            suggests,
            supplements,
            enhances,
            files: info.files,
            summary: info.summary,
            description: info.description,
            url: info.url,
            location: info.location,
            sourcerpm: info.sourcerpm,
        });

        Ok(id)
    }

    // ========================================================================
    // Dependencies
    // ========================================================================

    /// Intern a dependency expression, reusing the id of an identical one
    pub fn intern_reldep(&mut self, reldep: Reldep) -> ReldepId {
        if let Some(id) = self.reldep_lookup.get(&reldep) {
            return *id;
        }
        let id = ReldepId(self.reldeps.len() as u32);
        self.reldeps.push(reldep.clone());
        self.reldep_lookup.insert(reldep, id);
        id
    }

    /// # Panics
    ///
    /// Panics when `id` was not interned by this pool.
    pub fn reldep(&self, id: ReldepId) -> &Reldep {
        &self.reldeps[id.0 as usize]
    }

    /// Every provide name, sorted
    pub fn provide_names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    /// Packages whose provides (or, for a path, whose files) satisfy `reldep`,
    /// regardless of the considered map
    pub fn whatprovides_all(&self, reldep: &Reldep) -> SolvMap {
        let mut result = SolvMap::new(self.nsolvables());
        if let Some(providers) = self.providers.get(&reldep.name) {
            for (pkg, provide) in providers {
                if self.reldep(*provide).intersects(reldep) {
                    result.add_unchecked(*pkg);
                }
            }
        }
        if reldep.name.starts_with('/')
            && !reldep.is_versioned()
            && let Some(owners) = self.file_owners.get(&reldep.name)
        {
            for pkg in owners {
                result.add_unchecked(*pkg);
            }
        }
        result
    }

    /// Providers of `reldep` among the considered packages
    pub fn whatprovides(&self, reldep: &Reldep) -> SolvMap {
        let mut result = self.whatprovides_all(reldep);
        if let Some(considered) = &self.considered {
            result &= considered;
        }
        result
    }

    /// Ids of every package called `name`, ascending
    pub fn ids_by_name(&self, name: &str) -> &[PackageId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    // ========================================================================
    // Considered map
    // ========================================================================

    /// The active considered map; `None` means every package is considered
    pub fn considered_map(&self) -> Option<&SolvMap> {
        self.considered.as_ref()
    }

    pub fn is_considered(&self, id: PackageId) -> bool {
        self.considered
            .as_ref()
            .is_none_or(|map| map.contains(id))
    }

    /// Install a new considered map, returning the previous one
    pub fn swap_considered_map(&mut self, considered: Option<SolvMap>) -> Option<SolvMap> {
        std::mem::replace(&mut self.considered, considered)
    }
}
