// src/sack/mod.rs

//! The package sack
//!
//! A [`PackageSack`] owns the package pool and every exclude/include layer.
//! Handles are cheap to clone and share one sack; queries, sets, packages and
//! dependency lists keep a handle to the sack they were created from.
//!
//! The sack is single-threaded: it hands out short-lived borrows of the pool
//! and recomputes the pool's considered map lazily, only when a layer changed.

pub mod config;
mod excludes;
pub mod versionlock;

pub use excludes::ExcludeFlags;

use crate::error::Result;
use crate::package_set::PackageSet;
use crate::pool::{PackageId, PackageInfo, Pool, Repo, RepoId, SYSTEM_REPO_NAME};
use crate::query::{PackageQuery, QueryCmp, ResolveSpecSettings};
use crate::solv_map::SolvMap;
use config::{ConfigMain, DISABLE_MAIN_EXCLUDES};
use excludes::{ExcludeState, add_to_layer, clear_layer, remove_from_layer, set_layer};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use tracing::{debug, info, warn};
use versionlock::{ConditionKey, VersionlockConfig};

struct SackInner {
    pool: RefCell<Pool>,
    excludes: RefCell<ExcludeState>,
    config: RefCell<ConfigMain>,
}

/// Shared handle to a package pool and its exclusion state
#[derive(Clone)]
pub struct PackageSack {
    inner: Rc<SackInner>,
}

impl Default for PackageSack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PackageSack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackageSack")
            .field("packages", &(self.pool().nsolvables() - 1))
            .finish()
    }
}

/// Generates the add/remove/set/clear/get family for one exclude layer
macro_rules! layer_accessors {
    ($field:ident, $get:ident, $add:ident, $remove:ident, $set:ident, $clear:ident, $what:literal) => {
        #[doc = concat!("Current ", $what, "; `None` when the layer is unset")]
        pub fn $get(&self) -> Option<PackageSet> {
            self.inner
                .excludes
                .borrow()
                .$field
                .clone()
                .map(|map| PackageSet::from_map(self, map))
        }

        #[doc = concat!("Add packages to the ", $what, "; returns whether anything changed")]
        pub fn $add(&self, set: &PackageSet) -> bool {
            self.check_set(set);
            let changed = add_to_layer(&mut self.inner.excludes.borrow_mut().$field, set.map());
            self.mark_dirty_if(changed)
        }

        #[doc = concat!("Remove packages from the ", $what, "; returns whether anything changed")]
        pub fn $remove(&self, set: &PackageSet) -> bool {
            self.check_set(set);
            let changed = remove_from_layer(&mut self.inner.excludes.borrow_mut().$field, set.map());
            self.mark_dirty_if(changed)
        }

        #[doc = concat!("Replace the ", $what, "; returns whether anything changed")]
        pub fn $set(&self, set: &PackageSet) -> bool {
            self.check_set(set);
            let changed = set_layer(&mut self.inner.excludes.borrow_mut().$field, set.map());
            self.mark_dirty_if(changed)
        }

        #[doc = concat!("Unset the ", $what, "; returns whether anything changed")]
        pub fn $clear(&self) -> bool {
            let changed = clear_layer(&mut self.inner.excludes.borrow_mut().$field);
            self.mark_dirty_if(changed)
        }
    };
}

impl PackageSack {
    pub fn new() -> Self {
        Self::with_config(ConfigMain::default())
    }

    pub fn with_config(config: ConfigMain) -> Self {
        Self {
            inner: Rc::new(SackInner {
                pool: RefCell::new(Pool::new()),
                excludes: RefCell::new(ExcludeState::default()),
                config: RefCell::new(config),
            }),
        }
    }

    /// True when both handles name the same sack
    pub fn same_as(&self, other: &PackageSack) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Borrow the pool
    ///
    /// # Panics
    ///
    /// Panics when the pool is being mutated through this sack.
    pub fn pool(&self) -> Ref<'_, Pool> {
        self.inner.pool.borrow()
    }

    pub(crate) fn pool_mut(&self) -> RefMut<'_, Pool> {
        self.inner.pool.borrow_mut()
    }

    pub fn config(&self) -> Ref<'_, ConfigMain> {
        self.inner.config.borrow()
    }

    /// Replace the configuration; loaded layers are not recomputed
    pub fn set_config(&self, config: ConfigMain) {
        *self.inner.config.borrow_mut() = config;
    }

    /// Number of loaded packages
    pub fn package_count(&self) -> usize {
        self.pool().nsolvables() - 1
    }

    fn check_set(&self, set: &PackageSet) {
        assert!(self.same_as(set.sack()), "PackageSack: used different sack");
    }

    fn mark_dirty_if(&self, changed: bool) -> bool {
        if changed {
            self.inner.excludes.borrow_mut().considered_uptodate = false;
        }
        changed
    }

    fn mark_dirty(&self) {
        self.inner.excludes.borrow_mut().considered_uptodate = false;
    }

    // ========================================================================
    // Loading
    // ========================================================================

    pub fn add_repo(&self, repo: Repo) -> RepoId {
        self.pool_mut().add_repo(repo)
    }

    /// Add a repository using its section of the configuration, if any
    pub fn add_configured_repo(&self, id: &str) -> RepoId {
        let repo = match self.config().repo(id) {
            Some(section) => Repo::from_config(id, section),
            None => Repo::new(id),
        };
        self.add_repo(repo)
    }

    /// Add the repository of installed packages
    pub fn add_system_repo(&self) -> RepoId {
        let mut pool = self.pool_mut();
        let id = pool.add_repo(Repo::new(SYSTEM_REPO_NAME));
        pool.set_installed(id);
        id
    }

    /// Load a package into `repo`
    ///
    /// Packages of a disabled repository land in the repo excludes.
    pub fn add_package(&self, repo: RepoId, info: PackageInfo) -> Result<PackageId> {
        let (id, enabled) = {
            let mut pool = self.pool_mut();
            let id = pool.add_package(repo, info)?;
            (id, pool.repo(repo).enabled)
        };
        if !enabled {
            let mut excludes = self.inner.excludes.borrow_mut();
            excludes
                .repo_excludes
                .get_or_insert_with(|| SolvMap::new(0))
                .add_grow(id, 0);
        }
        self.mark_dirty();
        Ok(id)
    }

    /// Enable or disable a repository, keeping the repo excludes in sync
    pub fn set_repo_enabled(&self, repo: RepoId, enabled: bool) -> bool {
        let (changed, members) = {
            let mut pool = self.pool_mut();
            let changed = pool.repo(repo).enabled != enabled;
            pool.repo_mut(repo).enabled = enabled;
            let mut members = SolvMap::new(pool.nsolvables());
            for id in pool.repo_package_ids(repo) {
                members.add_unchecked(id);
            }
            (changed, members)
        };
        if !changed {
            return false;
        }

        debug!(
            "{} repository {}",
            if enabled { "Enabling" } else { "Disabling" },
            self.pool().repo(repo).id
        );
        let mut excludes = self.inner.excludes.borrow_mut();
        if enabled {
            remove_from_layer(&mut excludes.repo_excludes, &members);
        } else {
            add_to_layer(&mut excludes.repo_excludes, &members);
        }
        excludes.considered_uptodate = false;
        true
    }

    // ========================================================================
    // Exclude layers
    // ========================================================================

    layer_accessors!(
        user_excludes,
        user_excludes,
        add_user_excludes,
        remove_user_excludes,
        set_user_excludes,
        clear_user_excludes,
        "user excludes"
    );

    layer_accessors!(
        module_excludes,
        module_excludes,
        add_module_excludes,
        remove_module_excludes,
        set_module_excludes,
        clear_module_excludes,
        "module excludes"
    );

    layer_accessors!(
        versionlock_excludes,
        versionlock_excludes,
        add_versionlock_excludes,
        remove_versionlock_excludes,
        set_versionlock_excludes,
        clear_versionlock_excludes,
        "versionlock excludes"
    );

    layer_accessors!(
        repo_excludes,
        repo_excludes,
        add_repo_excludes,
        remove_repo_excludes,
        set_repo_excludes,
        clear_repo_excludes,
        "repo excludes"
    );

    /// Current user includes; `None` when the layer is unset
    pub fn user_includes(&self) -> Option<PackageSet> {
        self.inner
            .excludes
            .borrow()
            .user_includes
            .clone()
            .map(|map| PackageSet::from_map(self, map))
    }

    /// Add user includes; the first call restricts every repository
    pub fn add_user_includes(&self, set: &PackageSet) -> bool {
        if self.inner.excludes.borrow().user_includes.is_none() {
            return self.set_user_includes(set);
        }
        self.check_set(set);
        let changed = add_to_layer(&mut self.inner.excludes.borrow_mut().user_includes, set.map());
        self.mark_dirty_if(changed)
    }

    pub fn remove_user_includes(&self, set: &PackageSet) -> bool {
        self.check_set(set);
        let changed = remove_from_layer(&mut self.inner.excludes.borrow_mut().user_includes, set.map());
        self.mark_dirty_if(changed)
    }

    /// Replace the user includes and make every repository use includes
    pub fn set_user_includes(&self, set: &PackageSet) -> bool {
        self.check_set(set);
        for repo in self.pool_mut().repos_mut() {
            repo.use_includes = true;
        }
        let changed = set_layer(&mut self.inner.excludes.borrow_mut().user_includes, set.map());
        self.mark_dirty();
        changed
    }

    pub fn clear_user_includes(&self) -> bool {
        let changed = clear_layer(&mut self.inner.excludes.borrow_mut().user_includes);
        self.mark_dirty_if(changed)
    }

    /// Excludes loaded from the configuration; `None` when none were found
    pub fn config_excludes(&self) -> Option<PackageSet> {
        self.inner
            .excludes
            .borrow()
            .config_excludes
            .clone()
            .map(|map| PackageSet::from_map(self, map))
    }

    /// Includes loaded from the configuration; `None` when no includepkgs applied
    pub fn config_includes(&self) -> Option<PackageSet> {
        self.inner
            .excludes
            .borrow()
            .config_includes
            .clone()
            .map(|map| PackageSet::from_map(self, map))
    }

    // ========================================================================
    // Considered map
    // ========================================================================

    /// Considered map for a query ignoring the layers in `flags`
    ///
    /// `None` means every package is considered.
    pub(crate) fn compute_considered_map(&self, flags: ExcludeFlags) -> Option<SolvMap> {
        let pool = self.pool();
        let mut considered = self.inner.excludes.borrow().compute_considered_map(&pool, flags)?;
        considered.remove_unchecked(PackageId::new(0));
        Some(considered)
    }

    /// Refresh the pool's considered map if any layer changed
    pub fn recompute_considered_in_pool(&self) {
        if self.inner.excludes.borrow().considered_uptodate {
            return;
        }
        let considered = self.compute_considered_map(ExcludeFlags::APPLY_EXCLUDES);
        match &considered {
            Some(map) => debug!("Considered map recomputed: {} packages considered", map.size()),
            None => debug!("Considered map recomputed: no restrictions"),
        }
        self.pool_mut().swap_considered_map(considered);
        self.inner.excludes.borrow_mut().considered_uptodate = true;
    }

    /// True when the pool's considered map reflects every layer
    pub fn is_considered_uptodate(&self) -> bool {
        self.inner.excludes.borrow().considered_uptodate
    }

    // ========================================================================
    // Configuration-driven layers
    // ========================================================================

    /// Resolve `excludepkgs`/`includepkgs` from the configuration into layers
    ///
    /// Repository sections are processed first unless `only_main` is set,
    /// then the global lists. Every pattern is resolved as a package spec
    /// (NEVRA forms only, source packages included) against all packages.
    pub fn load_config_excludes_includes(&self, only_main: bool) {
        let config = self.config().clone();
        if config.excludes_disabled() {
            self.mark_dirty();
            return;
        }

        let mut excludes = PackageSet::new(self);
        let mut includes = PackageSet::new(self);
        let mut includes_used = false;
        let mut excludes_found = false;

        if !only_main {
            let repos: Vec<(RepoId, String, Vec<String>, Vec<String>)> = self
                .pool()
                .repos()
                .filter(|(_, repo)| repo.enabled && !config.excludes_disabled_for(&repo.id))
                .map(|(id, repo)| (id, repo.id.clone(), repo.excludepkgs.clone(), repo.includepkgs.clone()))
                .collect();

            for (repo_id, name, repo_excludes, repo_includes) in repos {
                if !repo_includes.is_empty() {
                    self.pool_mut().repo_mut(repo_id).use_includes = true;
                    includes_used = true;
                }
                self.resolve_config_patterns(&repo_includes, Some(&name), &mut includes);
                excludes_found |= self.resolve_config_patterns(&repo_excludes, Some(&name), &mut excludes);
            }
        }

        if !config.excludes_disabled_for(DISABLE_MAIN_EXCLUDES) {
            if !config.includepkgs.is_empty() {
                for repo in self.pool_mut().repos_mut() {
                    repo.use_includes = true;
                }
                includes_used = true;
            }
            self.resolve_config_patterns(&config.includepkgs, None, &mut includes);
            excludes_found |= self.resolve_config_patterns(&config.excludepkgs, None, &mut excludes);
        }

        let mut state = self.inner.excludes.borrow_mut();
        state.config_includes = includes_used.then(|| includes.into_map());
        state.config_excludes = excludes_found.then(|| excludes.into_map());
        state.considered_uptodate = false;
    }

    /// Resolve configuration patterns, optionally within one repository,
    /// into `target`; returns whether any pattern matched
    fn resolve_config_patterns(&self, patterns: &[String], repo: Option<&str>, target: &mut PackageSet) -> bool {
        let settings = ResolveSpecSettings::nevra_only();
        let mut found = false;
        for pattern in patterns {
            let mut query = PackageQuery::with_flags(self, ExcludeFlags::IGNORE_EXCLUDES);
            if let Some(repo) = repo {
                query.filter_repo_id(&[repo], QueryCmp::EQ);
            }
            let (matched, _) = query.resolve_pkg_spec(pattern, &settings, true);
            debug!(
                "Pattern \"{}\" from {} matched {} packages",
                pattern,
                repo.unwrap_or(DISABLE_MAIN_EXCLUDES),
                query.len()
            );
            if matched {
                *target |= &*query;
                found = true;
            }
        }
        found
    }

    /// Turn versionlock entries into versionlock excludes
    ///
    /// For each usable entry, the available packages with a matching name
    /// are candidates; those satisfying every condition stay locked in. All
    /// other candidates, and available packages obsoleting a locked one, are
    /// excluded. Invalid entries are skipped with a warning.
    pub fn load_versionlock_excludes(&self, config: &VersionlockConfig) {
        let mut candidates = PackageSet::new(self);
        let mut locked = PackageSet::new(self);

        for entry in config.packages() {
            if !entry.is_usable() {
                warn!(
                    "Skipping invalid versionlock entry \"{}\": {}",
                    entry.name(),
                    entry
                        .errors()
                        .iter()
                        .chain(entry.conditions().iter().flat_map(|c| c.errors()))
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                continue;
            }

            let mut query = PackageQuery::with_flags(self, ExcludeFlags::IGNORE_VERSIONLOCK);
            query.filter_available();
            query.filter_name(&[entry.name()], QueryCmp::GLOB);
            if query.is_empty() {
                continue;
            }
            candidates |= &*query;

            for condition in entry.conditions() {
                let (Some(key), Some(cmp)) = (condition.key(), condition.comparator()) else {
                    continue;
                };
                match key {
                    ConditionKey::Epoch => {
                        if let Ok(epoch) = condition.value().parse::<u64>() {
                            query.filter_epoch(&[epoch], cmp);
                        }
                    }
                    ConditionKey::Evr => query.filter_evr(&[condition.value()], cmp),
                    ConditionKey::Arch => query.filter_arch(&[condition.value()], cmp),
                }
            }
            locked |= &*query;
        }

        let mut excludes = candidates;
        excludes -= &locked;
        let mut obsoleters = PackageQuery::with_flags(self, ExcludeFlags::IGNORE_VERSIONLOCK);
        obsoleters.filter_available();
        obsoleters.filter_obsoletes_set(&locked, QueryCmp::EQ);
        excludes |= &*obsoleters;
        excludes -= &locked;

        debug!("Versionlock excludes {} packages", excludes.len());
        self.set_versionlock_excludes(&excludes);
    }

    /// Load the versionlock file named by the configuration and apply it
    ///
    /// Does nothing when versionlock is disabled. A missing file means no
    /// locks.
    pub fn load_versionlock(&self) -> Result<()> {
        let (enabled, path) = {
            let config = self.config();
            (config.versionlock, config.versionlock_path.clone())
        };
        if !enabled {
            return Ok(());
        }
        let versionlock = VersionlockConfig::load(&path)?;
        info!(
            "Loaded {} versionlock entries from {}",
            versionlock.packages().len(),
            path.display()
        );
        self.load_versionlock_excludes(&versionlock);
        Ok(())
    }
}
