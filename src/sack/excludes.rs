// src/sack/excludes.rs

//! Exclude/include layers and the considered map computation

use crate::pool::Pool;
use crate::solv_map::SolvMap;
use bitflags::bitflags;

bitflags! {
    /// Which exclude layers a query ignores
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ExcludeFlags: u32 {
        const IGNORE_MODULAR_EXCLUDES = 1 << 0;
        const IGNORE_REGULAR_CONFIG_EXCLUDES = 1 << 1;
        const IGNORE_REGULAR_USER_EXCLUDES = 1 << 2;
        const USE_DISABLED_REPOSITORIES = 1 << 3;
        const IGNORE_VERSIONLOCK = 1 << 4;
        const IGNORE_REGULAR_EXCLUDES =
            Self::IGNORE_REGULAR_CONFIG_EXCLUDES.bits() | Self::IGNORE_REGULAR_USER_EXCLUDES.bits();
        const IGNORE_EXCLUDES = Self::IGNORE_MODULAR_EXCLUDES.bits()
            | Self::IGNORE_REGULAR_EXCLUDES.bits()
            | Self::USE_DISABLED_REPOSITORIES.bits()
            | Self::IGNORE_VERSIONLOCK.bits();
    }
}

impl ExcludeFlags {
    /// Apply every exclude layer
    pub const APPLY_EXCLUDES: Self = Self::empty();
}

/// The independently maintained exclude/include maps of one sack
///
/// `None` means the source imposes no restriction. An empty include map is
/// not the same as no include map: it hides every package of repositories
/// that use includes.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExcludeState {
    pub(crate) config_excludes: Option<SolvMap>,
    pub(crate) config_includes: Option<SolvMap>,
    pub(crate) user_excludes: Option<SolvMap>,
    pub(crate) user_includes: Option<SolvMap>,
    pub(crate) repo_excludes: Option<SolvMap>,
    pub(crate) module_excludes: Option<SolvMap>,
    pub(crate) versionlock_excludes: Option<SolvMap>,
    /// False whenever a layer changed since the pool's map was last computed
    pub(crate) considered_uptodate: bool,
}

impl ExcludeState {
    /// Compute the considered map for `flags`
    ///
    /// ```text
    /// considered = (all - module - repo - versionlock - config_excl - user_excl)
    ///            & (config_incl | user_incl | packages of repos without includes)
    /// ```
    ///
    /// Returns `None` when no active layer restricts anything.
    pub(crate) fn compute_considered_map(&self, pool: &Pool, flags: ExcludeFlags) -> Option<SolvMap> {
        let use_config = !flags.contains(ExcludeFlags::IGNORE_REGULAR_CONFIG_EXCLUDES);
        let use_user = !flags.contains(ExcludeFlags::IGNORE_REGULAR_USER_EXCLUDES);
        let module = self
            .module_excludes
            .as_ref()
            .filter(|_| !flags.contains(ExcludeFlags::IGNORE_MODULAR_EXCLUDES));
        let repo = self
            .repo_excludes
            .as_ref()
            .filter(|_| !flags.contains(ExcludeFlags::USE_DISABLED_REPOSITORIES));
        let versionlock = self
            .versionlock_excludes
            .as_ref()
            .filter(|_| !flags.contains(ExcludeFlags::IGNORE_VERSIONLOCK));

        let config_active = use_config && (self.config_excludes.is_some() || self.config_includes.is_some());
        let user_active = use_user && (self.user_excludes.is_some() || self.user_includes.is_some());
        if !config_active && !user_active && module.is_none() && repo.is_none() && versionlock.is_none() {
            return None;
        }

        let mut considered = pool.all_packages_map();
        for layer in [module, repo, versionlock].into_iter().flatten() {
            considered -= layer;
        }

        let mut includes: Option<SolvMap> = None;
        if use_config {
            if let Some(config_includes) = &self.config_includes {
                includes = Some(config_includes.clone());
            }
            if let Some(config_excludes) = &self.config_excludes {
                considered -= config_excludes;
            }
        }
        if use_user {
            if let Some(user_includes) = &self.user_includes {
                match includes.as_mut() {
                    Some(map) => *map |= user_includes,
                    None => includes = Some(user_includes.clone()),
                }
            }
            if let Some(user_excludes) = &self.user_excludes {
                considered -= user_excludes;
            }
        }

        if let Some(mut includes) = includes {
            includes.grow(pool.nsolvables());
            for (repo_id, repo) in pool.repos() {
                if repo.use_includes {
                    continue;
                }
                for id in pool.repo_package_ids(repo_id) {
                    includes.add_unchecked(id);
                }
            }
            considered &= &includes;
        }

        Some(considered)
    }
}

/// Merge `map` into an optional layer; returns whether the layer changed
pub(crate) fn add_to_layer(layer: &mut Option<SolvMap>, map: &SolvMap) -> bool {
    match layer {
        Some(current) => {
            let before = current.clone();
            *current |= map;
            *current != before
        }
        None => {
            *layer = Some(map.clone());
            true
        }
    }
}

/// Remove `map` from an optional layer; an absent layer stays absent
pub(crate) fn remove_from_layer(layer: &mut Option<SolvMap>, map: &SolvMap) -> bool {
    match layer {
        Some(current) => {
            let before = current.clone();
            *current -= map;
            *current != before
        }
        None => false,
    }
}

pub(crate) fn set_layer(layer: &mut Option<SolvMap>, map: &SolvMap) -> bool {
    let changed = layer.as_ref() != Some(map);
    *layer = Some(map.clone());
    changed
}

pub(crate) fn clear_layer(layer: &mut Option<SolvMap>) -> bool {
    layer.take().is_some()
}
