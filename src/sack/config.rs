// src/sack/config.rs

//! Package selection configuration
//!
//! The settings the sack needs to compute excludes: global and per-repository
//! `excludepkgs`/`includepkgs`, `disable_excludes`, `installonlypkgs` and the
//! versionlock switch.
//!
//! # Example
//!
//! ```toml
//! excludepkgs = ["kernel-debug*"]
//! disable_excludes = ["updates-testing"]
//! versionlock = true
//!
//! [repos.fedora]
//! priority = 10
//! includepkgs = ["bash", "zsh"]
//!
//! [repos.updates-testing]
//! enabled = false
//! excludepkgs = ["*"]
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the versionlock policy file
pub const DEFAULT_VERSIONLOCK_PATH: &str = "/etc/dnf/versionlock.toml";

/// `disable_excludes` value disabling every exclude source
pub const DISABLE_ALL_EXCLUDES: &str = "*";

/// `disable_excludes` value disabling only the global (main) excludes
pub const DISABLE_MAIN_EXCLUDES: &str = "main";

fn default_installonlypkgs() -> Vec<String> {
    [
        "kernel",
        "kernel-PAE",
        "installonlypkg(kernel)",
        "installonlypkg(kernel-module)",
        "installonlypkg(vm)",
        "multiversion(kernel)",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_versionlock_path() -> PathBuf {
    PathBuf::from(DEFAULT_VERSIONLOCK_PATH)
}

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    99
}

fn default_cost() -> i32 {
    1000
}

/// Global configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigMain {
    /// Package specs excluded from every repository
    #[serde(default)]
    pub excludepkgs: Vec<String>,

    /// When non-empty, only matching packages are considered
    #[serde(default)]
    pub includepkgs: Vec<String>,

    /// Repository ids (or "main", or "*") whose excludes are not applied
    #[serde(default)]
    pub disable_excludes: Vec<String>,

    /// Provides of packages that may be installed in several versions
    #[serde(default = "default_installonlypkgs")]
    pub installonlypkgs: Vec<String>,

    #[serde(default = "default_true")]
    pub versionlock: bool,

    #[serde(default = "default_versionlock_path")]
    pub versionlock_path: PathBuf,

    /// Per-repository sections, keyed by repository id
    #[serde(default)]
    pub repos: BTreeMap<String, RepoConfig>,
}

impl Default for ConfigMain {
    fn default() -> Self {
        Self {
            excludepkgs: Vec::new(),
            includepkgs: Vec::new(),
            disable_excludes: Vec::new(),
            installonlypkgs: default_installonlypkgs(),
            versionlock: true,
            versionlock_path: default_versionlock_path(),
            repos: BTreeMap::new(),
        }
    }
}

impl ConfigMain {
    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Configuration section of a repository, if any
    pub fn repo(&self, id: &str) -> Option<&RepoConfig> {
        self.repos.get(id)
    }

    /// True when `disable_excludes` turns off every exclude source
    pub fn excludes_disabled(&self) -> bool {
        self.disable_excludes.iter().any(|v| v == DISABLE_ALL_EXCLUDES)
    }

    /// True when the excludes of `source` ("main" or a repository id) are off
    pub fn excludes_disabled_for(&self, source: &str) -> bool {
        self.disable_excludes
            .iter()
            .any(|v| v == DISABLE_ALL_EXCLUDES || v == source)
    }

    pub fn with_excludepkgs<I: IntoIterator<Item = S>, S: Into<String>>(mut self, specs: I) -> Self {
        self.excludepkgs = specs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_includepkgs<I: IntoIterator<Item = S>, S: Into<String>>(mut self, specs: I) -> Self {
        self.includepkgs = specs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_disable_excludes<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        sources: I,
    ) -> Self {
        self.disable_excludes = sources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_repo(mut self, id: impl Into<String>, repo: RepoConfig) -> Self {
        self.repos.insert(id.into(), repo);
        self
    }
}

/// Per-repository configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepoConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower number wins
    #[serde(default = "default_priority")]
    pub priority: i32,

    #[serde(default = "default_cost")]
    pub cost: i32,

    #[serde(default)]
    pub excludepkgs: Vec<String>,

    #[serde(default)]
    pub includepkgs: Vec<String>,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            priority: default_priority(),
            cost: default_cost(),
            excludepkgs: Vec::new(),
            includepkgs: Vec::new(),
        }
    }
}

impl RepoConfig {
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_excludepkgs<I: IntoIterator<Item = S>, S: Into<String>>(mut self, specs: I) -> Self {
        self.excludepkgs = specs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_includepkgs<I: IntoIterator<Item = S>, S: Into<String>>(mut self, specs: I) -> Self {
        self.includepkgs = specs.into_iter().map(Into::into).collect();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = ConfigMain::parse("").unwrap();
        assert_eq!(config, ConfigMain::default());
        assert!(config.installonlypkgs.contains(&"kernel".to_string()));
        assert!(config.versionlock);
        assert_eq!(config.versionlock_path, PathBuf::from(DEFAULT_VERSIONLOCK_PATH));
    }

    #[test]
    fn test_parse_full() {
        let config = ConfigMain::parse(
            r#"
excludepkgs = ["kernel-debug*"]
includepkgs = ["bash"]
disable_excludes = ["updates"]
installonlypkgs = ["kernel-core"]
versionlock = false

[repos.fedora]
priority = 10
includepkgs = ["bash", "zsh"]

[repos.updates]
enabled = false
excludepkgs = ["*"]
"#,
        )
        .unwrap();

        assert_eq!(config.excludepkgs, vec!["kernel-debug*"]);
        assert_eq!(config.installonlypkgs, vec!["kernel-core"]);
        assert!(!config.versionlock);

        let fedora = config.repo("fedora").unwrap();
        assert_eq!(fedora.priority, 10);
        assert_eq!(fedora.cost, 1000);
        assert!(fedora.enabled);
        assert_eq!(fedora.includepkgs, vec!["bash", "zsh"]);

        let updates = config.repo("updates").unwrap();
        assert!(!updates.enabled);
        assert_eq!(updates.priority, 99);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ConfigMain::parse("exclude = [\"foo\"]").unwrap_err();
        assert!(matches!(err, Error::TomlParse(_)));
    }

    #[test]
    fn test_disable_excludes() {
        let config = ConfigMain::default().with_disable_excludes(["main"]);
        assert!(!config.excludes_disabled());
        assert!(config.excludes_disabled_for("main"));
        assert!(!config.excludes_disabled_for("fedora"));

        let config = ConfigMain::default().with_disable_excludes(["*"]);
        assert!(config.excludes_disabled());
        assert!(config.excludes_disabled_for("fedora"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkgsack.toml");
        fs::write(&path, "excludepkgs = [\"foo\"]\n").unwrap();
        let config = ConfigMain::load(&path).unwrap();
        assert_eq!(config.excludepkgs, vec!["foo"]);

        let missing = ConfigMain::load(&dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(Error::IoError(_))));
    }
}
