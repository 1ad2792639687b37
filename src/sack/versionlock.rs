// src/sack/versionlock.rs

//! Versionlock policy file
//!
//! A versionlock file restricts which versions of a package may be
//! considered. Each entry names a package (glob allowed) and a list of
//! conditions that all have to hold for a version to stay available.
//!
//! # Format
//!
//! ```toml
//! version = "1.0"
//!
//! [[packages]]
//! name = "kernel"
//! comment = "stay on 6.8 until the nvidia driver catches up"
//! conditions = [
//!     { key = "evr", comparator = "<", value = "6.9" },
//!     { key = "arch", comparator = "=", value = "x86_64" },
//! ]
//! ```
//!
//! Files without a `version` marker, or with a version other than
//! [`VERSIONLOCK_FILE_VERSION`], are ignored as if no lock was configured.
//! Invalid entries are kept (so they can be shown and fixed) but carry a
//! list of errors and take no effect.

use crate::error::Result;
use crate::query::QueryCmp;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Supported versionlock file format version
pub const VERSIONLOCK_FILE_VERSION: &str = "1.0";

/// What a versionlock condition compares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKey {
    Epoch,
    Evr,
    Arch,
}

impl ConditionKey {
    pub fn parse(key: &str) -> Option<Self> {
        match key {
            "epoch" => Some(Self::Epoch),
            "evr" => Some(Self::Evr),
            "arch" => Some(Self::Arch),
            _ => None,
        }
    }
}

fn parse_comparator(op: &str) -> Option<QueryCmp> {
    match op {
        "=" | "==" => Some(QueryCmp::EQ),
        "<" => Some(QueryCmp::LT),
        "<=" => Some(QueryCmp::LTE),
        ">" => Some(QueryCmp::GT),
        ">=" => Some(QueryCmp::GTE),
        "<>" | "!=" => Some(QueryCmp::NEQ),
        _ => None,
    }
}

/// On-disk shape of a condition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConditionRecord {
    #[serde(default)]
    key: String,
    #[serde(default)]
    comparator: String,
    #[serde(default)]
    value: String,
}

/// One `key comparator value` condition of a versionlock entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionRecord", into = "ConditionRecord")]
pub struct VersionlockCondition {
    key_str: String,
    comparator_str: String,
    value: String,
    key: Option<ConditionKey>,
    comparator: Option<QueryCmp>,
    errors: Vec<String>,
}

impl VersionlockCondition {
    /// Build and validate a condition
    pub fn new(key: &str, comparator: &str, value: &str) -> Self {
        let mut errors = Vec::new();

        let parsed_key = ConditionKey::parse(key);
        if parsed_key.is_none() {
            if key.is_empty() {
                errors.push("missing condition key".to_string());
            } else {
                errors.push(format!("invalid condition key \"{}\"", key));
            }
        }

        let parsed_cmp = parse_comparator(comparator);
        if parsed_cmp.is_none() {
            if comparator.is_empty() {
                errors.push("missing condition comparison operator".to_string());
            } else {
                errors.push(format!(
                    "invalid condition comparison operator \"{}\"",
                    comparator
                ));
            }
        }

        if value.is_empty() {
            errors.push("missing condition value".to_string());
        }

        if errors.is_empty() {
            match (parsed_key, parsed_cmp) {
                (Some(ConditionKey::Epoch), _) if value.parse::<u64>().is_err() => {
                    errors.push("epoch condition value needs to be an unsigned integer".to_string());
                }
                (Some(ConditionKey::Arch), Some(cmp)) if cmp != QueryCmp::EQ && cmp != QueryCmp::NEQ => {
                    errors.push(
                        "\"arch\" condition only supports \"=\" and \"!=\" comparison operators"
                            .to_string(),
                    );
                }
                _ => {}
            }
        }

        Self {
            key_str: key.to_string(),
            comparator_str: comparator.to_string(),
            value: value.to_string(),
            key: parsed_key,
            comparator: parsed_cmp,
            errors,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Parsed key; `None` for an invalid condition
    pub fn key(&self) -> Option<ConditionKey> {
        self.key
    }

    /// Parsed comparator; `None` for an invalid condition
    pub fn comparator(&self) -> Option<QueryCmp> {
        self.comparator
    }

    pub fn key_str(&self) -> &str {
        &self.key_str
    }

    pub fn comparator_str(&self) -> &str {
        &self.comparator_str
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render as "key comparator value", optionally followed by "# errors"
    pub fn to_string_with_errors(&self, with_errors: bool) -> String {
        let mut out = format!("{} {} {}", self.key_str, self.comparator_str, self.value);
        if with_errors && !self.is_valid() {
            out.push_str(&format!(" # {}", self.errors.join(", ")));
        }
        out
    }
}

impl From<ConditionRecord> for VersionlockCondition {
    fn from(record: ConditionRecord) -> Self {
        Self::new(&record.key, &record.comparator, &record.value)
    }
}

impl From<VersionlockCondition> for ConditionRecord {
    fn from(condition: VersionlockCondition) -> Self {
        Self {
            key: condition.key_str,
            comparator: condition.comparator_str,
            value: condition.value,
        }
    }
}

impl fmt::Display for VersionlockCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with_errors(true))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct PackageRecord {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    comment: String,
    #[serde(default)]
    conditions: Vec<VersionlockCondition>,
}

/// A locked package: a name pattern and the conditions its versions must meet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PackageRecord", into = "PackageRecord")]
pub struct VersionlockPackage {
    name: String,
    comment: String,
    conditions: Vec<VersionlockCondition>,
    errors: Vec<String>,
}

impl VersionlockPackage {
    pub fn new(name: &str, conditions: Vec<VersionlockCondition>) -> Self {
        let mut errors = Vec::new();
        if name.is_empty() {
            errors.push("missing package name".to_string());
        }
        // An entry without conditions would lock nothing
        if conditions.is_empty() {
            errors.push("missing package conditions".to_string());
        }
        Self {
            name: name.to_string(),
            comment: String::new(),
            conditions,
            errors,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    pub fn add_condition(&mut self, condition: VersionlockCondition) {
        self.conditions.push(condition);
        self.errors.retain(|e| e != "missing package conditions");
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn comment(&self) -> &str {
        &self.comment
    }

    pub fn conditions(&self) -> &[VersionlockCondition] {
        &self.conditions
    }

    /// True when the entry itself is well formed
    ///
    /// Conditions are validated separately; see [`is_usable`](Self::is_usable).
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when the entry and every one of its conditions are valid
    pub fn is_usable(&self) -> bool {
        self.is_valid() && self.conditions.iter().all(VersionlockCondition::is_valid)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Multi-line human readable rendering
    ///
    /// ```text
    /// # comment
    /// Package name: kernel
    /// evr < 6.9
    /// ```
    pub fn to_string_with(&self, with_errors: bool, with_comment: bool) -> String {
        let mut out = String::new();
        if with_comment && !self.comment.is_empty() {
            out.push_str(&format!("# {}\n", self.comment));
        }
        out.push_str(&format!("Package name: {}", self.name));
        if with_errors && !self.is_valid() {
            out.push_str(&format!(" # entry is invalid: {}", self.errors.join(", ")));
        }
        for condition in &self.conditions {
            out.push('\n');
            out.push_str(&condition.to_string_with_errors(with_errors));
        }
        out
    }
}

impl From<PackageRecord> for VersionlockPackage {
    fn from(record: PackageRecord) -> Self {
        Self::new(&record.name, record.conditions).with_comment(record.comment)
    }
}

impl From<VersionlockPackage> for PackageRecord {
    fn from(package: VersionlockPackage) -> Self {
        Self {
            name: package.name,
            comment: package.comment,
            conditions: package.conditions,
        }
    }
}

impl fmt::Display for VersionlockPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_with(true, true))
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VersionlockFile {
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    packages: Vec<VersionlockPackage>,
}

/// The versionlock policy loaded from (and saved to) one file
#[derive(Debug, Clone, PartialEq)]
pub struct VersionlockConfig {
    path: PathBuf,
    packages: Vec<VersionlockPackage>,
}

impl VersionlockConfig {
    /// Empty policy bound to `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            packages: Vec::new(),
        }
    }

    /// Load the policy stored at `path`
    ///
    /// A missing file, or one with a missing or unsupported version marker,
    /// yields an empty policy. Unreadable files and TOML syntax errors fail.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(path));
        }
        let content = fs::read_to_string(path)?;
        let mut config = Self::parse(&content)?;
        config.path = path.to_path_buf();
        Ok(config)
    }

    /// Parse policy text not bound to any file
    pub fn parse(content: &str) -> Result<Self> {
        let file: VersionlockFile = toml::from_str(content)?;
        let mut config = Self::new(PathBuf::new());
        match file.version.as_deref() {
            Some(VERSIONLOCK_FILE_VERSION) => config.packages = file.packages,
            Some(other) => info!("Ignoring versionlock file with unsupported version {}", other),
            None => info!("Ignoring unversioned versionlock file"),
        }
        Ok(config)
    }

    /// Write the policy back to its file, creating parent directories
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, self.to_toml()?)?;
        Ok(())
    }

    /// Serialize to TOML, version marker included
    pub fn to_toml(&self) -> Result<String> {
        let file = VersionlockFile {
            version: Some(VERSIONLOCK_FILE_VERSION.to_string()),
            packages: self.packages.clone(),
        };
        Ok(toml::to_string_pretty(&file)?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn packages(&self) -> &[VersionlockPackage] {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut Vec<VersionlockPackage> {
        &mut self.packages
    }

    pub fn add_package(&mut self, package: VersionlockPackage) {
        self.packages.push(package);
    }

    /// True when every entry and every condition is valid
    pub fn is_valid(&self) -> bool {
        self.packages.iter().all(VersionlockPackage::is_usable)
    }

    /// Every validation error, prefixed with the entry it belongs to
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        for package in &self.packages {
            for error in package.errors() {
                errors.push(format!("package \"{}\": {}", package.name(), error));
            }
            for condition in package.conditions() {
                for error in condition.errors() {
                    errors.push(format!("package \"{}\": {}", package.name(), error));
                }
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    const SAMPLE: &str = r#"
version = "1.0"

[[packages]]
name = "kernel"
comment = "hold"
conditions = [
    { key = "evr", comparator = "<", value = "6.9" },
    { key = "arch", comparator = "=", value = "x86_64" },
]

[[packages]]
name = "bash"
conditions = [{ key = "evr", comparator = "~=", value = "5.0" }]
"#;

    // ===================
    // Conditions
    // ===================

    #[test]
    fn test_condition_valid() {
        let cond = VersionlockCondition::new("evr", ">=", "1.0-1");
        assert!(cond.is_valid());
        assert_eq!(cond.key(), Some(ConditionKey::Evr));
        assert_eq!(cond.comparator(), Some(QueryCmp::GTE));
        assert_eq!(cond.to_string(), "evr >= 1.0-1");
    }

    #[test]
    fn test_condition_comparator_aliases() {
        assert_eq!(VersionlockCondition::new("evr", "==", "1").comparator(), Some(QueryCmp::EQ));
        assert_eq!(VersionlockCondition::new("evr", "<>", "1").comparator(), Some(QueryCmp::NEQ));
        assert_eq!(VersionlockCondition::new("evr", "!=", "1").comparator(), Some(QueryCmp::NEQ));
    }

    #[test]
    fn test_condition_errors() {
        let cond = VersionlockCondition::new("", "", "");
        assert_eq!(
            cond.errors(),
            &[
                "missing condition key".to_string(),
                "missing condition comparison operator".to_string(),
                "missing condition value".to_string(),
            ]
        );

        let cond = VersionlockCondition::new("color", "~", "1");
        assert_eq!(
            cond.errors(),
            &[
                "invalid condition key \"color\"".to_string(),
                "invalid condition comparison operator \"~\"".to_string(),
            ]
        );
        assert_eq!(
            cond.to_string(),
            "color ~ 1 # invalid condition key \"color\", invalid condition comparison operator \"~\""
        );
    }

    #[test]
    fn test_condition_key_specific_checks() {
        let cond = VersionlockCondition::new("epoch", "=", "one");
        assert_eq!(
            cond.errors(),
            &["epoch condition value needs to be an unsigned integer".to_string()]
        );
        assert!(VersionlockCondition::new("epoch", ">", "2").is_valid());

        let cond = VersionlockCondition::new("arch", "<", "x86_64");
        assert!(!cond.is_valid());
        assert!(VersionlockCondition::new("arch", "!=", "i686").is_valid());
    }

    // ===================
    // Packages
    // ===================

    #[test]
    fn test_package_errors() {
        let pkg = VersionlockPackage::new("", vec![]);
        assert_eq!(
            pkg.errors(),
            &["missing package name".to_string(), "missing package conditions".to_string()]
        );

        let mut pkg = VersionlockPackage::new("foo", vec![]);
        assert!(!pkg.is_valid());
        pkg.add_condition(VersionlockCondition::new("evr", "=", "1.0"));
        assert!(pkg.is_valid());
    }

    #[test]
    fn test_package_rendering() {
        let pkg = VersionlockPackage::new(
            "kernel",
            vec![
                VersionlockCondition::new("evr", "<", "6.9"),
                VersionlockCondition::new("arch", "=", "x86_64"),
            ],
        )
        .with_comment("hold");
        assert_eq!(
            pkg.to_string(),
            "# hold\nPackage name: kernel\nevr < 6.9\narch = x86_64"
        );
        assert_eq!(
            pkg.to_string_with(false, false),
            "Package name: kernel\nevr < 6.9\narch = x86_64"
        );
    }

    // ===================
    // Files
    // ===================

    #[test]
    fn test_parse_keeps_invalid_entries() {
        let config = VersionlockConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.packages().len(), 2);
        assert!(config.packages()[0].is_usable());
        assert_eq!(config.packages()[0].comment(), "hold");
        assert!(!config.packages()[1].is_usable());
        assert!(!config.is_valid());
        assert_eq!(
            config.errors(),
            vec!["package \"bash\": invalid condition comparison operator \"~=\"".to_string()]
        );
    }

    #[test]
    fn test_unversioned_file_ignored() {
        let config = VersionlockConfig::parse(
            "[[packages]]\nname = \"foo\"\nconditions = [{ key = \"evr\", comparator = \"=\", value = \"1\" }]\n",
        )
        .unwrap();
        assert!(config.packages().is_empty());
        assert!(config.is_valid());

        let config = VersionlockConfig::parse("version = \"2.0\"\n").unwrap();
        assert!(config.packages().is_empty());
    }

    #[test]
    fn test_syntax_error_fails() {
        let result = VersionlockConfig::parse("version = ");
        assert!(matches!(result, Err(Error::TomlParse(_))));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = VersionlockConfig::load(&dir.path().join("versionlock.toml")).unwrap();
        assert!(config.packages().is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("etc").join("versionlock.toml");

        let mut config = VersionlockConfig::new(&path);
        config.add_package(
            VersionlockPackage::new("foo", vec![VersionlockCondition::new("evr", "<", "2.0-1")])
                .with_comment("pinned"),
        );
        config.save().unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("version = \"1.0\""));

        let reloaded = VersionlockConfig::load(&path).unwrap();
        assert_eq!(reloaded.packages(), config.packages());
        assert_eq!(reloaded.path(), path.as_path());
    }
}
