// src/transaction/mod.rs

//! Transaction assembly
//!
//! Turns the per-action id lists of a dependency solver into the flat,
//! ordered list of [`TransactionPackage`] records an executor runs and the
//! history database stores. Each record names a package, what happens to
//! it, and why it is (or stays) on the system.
//!
//! Records are emitted in fixed phases:
//!
//! ```text
//! downgrades -> reinstalls -> installs -> upgrades -> removes -> obsoletes
//! ```
//!
//! A package that replaces or obsoletes others never ends up with a weaker
//! reason than any of them.

mod assembly;
mod goal;

pub use goal::{GoalResult, SolverResult};

use crate::package::Package;
use crate::sack::PackageSack;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What happens to a package in a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionItemAction {
    Install,
    Upgrade,
    /// The old side of an upgrade
    Upgraded,
    Downgrade,
    Downgraded,
    Reinstall,
    Reinstalled,
    Remove,
    /// Removed because a package in the transaction obsoletes it
    Obsoleted,
    /// Stays installed; only the recorded reason is updated
    ReasonChange,
}

impl TransactionItemAction {
    pub const ALL: [TransactionItemAction; 10] = [
        Self::Install,
        Self::Upgrade,
        Self::Upgraded,
        Self::Downgrade,
        Self::Downgraded,
        Self::Reinstall,
        Self::Reinstalled,
        Self::Remove,
        Self::Obsoleted,
        Self::ReasonChange,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Install => "Install",
            Self::Upgrade => "Upgrade",
            Self::Upgraded => "Upgraded",
            Self::Downgrade => "Downgrade",
            Self::Downgraded => "Downgraded",
            Self::Reinstall => "Reinstall",
            Self::Reinstalled => "Reinstalled",
            Self::Remove => "Remove",
            Self::Obsoleted => "Obsoleted",
            Self::ReasonChange => "Reason Change",
        }
    }

    /// The package ends up on the system
    pub fn is_inbound(&self) -> bool {
        matches!(
            self,
            Self::Install | Self::Upgrade | Self::Downgrade | Self::Reinstall
        )
    }

    /// The package leaves the system
    pub fn is_outbound(&self) -> bool {
        matches!(
            self,
            Self::Upgraded
                | Self::Downgraded
                | Self::Reinstalled
                | Self::Remove
                | Self::Obsoleted
        )
    }
}

impl fmt::Display for TransactionItemAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a package is on the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TransactionItemReason {
    #[default]
    None,
    Dependency,
    User,
    Clean,
    WeakDependency,
    Group,
    ExternalUser,
}

impl TransactionItemReason {
    /// Stickiness: higher ranks survive autoremove longer
    ///
    /// `Dependency` and `ExternalUser` share a rank.
    pub fn rank(&self) -> u8 {
        match self {
            Self::None => 0,
            Self::Clean => 1,
            Self::WeakDependency => 2,
            Self::Dependency | Self::ExternalUser => 3,
            Self::Group => 4,
            Self::User => 5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "Unknown",
            Self::Dependency => "Dependency",
            Self::User => "User",
            Self::Clean => "Clean",
            Self::WeakDependency => "Weak Dependency",
            Self::Group => "Group",
            Self::ExternalUser => "External User",
        }
    }

    /// Parse a name produced by [`as_str`](Self::as_str)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Unknown" => Some(Self::None),
            "Dependency" => Some(Self::Dependency),
            "User" => Some(Self::User),
            "Clean" => Some(Self::Clean),
            "Weak Dependency" => Some(Self::WeakDependency),
            "Group" => Some(Self::Group),
            "External User" => Some(Self::ExternalUser),
            _ => None,
        }
    }
}

impl fmt::Display for TransactionItemReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The stickier of two reasons; `a` wins ties
pub fn max_reason(a: TransactionItemReason, b: TransactionItemReason) -> TransactionItemReason {
    if b.rank() > a.rank() { b } else { a }
}

/// One record of an assembled transaction
#[derive(Debug, Clone)]
pub struct TransactionPackage {
    package: Package,
    action: TransactionItemAction,
    reason: TransactionItemReason,
    replaces: Vec<Package>,
    replaced_by: Vec<Package>,
}

impl TransactionPackage {
    pub(crate) fn new(package: Package, action: TransactionItemAction, reason: TransactionItemReason) -> Self {
        Self {
            package,
            action,
            reason,
            replaces: Vec::new(),
            replaced_by: Vec::new(),
        }
    }

    pub fn package(&self) -> &Package {
        &self.package
    }

    pub fn action(&self) -> TransactionItemAction {
        self.action
    }

    pub fn reason(&self) -> TransactionItemReason {
        self.reason
    }

    /// Packages this one replaces, primary target first
    pub fn replaces(&self) -> &[Package] {
        &self.replaces
    }

    /// Packages replacing this one
    pub fn replaced_by(&self) -> &[Package] {
        &self.replaced_by
    }
}

impl fmt::Display for TransactionPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.action, self.package, self.reason)
    }
}

/// An assembled, ordered list of transaction records
#[derive(Debug, Clone)]
pub struct Transaction {
    sack: PackageSack,
    packages: Vec<TransactionPackage>,
}

impl Transaction {
    /// Assemble the records for a solver result
    ///
    /// # Panics
    ///
    /// Panics when the solver reports an upgrade, downgrade or reinstall
    /// that replaces nothing.
    pub fn assemble(sack: &PackageSack, goal: &impl GoalResult) -> Self {
        Self {
            sack: sack.clone(),
            packages: assembly::assemble(sack, goal),
        }
    }

    pub fn sack(&self) -> &PackageSack {
        &self.sack
    }

    pub fn packages(&self) -> &[TransactionPackage] {
        &self.packages
    }

    pub fn packages_by_action(&self, action: TransactionItemAction) -> Vec<&TransactionPackage> {
        self.packages.iter().filter(|p| p.action == action).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn summary(&self) -> TransactionSummary {
        let mut summary = TransactionSummary::default();
        for package in &self.packages {
            match package.action {
                TransactionItemAction::Install => summary.installs += 1,
                TransactionItemAction::Upgrade => summary.upgrades += 1,
                TransactionItemAction::Downgrade => summary.downgrades += 1,
                TransactionItemAction::Reinstall => summary.reinstalls += 1,
                TransactionItemAction::Remove => summary.removes += 1,
                TransactionItemAction::Obsoleted => summary.obsoleted += 1,
                TransactionItemAction::ReasonChange => summary.reason_changes += 1,
                TransactionItemAction::Upgraded
                | TransactionItemAction::Downgraded
                | TransactionItemAction::Reinstalled => {}
            }
        }
        summary.total_records = self.packages.len();
        summary
    }
}

impl<'a> IntoIterator for &'a Transaction {
    type Item = &'a TransactionPackage;
    type IntoIter = std::slice::Iter<'a, TransactionPackage>;

    fn into_iter(self) -> Self::IntoIter {
        self.packages.iter()
    }
}

/// Counts of a transaction's records
///
/// The old side of upgrades, downgrades and reinstalls is only reflected in
/// `total_records`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub total_records: usize,
    pub installs: usize,
    pub upgrades: usize,
    pub downgrades: usize,
    pub reinstalls: usize,
    pub removes: usize,
    pub obsoleted: usize,
    pub reason_changes: usize,
}

impl fmt::Display for TransactionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [
            (self.installs, "install"),
            (self.upgrades, "upgrade"),
            (self.downgrades, "downgrade"),
            (self.reinstalls, "reinstall"),
            (self.removes, "removal"),
            (self.obsoleted, "obsoleted"),
            (self.reason_changes, "reason change"),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| {
            let plural = if *count == 1 || *label == "obsoleted" { "" } else { "s" };
            format!("{} {}{}", count, label, plural)
        })
        .collect();

        if parts.is_empty() {
            f.write_str("Nothing to do")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}
