// src/transaction/assembly.rs

//! Phased construction of transaction records

use super::{GoalResult, TransactionItemAction, TransactionItemReason, TransactionPackage, max_reason};
use crate::package::Package;
use crate::package_set::PackageSet;
use crate::pool::PackageId;
use crate::query::{PackageQuery, QueryCmp};
use crate::sack::{ExcludeFlags, PackageSack};
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, trace};

/// Actions recorded for a package that replaces an installed one
#[derive(Clone, Copy)]
struct ReplacePhase {
    name: &'static str,
    new: TransactionItemAction,
    old: TransactionItemAction,
}

const DOWNGRADES: ReplacePhase = ReplacePhase {
    name: "downgrade",
    new: TransactionItemAction::Downgrade,
    old: TransactionItemAction::Downgraded,
};

const REINSTALLS: ReplacePhase = ReplacePhase {
    name: "reinstall",
    new: TransactionItemAction::Reinstall,
    old: TransactionItemAction::Reinstalled,
};

const UPGRADES: ReplacePhase = ReplacePhase {
    name: "upgrade",
    new: TransactionItemAction::Upgrade,
    old: TransactionItemAction::Upgraded,
};

struct Assembler<'a, G: GoalResult> {
    sack: &'a PackageSack,
    goal: &'a G,
    records: Vec<TransactionPackage>,
    /// obsoleted package -> packages obsoleting it
    obsoleted: BTreeMap<PackageId, Vec<PackageId>>,
    /// Everything replaced or obsoleted so far
    leaving: PackageSet,
}

impl<'a, G: GoalResult> Assembler<'a, G> {
    fn new(sack: &'a PackageSack, goal: &'a G) -> Self {
        Self {
            sack,
            goal,
            records: Vec::new(),
            obsoleted: BTreeMap::new(),
            leaving: PackageSet::new(sack),
        }
    }

    fn package(&self, id: PackageId) -> Package {
        Package::new(self.sack, id)
    }

    fn packages(&self, ids: &[PackageId]) -> Vec<Package> {
        ids.iter().map(|id| self.package(*id)).collect()
    }

    /// `reason` raised to the stickiest reason among `obsoletes`
    fn propagate_reason(&self, reason: TransactionItemReason, obsoletes: &[PackageId]) -> TransactionItemReason {
        obsoletes
            .iter()
            .fold(reason, |reason, id| max_reason(reason, self.goal.get_reason(*id)))
    }

    fn note_obsoleted(&mut self, obsoleter: PackageId, obsoletes: &[PackageId]) {
        for id in obsoletes {
            self.obsoleted.entry(*id).or_default().push(obsoleter);
        }
    }

    fn note_leaving(&mut self, ids: &[PackageId]) {
        for id in ids {
            let package = self.package(*id);
            self.leaving.add(&package);
        }
    }

    fn replace_phase(&mut self, ids: Vec<PackageId>, phase: ReplacePhase) {
        debug!("Assembling {} {} record(s)", ids.len(), phase.name);
        for id in ids {
            let obsoletes = self.goal.list_obsoleted_by_package(id);
            let Some((&primary, secondary)) = obsoletes.split_first() else {
                panic!("{} of package {} obsoletes nothing", phase.name, self.package(id));
            };

            let reason = self.propagate_reason(self.goal.get_reason(id), &obsoletes);
            let mut new = TransactionPackage::new(self.package(id), phase.new, reason);
            new.replaces = self.packages(&obsoletes);
            trace!("{} {} replacing {:?}", phase.new, new.package, new.replaces);

            let mut old = TransactionPackage::new(self.package(primary), phase.old, self.goal.get_reason(primary));
            old.replaced_by = vec![new.package.clone()];

            self.records.push(new);
            self.records.push(old);
            self.note_obsoleted(id, secondary);
            self.note_leaving(&obsoletes);
        }
    }

    fn install_phase(&mut self, ids: Vec<PackageId>) {
        debug!("Assembling {} install record(s)", ids.len());
        let mut installonly = PackageQuery::with_flags(self.sack, ExcludeFlags::IGNORE_EXCLUDES);
        installonly.filter_installonly();

        for id in ids {
            let package = self.package(id);
            let mut reason = self.goal.get_reason(id);

            // A new version of an installonly package keeps the reason of the
            // versions already installed next to it
            if installonly.contains_id(id) {
                let mut installed = PackageQuery::with_flags(self.sack, ExcludeFlags::IGNORE_EXCLUDES);
                installed.filter_installed();
                installed.filter_name(&[package.name()], QueryCmp::EQ);
                if !installed.is_empty() {
                    reason = installed
                        .ids()
                        .fold(TransactionItemReason::None, |r, other| max_reason(r, self.goal.get_reason(other)));
                    trace!("Installonly {} inherits reason {}", package, reason);
                }
            }

            let obsoletes = self.goal.list_obsoleted_by_package(id);
            let reason = self.propagate_reason(reason, &obsoletes);
            let mut record = TransactionPackage::new(package, TransactionItemAction::Install, reason);
            record.replaces = self.packages(&obsoletes);
            self.records.push(record);
            self.note_obsoleted(id, &obsoletes);
            self.note_leaving(&obsoletes);
        }
    }

    /// Emit the remove records, each preceded by REASON_CHANGE records for its
    /// survivors
    ///
    /// A survivor is an installed package of the same name and arch that
    /// stays installed. Every package in `ids`, including removals later in
    /// the list, and every package already replaced or obsoleted is counted
    /// as leaving before any record is emitted, so none of them is a
    /// survivor. A survivor gets at most one REASON_CHANGE record.
    fn remove_phase(&mut self, ids: Vec<PackageId>) {
        debug!("Assembling {} remove record(s)", ids.len());
        self.note_leaving(&ids);

        let mut reason_changed: HashSet<PackageId> = HashSet::new();
        for id in ids {
            let package = self.package(id);

            // Another installed version of the same name and arch stays
            let mut survivors = PackageQuery::with_flags(self.sack, ExcludeFlags::IGNORE_EXCLUDES);
            survivors.filter_installed();
            survivors.filter_name(&[package.name()], QueryCmp::EQ);
            survivors.filter_arch(&[package.arch()], QueryCmp::EQ);
            survivors -= &self.leaving;

            for survivor in survivors.ids() {
                if reason_changed.insert(survivor) {
                    let record = TransactionPackage::new(
                        self.package(survivor),
                        TransactionItemAction::ReasonChange,
                        self.goal.get_reason(survivor),
                    );
                    trace!("Keeping reason of surviving {}", record.package);
                    self.records.push(record);
                }
            }

            let reason = self.goal.get_reason(id);
            self.records
                .push(TransactionPackage::new(package, TransactionItemAction::Remove, reason));
        }
    }

    fn obsoleted_phase(&mut self) {
        debug!("Assembling {} obsoleted record(s)", self.obsoleted.len());
        let obsoleted = std::mem::take(&mut self.obsoleted);
        for (id, obsoleters) in obsoleted {
            let mut record = TransactionPackage::new(
                self.package(id),
                TransactionItemAction::Obsoleted,
                self.goal.get_reason(id),
            );
            record.replaced_by = self.packages(&obsoleters);
            self.records.push(record);
        }
    }
}

/// Build the ordered record list for `goal`
pub(super) fn assemble(sack: &PackageSack, goal: &impl GoalResult) -> Vec<TransactionPackage> {
    let mut assembler = Assembler::new(sack, goal);
    assembler.replace_phase(goal.list_downgrades(), DOWNGRADES);
    assembler.replace_phase(goal.list_reinstalls(), REINSTALLS);
    assembler.install_phase(goal.list_installs());
    assembler.replace_phase(goal.list_upgrades(), UPGRADES);
    assembler.remove_phase(goal.list_removes());
    assembler.obsoleted_phase();
    debug!("Transaction assembled with {} record(s)", assembler.records.len());
    assembler.records
}

#[cfg(test)]
mod tests {
    use super::super::{SolverResult, Transaction};
    use super::*;
    use crate::pool::{PackageInfo, Repo};

    struct Fixture {
        sack: PackageSack,
        system: crate::pool::RepoId,
        fedora: crate::pool::RepoId,
    }

    impl Fixture {
        fn new() -> Self {
            let sack = PackageSack::new();
            let system = sack.add_system_repo();
            let fedora = sack.add_repo(Repo::new("fedora"));
            Self { sack, system, fedora }
        }

        fn installed(&self, name: &str, evr: &str) -> PackageId {
            self.sack
                .add_package(self.system, PackageInfo::new(name, evr, "x86_64"))
                .unwrap()
        }

        fn available(&self, name: &str, evr: &str) -> PackageId {
            self.sack
                .add_package(self.fedora, PackageInfo::new(name, evr, "x86_64"))
                .unwrap()
        }
    }

    fn summary(tx: &Transaction) -> Vec<String> {
        tx.packages()
            .iter()
            .map(|p| format!("{} {} {}", p.action(), p.package(), p.reason()))
            .collect()
    }

    #[test]
    fn test_upgrade_pair_carries_reason() {
        let fx = Fixture::new();
        let old = fx.installed("bash", "1-1");
        let new = fx.available("bash", "2-1");
        let mut goal = SolverResult::new();
        goal.upgrade(new, &[old])
            .reason(old, TransactionItemReason::Dependency);

        let tx = Transaction::assemble(&fx.sack, &goal);
        assert_eq!(
            summary(&tx),
            vec![
                "Upgrade bash-2-1.x86_64 Dependency",
                "Upgraded bash-1-1.x86_64 Dependency",
            ]
        );
        assert_eq!(tx.packages()[0].replaces()[0].id(), old);
        assert_eq!(tx.packages()[1].replaced_by()[0].id(), new);
    }

    #[test]
    fn test_phase_order() {
        let fx = Fixture::new();
        let a_old = fx.installed("a", "2-1");
        let b_old = fx.installed("b", "1-1");
        let c_old = fx.installed("c", "1-1");
        let gone = fx.installed("gone", "1-1");
        let a_new = fx.available("a", "1-1");
        let b_new = fx.available("b", "1-1");
        let c_new = fx.available("c", "2-1");
        let fresh = fx.available("fresh", "1-1");

        let mut goal = SolverResult::new();
        goal.remove(gone)
            .upgrade(c_new, &[c_old])
            .install(fresh, &[])
            .reinstall(b_new, &[b_old])
            .downgrade(a_new, &[a_old]);

        let tx = Transaction::assemble(&fx.sack, &goal);
        let actions: Vec<_> = tx.packages().iter().map(|p| p.action()).collect();
        assert_eq!(
            actions,
            vec![
                TransactionItemAction::Downgrade,
                TransactionItemAction::Downgraded,
                TransactionItemAction::Reinstall,
                TransactionItemAction::Reinstalled,
                TransactionItemAction::Install,
                TransactionItemAction::Upgrade,
                TransactionItemAction::Upgraded,
                TransactionItemAction::Remove,
            ]
        );
        let summary = tx.summary();
        assert_eq!(summary.total_records, 8);
        assert_eq!(summary.to_string(), "1 install, 1 upgrade, 1 downgrade, 1 reinstall, 1 removal");
    }

    #[test]
    #[should_panic(expected = "upgrade of package foo-2-1.x86_64 obsoletes nothing")]
    fn test_upgrade_without_obsoletes_panics() {
        let fx = Fixture::new();
        let new = fx.available("foo", "2-1");
        let mut goal = SolverResult::new();
        goal.upgrade(new, &[]);
        Transaction::assemble(&fx.sack, &goal);
    }

    #[test]
    fn test_secondary_obsoletes_are_aggregated() {
        let fx = Fixture::new();
        let old = fx.installed("vim", "8-1");
        let vi = fx.installed("vi", "7-1");
        let new = fx.available("vim", "9-1");
        let editor = fx.available("editor", "1-1");

        let mut goal = SolverResult::new();
        goal.install(editor, &[vi])
            .upgrade(new, &[old, vi])
            .reason(vi, TransactionItemReason::User)
            .reason(new, TransactionItemReason::Dependency);

        let tx = Transaction::assemble(&fx.sack, &goal);
        let upgrade = &tx.packages_by_action(TransactionItemAction::Upgrade)[0];
        assert_eq!(upgrade.reason(), TransactionItemReason::User);
        assert_eq!(upgrade.replaces().len(), 2);

        let obsoleted = tx.packages_by_action(TransactionItemAction::Obsoleted);
        assert_eq!(obsoleted.len(), 1);
        let by: Vec<_> = obsoleted[0].replaced_by().iter().map(Package::id).collect();
        assert_eq!(by, vec![editor, new]);
        assert_eq!(tx.packages().last().unwrap().action(), TransactionItemAction::Obsoleted);
    }

    #[test]
    fn test_installonly_inherits_installed_reason() {
        let fx = Fixture::new();
        let running = fx.installed("kernel", "6.1-1");
        let next = fx.available("kernel", "6.2-1");
        let mut goal = SolverResult::new();
        goal.install(next, &[])
            .reason(running, TransactionItemReason::Dependency)
            .reason(next, TransactionItemReason::User);

        let tx = Transaction::assemble(&fx.sack, &goal);
        assert_eq!(tx.packages()[0].reason(), TransactionItemReason::Dependency);
    }

    #[test]
    fn test_remove_of_one_installonly_version_keeps_survivor_reason() {
        let fx = Fixture::new();
        let k1 = fx.installed("kernel", "6.1-1");
        let k2 = fx.installed("kernel", "6.2-1");
        let k3 = fx.installed("kernel", "6.3-1");
        let mut goal = SolverResult::new();
        goal.remove(k1)
            .remove(k2)
            .reason(k3, TransactionItemReason::User);

        let tx = Transaction::assemble(&fx.sack, &goal);
        assert_eq!(
            summary(&tx),
            vec![
                "Reason Change kernel-6.3-1.x86_64 User",
                "Remove kernel-6.1-1.x86_64 Unknown",
                "Remove kernel-6.2-1.x86_64 Unknown",
            ]
        );
        assert!(!tx.is_empty());
    }

    #[test]
    fn test_empty_goal() {
        let fx = Fixture::new();
        let tx = Transaction::assemble(&fx.sack, &SolverResult::new());
        assert!(tx.is_empty());
        assert_eq!(tx.summary().to_string(), "Nothing to do");
    }
}
