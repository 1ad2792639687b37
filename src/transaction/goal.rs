// src/transaction/goal.rs

//! Solver output consumed by transaction assembly

use super::TransactionItemReason;
use crate::pool::PackageId;
use std::collections::HashMap;

/// Per-action package lists produced by a dependency solver
///
/// Every id returned by [`list_obsoleted_by_package`](Self::list_obsoleted_by_package)
/// for an upgrade, downgrade or reinstall must be non-empty, and its first
/// element is the package being replaced directly.
pub trait GoalResult {
    fn list_installs(&self) -> Vec<PackageId>;
    fn list_upgrades(&self) -> Vec<PackageId>;
    fn list_downgrades(&self) -> Vec<PackageId>;
    fn list_reinstalls(&self) -> Vec<PackageId>;
    fn list_removes(&self) -> Vec<PackageId>;

    /// Packages `id` replaces or obsoletes, primary target first
    fn list_obsoleted_by_package(&self, id: PackageId) -> Vec<PackageId>;

    /// Why `id` is, or will be, on the system
    fn get_reason(&self, id: PackageId) -> TransactionItemReason;
}

/// A [`GoalResult`] built up in memory
///
/// Used when the plan was computed elsewhere, and in tests.
#[derive(Debug, Clone, Default)]
pub struct SolverResult {
    installs: Vec<PackageId>,
    upgrades: Vec<PackageId>,
    downgrades: Vec<PackageId>,
    reinstalls: Vec<PackageId>,
    removes: Vec<PackageId>,
    obsoletes: HashMap<PackageId, Vec<PackageId>>,
    reasons: HashMap<PackageId, TransactionItemReason>,
}

impl SolverResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn install(&mut self, id: PackageId, obsoletes: &[PackageId]) -> &mut Self {
        self.installs.push(id);
        self.record_obsoletes(id, obsoletes)
    }

    pub fn upgrade(&mut self, id: PackageId, obsoletes: &[PackageId]) -> &mut Self {
        self.upgrades.push(id);
        self.record_obsoletes(id, obsoletes)
    }

    pub fn downgrade(&mut self, id: PackageId, obsoletes: &[PackageId]) -> &mut Self {
        self.downgrades.push(id);
        self.record_obsoletes(id, obsoletes)
    }

    pub fn reinstall(&mut self, id: PackageId, obsoletes: &[PackageId]) -> &mut Self {
        self.reinstalls.push(id);
        self.record_obsoletes(id, obsoletes)
    }

    pub fn remove(&mut self, id: PackageId) -> &mut Self {
        self.removes.push(id);
        self
    }

    /// Set the reason reported for `id`; unset ids report `None`
    pub fn reason(&mut self, id: PackageId, reason: TransactionItemReason) -> &mut Self {
        self.reasons.insert(id, reason);
        self
    }

    fn record_obsoletes(&mut self, id: PackageId, obsoletes: &[PackageId]) -> &mut Self {
        if !obsoletes.is_empty() {
            self.obsoletes.insert(id, obsoletes.to_vec());
        }
        self
    }
}

impl GoalResult for SolverResult {
    fn list_installs(&self) -> Vec<PackageId> {
        self.installs.clone()
    }

    fn list_upgrades(&self) -> Vec<PackageId> {
        self.upgrades.clone()
    }

    fn list_downgrades(&self) -> Vec<PackageId> {
        self.downgrades.clone()
    }

    fn list_reinstalls(&self) -> Vec<PackageId> {
        self.reinstalls.clone()
    }

    fn list_removes(&self) -> Vec<PackageId> {
        self.removes.clone()
    }

    fn list_obsoleted_by_package(&self, id: PackageId) -> Vec<PackageId> {
        self.obsoletes.get(&id).cloned().unwrap_or_default()
    }

    fn get_reason(&self, id: PackageId) -> TransactionItemReason {
        self.reasons.get(&id).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solver_result_lists() {
        let (a, b, c) = (PackageId::new(1), PackageId::new(2), PackageId::new(3));
        let mut result = SolverResult::new();
        result
            .upgrade(b, &[a])
            .install(c, &[])
            .reason(a, TransactionItemReason::Dependency);

        assert_eq!(result.list_upgrades(), vec![b]);
        assert_eq!(result.list_installs(), vec![c]);
        assert!(result.list_removes().is_empty());
        assert_eq!(result.list_obsoleted_by_package(b), vec![a]);
        assert!(result.list_obsoleted_by_package(c).is_empty());
        assert_eq!(result.get_reason(a), TransactionItemReason::Dependency);
        assert_eq!(result.get_reason(b), TransactionItemReason::None);
    }
}
