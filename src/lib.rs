// src/lib.rs

//! Package query, exclusion and transaction assembly for RPM package
//! universes
//!
//! # Architecture
//!
//! - Pool: an in-memory arena of packages ("solvables") and interned
//!   dependency expressions, indexed by dense integer ids
//! - Sets: bitmaps over the pool id space ([`SolvMap`], [`PackageSet`])
//! - Queries: a [`PackageQuery`] narrows a set with chainable filters
//! - Sack: owns the pool plus the exclude/include layers and derives the
//!   "considered" map every query starts from
//! - Transactions: [`Transaction::assemble`] turns solver output into
//!   ordered, reason-annotated records
//!
//! Everything is single-threaded; a sack is shared between handles through
//! reference counting.

mod error;
pub mod nevra;
pub mod package;
pub mod package_set;
pub mod pool;
pub mod query;
pub mod reldep;
pub mod sack;
pub mod solv_map;
pub mod transaction;
pub mod version;

pub use error::{Error, Result};
pub use nevra::{AsNevra, DEFAULT_FORMS, Nevra, NevraForm};
pub use package::Package;
pub use package_set::PackageSet;
pub use pool::{DepKind, PackageId, PackageInfo, Repo, RepoId};
pub use query::{PackageQuery, QueryCmp, ResolveSpecSettings};
pub use reldep::{Reldep, ReldepList};
pub use sack::config::{ConfigMain, RepoConfig};
pub use sack::versionlock::{VersionlockConfig, VersionlockPackage};
pub use sack::{ExcludeFlags, PackageSack};
pub use solv_map::SolvMap;
pub use transaction::{
    GoalResult, SolverResult, Transaction, TransactionItemAction, TransactionItemReason,
    TransactionPackage, TransactionSummary,
};
pub use version::{evrcmp, rpmvercmp};
