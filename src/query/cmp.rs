// src/query/cmp.rs

//! Query comparators and string matching

use bitflags::bitflags;
use glob::{MatchOptions, Pattern};
use std::cmp::Ordering;
use std::fmt;

bitflags! {
    /// How a filter compares package attributes against its patterns
    ///
    /// `NOT` negates the whole filter: the packages matching the positive
    /// comparator are removed instead of kept. `ICASE` makes string
    /// comparisons case-insensitive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct QueryCmp: u32 {
        const NOT = 1 << 0;
        const ICASE = 1 << 1;
        const EQ = 1 << 8;
        const LT = 1 << 9;
        const GT = 1 << 10;
        const CONTAINS = 1 << 16;
        const GLOB = 1 << 17;

        const NEQ = Self::NOT.bits() | Self::EQ.bits();
        const LTE = Self::LT.bits() | Self::EQ.bits();
        const GTE = Self::GT.bits() | Self::EQ.bits();
        const IEXACT = Self::ICASE.bits() | Self::EQ.bits();
        const NOT_IEXACT = Self::NOT.bits() | Self::IEXACT.bits();
        const ICONTAINS = Self::ICASE.bits() | Self::CONTAINS.bits();
        const NOT_CONTAINS = Self::NOT.bits() | Self::CONTAINS.bits();
        const NOT_ICONTAINS = Self::NOT.bits() | Self::ICONTAINS.bits();
        const IGLOB = Self::ICASE.bits() | Self::GLOB.bits();
        const NOT_GLOB = Self::NOT.bits() | Self::GLOB.bits();
        const NOT_IGLOB = Self::NOT.bits() | Self::IGLOB.bits();
    }
}

const NAMES: &[(&str, QueryCmp)] = &[
    ("EQ", QueryCmp::EQ),
    ("NEQ", QueryCmp::NEQ),
    ("LT", QueryCmp::LT),
    ("LTE", QueryCmp::LTE),
    ("GT", QueryCmp::GT),
    ("GTE", QueryCmp::GTE),
    ("IEXACT", QueryCmp::IEXACT),
    ("NOT_IEXACT", QueryCmp::NOT_IEXACT),
    ("CONTAINS", QueryCmp::CONTAINS),
    ("ICONTAINS", QueryCmp::ICONTAINS),
    ("NOT_CONTAINS", QueryCmp::NOT_CONTAINS),
    ("NOT_ICONTAINS", QueryCmp::NOT_ICONTAINS),
    ("GLOB", QueryCmp::GLOB),
    ("IGLOB", QueryCmp::IGLOB),
    ("NOT_GLOB", QueryCmp::NOT_GLOB),
    ("NOT_IGLOB", QueryCmp::NOT_IGLOB),
    ("NOT", QueryCmp::NOT),
    ("ICASE", QueryCmp::ICASE),
];

impl fmt::Display for QueryCmp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match NAMES.iter().find(|(_, cmp)| cmp == self) {
            Some((name, _)) => f.write_str(name),
            None => write!(f, "{:#x}", self.bits()),
        }
    }
}

impl QueryCmp {
    /// Split off `NOT`, returning whether it was set and the positive part
    pub fn split_not(self) -> (bool, QueryCmp) {
        (self.contains(Self::NOT), self - Self::NOT)
    }
}

/// True when `pattern` contains a glob metacharacter
pub fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Replace `GLOB` by `EQ` when `pattern` has no metacharacters
pub fn normalize_comparator(cmp: QueryCmp, pattern: &str) -> QueryCmp {
    if cmp.contains(QueryCmp::GLOB) && !is_glob_pattern(pattern) {
        (cmp - QueryCmp::GLOB) | QueryCmp::EQ
    } else {
        cmp
    }
}

/// Panic for a comparator a filter does not understand
pub(crate) fn unsupported(filter: &str, cmp: QueryCmp) -> ! {
    panic!("{}: unsupported comparator {}", filter, cmp)
}

/// Check the positive part of `cmp` against the comparators a filter accepts
pub(crate) fn check_supported(filter: &str, cmp: QueryCmp, supported: &[QueryCmp]) {
    if !supported.contains(&cmp) {
        unsupported(filter, cmp);
    }
}

/// True when `ord` (candidate against pattern) satisfies an ordering comparator
pub(crate) fn ordering_matches(cmp: QueryCmp, ord: Ordering) -> bool {
    match ord {
        Ordering::Less => cmp.contains(QueryCmp::LT),
        Ordering::Equal => cmp.contains(QueryCmp::EQ),
        Ordering::Greater => cmp.contains(QueryCmp::GT),
    }
}

/// A compiled string pattern for one positive comparator
#[derive(Debug)]
pub(crate) enum StringMatcher {
    Exact(String),
    IExact(String),
    Contains(String),
    IContains(String),
    Glob(Pattern),
    IGlob(Pattern),
    /// Malformed glob; matches nothing
    Never,
}

impl StringMatcher {
    /// Compile `pattern` for `cmp`, which must be a positive string comparator
    ///
    /// Returns `None` for comparators that do not apply to strings.
    pub(crate) fn new(cmp: QueryCmp, pattern: &str) -> Option<Self> {
        let cmp = normalize_comparator(cmp, pattern);
        let matcher = if cmp == QueryCmp::EQ {
            Self::Exact(pattern.to_string())
        } else if cmp == QueryCmp::IEXACT {
            Self::IExact(pattern.to_lowercase())
        } else if cmp == QueryCmp::CONTAINS {
            Self::Contains(pattern.to_string())
        } else if cmp == QueryCmp::ICONTAINS {
            Self::IContains(pattern.to_lowercase())
        } else if cmp == QueryCmp::GLOB || cmp == QueryCmp::IGLOB {
            match Pattern::new(pattern) {
                Ok(compiled) if cmp == QueryCmp::GLOB => Self::Glob(compiled),
                Ok(compiled) => Self::IGlob(compiled),
                Err(_) => Self::Never,
            }
        } else {
            return None;
        };
        Some(matcher)
    }

    pub(crate) fn matches(&self, candidate: &str) -> bool {
        match self {
            Self::Exact(pattern) => candidate == pattern,
            Self::IExact(pattern) => candidate.to_lowercase() == *pattern,
            Self::Contains(pattern) => candidate.contains(pattern.as_str()),
            Self::IContains(pattern) => candidate.to_lowercase().contains(pattern.as_str()),
            Self::Glob(pattern) => pattern.matches(candidate),
            Self::IGlob(pattern) => pattern.matches_with(
                candidate,
                MatchOptions {
                    case_sensitive: false,
                    require_literal_separator: false,
                    require_literal_leading_dot: false,
                },
            ),
            Self::Never => false,
        }
    }
}
