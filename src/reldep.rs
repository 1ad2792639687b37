// src/reldep.rs

//! Relational dependencies
//!
//! A [`Reldep`] is a "name OP evr" expression such as `libfoo.so.1()(64bit)`,
//! `bash >= 5.0` or `/usr/bin/sh`. The pool interns every distinct expression
//! under a [`ReldepId`]; a [`ReldepList`] is an ordered list of those ids tied
//! to the sack that interned them.

use crate::error::{Error, Result};
use crate::pool::ReldepId;
use crate::query::cmp::is_glob_pattern;
use crate::sack::PackageSack;
use crate::version::evrcmp_match_release;
use bitflags::bitflags;
use glob::Pattern;
use std::cmp::Ordering;
use std::fmt;

bitflags! {
    /// Relation between a dependency name and its version
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct CmpType: u8 {
        const GT = 1 << 0;
        const EQ = 1 << 1;
        const LT = 1 << 2;
        const GTE = Self::GT.bits() | Self::EQ.bits();
        const LTE = Self::LT.bits() | Self::EQ.bits();
        const NEQ = Self::LT.bits() | Self::GT.bits();
    }
}

impl CmpType {
    /// Parse an operator token
    pub fn from_operator(op: &str) -> Option<Self> {
        match op {
            "=" | "==" => Some(Self::EQ),
            "<" => Some(Self::LT),
            "<=" | "=<" => Some(Self::LTE),
            ">" => Some(Self::GT),
            ">=" | "=>" => Some(Self::GTE),
            "!=" | "<>" => Some(Self::NEQ),
            _ => None,
        }
    }

    pub fn as_operator(&self) -> &'static str {
        match *self {
            Self::EQ => "=",
            Self::LT => "<",
            Self::LTE => "<=",
            Self::GT => ">",
            Self::GTE => ">=",
            Self::NEQ => "<>",
            _ => "",
        }
    }
}

/// A parsed dependency expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reldep {
    pub name: String,
    pub cmp: CmpType,
    pub evr: String,
}

impl Reldep {
    /// Unversioned dependency on `name`
    pub fn name_only(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmp: CmpType::empty(),
            evr: String::new(),
        }
    }

    pub fn new(name: impl Into<String>, cmp: CmpType, evr: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmp,
            evr: evr.into(),
        }
    }

    /// Parse "name", "name OP evr" or "nameOPevr"
    ///
    /// Rich dependencies (parenthesized boolean expressions) are rejected.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() || s.starts_with('(') {
            return Err(Error::InvalidReldep(s.to_string()));
        }

        let Some(op_start) = s.find(['<', '>', '=', '!']) else {
            if s.contains(char::is_whitespace) {
                return Err(Error::InvalidReldep(s.to_string()));
            }
            return Ok(Self::name_only(s));
        };

        let name = s[..op_start].trim_end();
        let rest = &s[op_start..];
        let op_len = rest
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '!'))
            .unwrap_or(rest.len());
        let evr = rest[op_len..].trim();

        let cmp = CmpType::from_operator(&rest[..op_len])
            .ok_or_else(|| Error::InvalidReldep(s.to_string()))?;
        if name.is_empty()
            || evr.is_empty()
            || evr.starts_with(['<', '>', '=', '!'])
            || name.contains(char::is_whitespace)
            || evr.contains(char::is_whitespace)
        {
            return Err(Error::InvalidReldep(s.to_string()));
        }

        Ok(Self::new(name, cmp, evr))
    }

    pub fn is_versioned(&self) -> bool {
        !self.cmp.is_empty()
    }

    /// True when the version ranges of two same-named dependencies overlap
    ///
    /// An unversioned side matches anything. When one side lacks a release,
    /// releases are not compared.
    pub fn intersects(&self, other: &Reldep) -> bool {
        self.name == other.name && ranges_intersect(self.cmp, &self.evr, other.cmp, &other.evr)
    }

    /// True when a package `name` at `evr` satisfies this dependency
    pub fn matches_evr(&self, name: &str, evr: &str) -> bool {
        self.name == name && ranges_intersect(self.cmp, &self.evr, CmpType::EQ, evr)
    }
}

fn ranges_intersect(a_cmp: CmpType, a_evr: &str, b_cmp: CmpType, b_evr: &str) -> bool {
    if a_cmp.is_empty() || b_cmp.is_empty() {
        return true;
    }
    // Both open towards the same direction
    if a_cmp.intersects(b_cmp & (CmpType::LT | CmpType::GT)) {
        return true;
    }
    match evrcmp_match_release(a_evr, b_evr) {
        Ordering::Equal => a_cmp.intersects(b_cmp & CmpType::EQ),
        Ordering::Less => a_cmp.contains(CmpType::GT) || b_cmp.contains(CmpType::LT),
        Ordering::Greater => a_cmp.contains(CmpType::LT) || b_cmp.contains(CmpType::GT),
    }
}

impl fmt::Display for Reldep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_versioned() {
            write!(f, "{} {} {}", self.name, self.cmp.as_operator(), self.evr)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// Ordered list of interned dependencies belonging to one sack
#[derive(Clone)]
pub struct ReldepList {
    sack: PackageSack,
    ids: Vec<ReldepId>,
}

impl ReldepList {
    pub fn new(sack: &PackageSack) -> Self {
        Self {
            sack: sack.clone(),
            ids: Vec::new(),
        }
    }

    pub(crate) fn from_ids(sack: &PackageSack, ids: Vec<ReldepId>) -> Self {
        Self {
            sack: sack.clone(),
            ids,
        }
    }

    pub fn sack(&self) -> &PackageSack {
        &self.sack
    }

    /// Intern and append a dependency
    pub fn add(&mut self, reldep: Reldep) {
        let id = self.sack.pool_mut().intern_reldep(reldep);
        self.ids.push(id);
    }

    pub fn add_id(&mut self, id: ReldepId) {
        self.ids.push(id);
    }

    /// Parse and append a dependency string; returns false when it does not parse
    pub fn add_reldep(&mut self, reldep: &str) -> bool {
        match Reldep::parse(reldep) {
            Ok(parsed) => {
                self.add(parsed);
                true
            }
            Err(_) => false,
        }
    }

    /// Like [`add_reldep`](Self::add_reldep), but a glob in the name expands
    /// to every provide name known to the pool
    ///
    /// Returns false when the string does not parse or the glob matches no
    /// provide name.
    pub fn add_reldep_with_glob(&mut self, reldep: &str) -> bool {
        let Ok(parsed) = Reldep::parse(reldep) else {
            return false;
        };
        if !is_glob_pattern(&parsed.name) {
            self.add(parsed);
            return true;
        }
        let Ok(pattern) = Pattern::new(&parsed.name) else {
            return false;
        };

        let names: Vec<String> = self
            .sack
            .pool()
            .provide_names()
            .filter(|name| pattern.matches(name))
            .map(str::to_string)
            .collect();
        let found = !names.is_empty();
        for name in names {
            self.add(Reldep::new(name, parsed.cmp, parsed.evr.clone()));
        }
        found
    }

    /// Append every dependency of another list from the same sack
    ///
    /// # Panics
    ///
    /// Panics when `other` belongs to a different sack.
    pub fn append(&mut self, other: &ReldepList) {
        assert!(
            self.sack.same_as(&other.sack),
            "ReldepList::append: used different sack"
        );
        self.ids.extend_from_slice(&other.ids);
    }

    pub fn get(&self, index: usize) -> Option<Reldep> {
        let id = *self.ids.get(index)?;
        Some(self.sack.pool().reldep(id).clone())
    }

    pub fn get_id(&self, index: usize) -> Option<ReldepId> {
        self.ids.get(index).copied()
    }

    pub fn ids(&self) -> &[ReldepId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Resolve every entry into its expression
    pub fn to_vec(&self) -> Vec<Reldep> {
        let pool = self.sack.pool();
        self.ids.iter().map(|id| pool.reldep(*id).clone()).collect()
    }
}

/// Lists from different sacks are never equal
impl PartialEq for ReldepList {
    fn eq(&self, other: &Self) -> bool {
        self.sack.same_as(&other.sack) && self.ids == other.ids
    }
}

impl fmt::Debug for ReldepList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.to_vec().iter().map(|r| r.to_string()))
            .finish()
    }
}
