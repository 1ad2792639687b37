// src/solv_map.rs

//! Flat bitset over package ids
//!
//! `SolvMap` is the storage behind every package set, query and exclude list.
//! Bit `i` is set when the package with id `i` is a member. Maps only grow;
//! binary operators follow the growth rules of the set being combined:
//!
//! - `|=` grows the receiver to the size of the other map
//! - `&=` clears receiver bits the other map does not cover
//! - `-=` only touches the common prefix

use crate::error::{Error, Result};
use crate::pool::PackageId;
use std::fmt;
use std::ops::{BitAndAssign, BitOrAssign, SubAssign};

/// Number of set bits for every possible byte value
const BITCOUNT: [u8; 256] = build_bitcount_table();

const fn build_bitcount_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut bits = i;
        let mut count = 0u8;
        while bits != 0 {
            count += (bits & 1) as u8;
            bits >>= 1;
        }
        table[i] = count;
        i += 1;
    }
    table
}

/// Growable bitmap of package ids
#[derive(Clone, Default)]
pub struct SolvMap {
    bytes: Vec<u8>,
}

impl SolvMap {
    /// Create an empty map able to hold ids `0..size`
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size.div_ceil(8)],
        }
    }

    /// Create a map with exactly the ids `0..size` set
    pub fn new_full(size: usize) -> Self {
        let mut map = Self::new(size);
        map.set_all();
        let rem = size & 7;
        if rem != 0
            && let Some(last) = map.bytes.last_mut()
        {
            *last = (1u8 << rem) - 1;
        }
        map
    }

    /// Number of ids the map can currently hold
    pub fn allocated_size(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Grow the map so it can hold ids `0..size`. Never shrinks.
    pub fn grow(&mut self, size: usize) {
        let needed = size.div_ceil(8);
        if needed > self.bytes.len() {
            self.bytes.resize(needed, 0);
        }
    }

    /// Set every allocated bit
    pub fn set_all(&mut self) {
        self.bytes.fill(0xff);
    }

    /// Clear every bit, keeping the allocation
    pub fn clear(&mut self) {
        self.bytes.fill(0);
    }

    /// Add an id, failing when it lies outside the allocated range
    pub fn add(&mut self, id: PackageId) -> Result<()> {
        self.check_range(id)?;
        self.add_unchecked(id);
        Ok(())
    }

    /// Add an id, growing the map first when needed
    ///
    /// `extra` bits are reserved past the id so that a loop adding ascending
    /// ids does not reallocate on every call.
    pub fn add_grow(&mut self, id: PackageId, extra: usize) {
        if id.index() >= self.allocated_size() {
            self.grow(id.index() + 1 + extra);
        }
        self.add_unchecked(id);
    }

    /// Add an id known to be in range
    ///
    /// Panics (slice index) when the caller's range guarantee does not hold.
    #[inline]
    pub fn add_unchecked(&mut self, id: PackageId) {
        let idx = id.index();
        self.bytes[idx >> 3] |= 1 << (idx & 7);
    }

    /// Remove an id, failing when it lies outside the allocated range
    pub fn remove(&mut self, id: PackageId) -> Result<()> {
        self.check_range(id)?;
        self.remove_unchecked(id);
        Ok(())
    }

    #[inline]
    pub fn remove_unchecked(&mut self, id: PackageId) {
        let idx = id.index();
        self.bytes[idx >> 3] &= !(1 << (idx & 7));
    }

    /// Membership test; ids beyond the allocated range are never members
    pub fn contains(&self, id: PackageId) -> bool {
        id.index() < self.allocated_size() && self.contains_unchecked(id)
    }

    #[inline]
    pub fn contains_unchecked(&self, id: PackageId) -> bool {
        let idx = id.index();
        self.bytes[idx >> 3] & (1 << (idx & 7)) != 0
    }

    /// Number of members, counted with a per-byte lookup table
    pub fn size(&self) -> usize {
        self.bytes.iter().map(|b| BITCOUNT[*b as usize] as usize).sum()
    }

    /// True when no bit is set; stops at the first non-zero byte
    pub fn is_empty(&self) -> bool {
        self.bytes.iter().all(|b| *b == 0)
    }

    /// True when the two maps share no member
    pub fn is_intersection_empty(&self, other: &SolvMap) -> bool {
        self.bytes
            .iter()
            .zip(other.bytes.iter())
            .all(|(a, b)| a & b == 0)
    }

    /// Exchange contents with another map
    pub fn swap(&mut self, other: &mut SolvMap) {
        std::mem::swap(&mut self.bytes, &mut other.bytes);
    }

    /// Iterate member ids in ascending order
    pub fn iter(&self) -> SolvMapIter<'_> {
        SolvMapIter {
            bytes: &self.bytes,
            pos: 0,
        }
    }

    fn check_range(&self, id: PackageId) -> Result<()> {
        if id.index() >= self.allocated_size() {
            return Err(Error::OutOfRange {
                id: id.as_u32(),
                size: self.allocated_size(),
            });
        }
        Ok(())
    }
}

impl BitOrAssign<&SolvMap> for SolvMap {
    fn bitor_assign(&mut self, other: &SolvMap) {
        if self.bytes.len() < other.bytes.len() {
            self.bytes.resize(other.bytes.len(), 0);
        }
        for (dst, src) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *dst |= *src;
        }
    }
}

impl BitAndAssign<&SolvMap> for SolvMap {
    fn bitand_assign(&mut self, other: &SolvMap) {
        let common = self.bytes.len().min(other.bytes.len());
        for (dst, src) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *dst &= *src;
        }
        self.bytes[common..].fill(0);
    }
}

impl SubAssign<&SolvMap> for SolvMap {
    fn sub_assign(&mut self, other: &SolvMap) {
        for (dst, src) in self.bytes.iter_mut().zip(other.bytes.iter()) {
            *dst &= !*src;
        }
    }
}

/// Maps are equal when they hold the same ids, whatever their allocation
impl PartialEq for SolvMap {
    fn eq(&self, other: &Self) -> bool {
        let common = self.bytes.len().min(other.bytes.len());
        self.bytes[..common] == other.bytes[..common]
            && self.bytes[common..].iter().all(|b| *b == 0)
            && other.bytes[common..].iter().all(|b| *b == 0)
    }
}

impl Eq for SolvMap {}

impl fmt::Debug for SolvMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(|id| id.as_u32())).finish()
    }
}

impl<'a> IntoIterator for &'a SolvMap {
    type Item = PackageId;
    type IntoIter = SolvMapIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<PackageId> for SolvMap {
    fn from_iter<I: IntoIterator<Item = PackageId>>(iter: I) -> Self {
        let mut map = SolvMap::default();
        for id in iter {
            map.add_grow(id, 64);
        }
        map
    }
}

/// Forward iterator over the set bits of a [`SolvMap`]
#[derive(Debug, Clone)]
pub struct SolvMapIter<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl SolvMapIter<'_> {
    /// Continue iteration from `id` (inclusive), skipping anything before it
    ///
    /// Jumping backwards is allowed and restarts the scan at `id`.
    pub fn jump(&mut self, id: PackageId) {
        self.pos = id.index();
    }
}

impl Iterator for SolvMapIter<'_> {
    type Item = PackageId;

    fn next(&mut self) -> Option<PackageId> {
        loop {
            let byte_idx = self.pos >> 3;
            let byte = *self.bytes.get(byte_idx)? >> (self.pos & 7);
            if byte == 0 {
                self.pos = (byte_idx + 1) << 3;
                continue;
            }
            let id = self.pos + byte.trailing_zeros() as usize;
            self.pos = id + 1;
            return Some(PackageId::from_index(id));
        }
    }
}
