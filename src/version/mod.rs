// src/version/mod.rs

//! RPM version comparison
//!
//! This module provides `rpmvercmp`, the segment-wise comparison that orders
//! every version and release string, and EVR (epoch:version-release) parsing
//! and comparison built on top of it.

use std::cmp::Ordering;
use std::fmt;

/// Compare two version (or release) strings the way RPM does
///
/// Both strings are split into runs of digits and runs of letters, every other
/// character acting as a separator. Runs are compared pairwise:
/// - numeric runs compare by value (leading zeros ignored) and beat alpha runs
/// - alpha runs compare byte-wise
/// - `~` sorts before anything, including the end of the string
/// - `^` sorts after the end of the string but before any other run
///
/// Examples:
/// - "1.10" > "1.9"
/// - "1.0~rc1" < "1.0"
/// - "1.0^git1" > "1.0", "1.0^git1" < "1.0.1"
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let one = a.as_bytes();
    let two = b.as_bytes();
    let mut i = 0;
    let mut j = 0;

    loop {
        while i < one.len() && is_separator(one[i]) {
            i += 1;
        }
        while j < two.len() && is_separator(two[j]) {
            j += 1;
        }

        let c1 = one.get(i).copied();
        let c2 = two.get(j).copied();

        // Tilde sorts before everything, even the end of the string
        if c1 == Some(b'~') || c2 == Some(b'~') {
            if c1 != Some(b'~') {
                return Ordering::Greater;
            }
            if c2 != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        // Caret sorts after the end of the string but before any other segment
        if c1 == Some(b'^') || c2 == Some(b'^') {
            if c1.is_none() {
                return Ordering::Less;
            }
            if c2.is_none() {
                return Ordering::Greater;
            }
            if c1 != Some(b'^') {
                return Ordering::Greater;
            }
            if c2 != Some(b'^') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        let (Some(first), Some(_)) = (c1, c2) else {
            break;
        };

        let numeric = first.is_ascii_digit();
        let start1 = i;
        let start2 = j;
        if numeric {
            while i < one.len() && one[i].is_ascii_digit() {
                i += 1;
            }
            while j < two.len() && two[j].is_ascii_digit() {
                j += 1;
            }
        } else {
            while i < one.len() && one[i].is_ascii_alphabetic() {
                i += 1;
            }
            while j < two.len() && two[j].is_ascii_alphabetic() {
                j += 1;
            }
        }

        // Segments of different types: numeric is newer
        if j == start2 {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let mut seg1 = &one[start1..i];
        let mut seg2 = &two[start2..j];
        if numeric {
            seg1 = strip_leading_zeros(seg1);
            seg2 = strip_leading_zeros(seg2);
            match seg1.len().cmp(&seg2.len()) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        match seg1.cmp(seg2) {
            Ordering::Equal => {}
            ord => return ord,
        }
    }

    match (i >= one.len(), j >= two.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn is_separator(c: u8) -> bool {
    !c.is_ascii_alphanumeric() && c != b'~' && c != b'^'
}

fn strip_leading_zeros(seg: &[u8]) -> &[u8] {
    let zeros = seg.iter().take_while(|c| **c == b'0').count();
    &seg[zeros..]
}

/// A borrowed view of an `[epoch:]version[-release]` string
///
/// Parsing never fails: anything before the first `:` that consists only of
/// digits is the epoch, everything after the last `-` is the release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evr<'a> {
    pub epoch: &'a str,
    pub version: &'a str,
    pub release: Option<&'a str>,
}

impl<'a> Evr<'a> {
    /// Split an EVR string into its parts
    ///
    /// Examples:
    /// - "1.2.3" → epoch="", version="1.2.3", release=None
    /// - "2:1.2.3-4.el8" → epoch="2", version="1.2.3", release=Some("4.el8")
    pub fn parse(s: &'a str) -> Self {
        let (epoch, rest) = match s.find(':') {
            Some(pos) if s[..pos].bytes().all(|c| c.is_ascii_digit()) => (&s[..pos], &s[pos + 1..]),
            _ => ("", s),
        };
        let (version, release) = match rest.rfind('-') {
            Some(pos) => (&rest[..pos], Some(&rest[pos + 1..])),
            None => (rest, None),
        };
        Self {
            epoch,
            version,
            release,
        }
    }

    /// Epoch with the empty value normalised to "0"
    pub fn epoch_or_zero(&self) -> &'a str {
        if self.epoch.is_empty() { "0" } else { self.epoch }
    }

    /// Full comparison: epoch, then version, then release
    ///
    /// A missing release sorts before any present release.
    pub fn compare(&self, other: &Evr<'_>) -> Ordering {
        self.compare_epoch_version(other)
            .then_with(|| match (self.release, other.release) {
                (Some(r1), Some(r2)) => rpmvercmp(r1, r2),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }

    /// Comparison used for dependency matching: the release is only compared
    /// when both sides carry one, so "foo = 1.0" matches "foo-1.0-3"
    pub fn compare_match_release(&self, other: &Evr<'_>) -> Ordering {
        self.compare_epoch_version(other)
            .then_with(|| match (self.release, other.release) {
                (Some(r1), Some(r2)) => rpmvercmp(r1, r2),
                _ => Ordering::Equal,
            })
    }

    fn compare_epoch_version(&self, other: &Evr<'_>) -> Ordering {
        rpmvercmp(self.epoch_or_zero(), other.epoch_or_zero())
            .then_with(|| rpmvercmp(self.version, other.version))
    }
}

impl fmt::Display for Evr<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.epoch.is_empty() && self.epoch_or_zero() != "0" {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

/// Compare two EVR strings
pub fn evrcmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    Evr::parse(a).compare(&Evr::parse(b))
}

/// Compare two EVR strings, ignoring the release when either side lacks one
pub fn evrcmp_match_release(a: &str, b: &str) -> Ordering {
    Evr::parse(a).compare_match_release(&Evr::parse(b))
}

/// Render epoch, version and release as an EVR string, omitting a zero epoch
pub fn format_evr(epoch: u64, version: &str, release: &str) -> String {
    if epoch == 0 {
        format!("{}-{}", version, release)
    } else {
        format!("{}:{}-{}", epoch, version, release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cmp(a: &str, b: &str) -> i32 {
        match rpmvercmp(a, b) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    // ===================
    // rpmvercmp
    // ===================

    #[test]
    fn test_rpmvercmp_numeric() {
        assert_eq!(cmp("1.0", "1.0"), 0);
        assert_eq!(cmp("1.0", "2.0"), -1);
        assert_eq!(cmp("2.0.1", "2.0"), 1);
        assert_eq!(cmp("1.10", "1.9"), 1);
        assert_eq!(cmp("5.5p10", "5.5p1"), 1);
    }

    #[test]
    fn test_rpmvercmp_leading_zeros() {
        assert_eq!(cmp("1.001", "1.1"), 0);
        assert_eq!(cmp("1.0010", "1.9"), 1);
        assert_eq!(cmp("0001", "1"), 0);
    }

    #[test]
    fn test_rpmvercmp_alpha() {
        assert_eq!(cmp("a", "b"), -1);
        assert_eq!(cmp("1.0a", "1.0b"), -1);
        assert_eq!(cmp("xyz10", "xyz10.1"), -1);
        // Numeric segment beats alpha segment
        assert_eq!(cmp("1.0.1", "1.0.a"), 1);
        assert_eq!(cmp("1.a", "1.1"), -1);
    }

    #[test]
    fn test_rpmvercmp_separators() {
        assert_eq!(cmp("1.0", "1_0"), 0);
        assert_eq!(cmp("1..0", "1.0"), 0);
        assert_eq!(cmp("2_0", "2.0"), 0);
        assert_eq!(cmp("+", "_"), 0);
    }

    #[test]
    fn test_rpmvercmp_tilde() {
        assert_eq!(cmp("1.0~rc1", "1.0"), -1);
        assert_eq!(cmp("1.0", "1.0~rc1"), 1);
        assert_eq!(cmp("1.0~rc1", "1.0~rc2"), -1);
        assert_eq!(cmp("1.0~rc1~git123", "1.0~rc1"), -1);
        assert_eq!(cmp("1.0~rc1", "1.0arc1"), -1);
    }

    #[test]
    fn test_rpmvercmp_caret() {
        assert_eq!(cmp("1.0^", "1.0"), 1);
        assert_eq!(cmp("1.0^git1", "1.0"), 1);
        assert_eq!(cmp("1.0^git1", "1.01"), -1);
        assert_eq!(cmp("1.0^git1", "1.0^git2"), -1);
        assert_eq!(cmp("1.0^git1~pre", "1.0^git1"), -1);
    }

    #[test]
    fn test_rpmvercmp_antisymmetric() {
        let samples = ["1.0", "1.0~rc1", "1.0^1", "2", "1.a", "1.01", "10", "a.b", ""];
        for a in samples {
            assert_eq!(cmp(a, a), 0);
            for b in samples {
                assert_eq!(cmp(a, b), -cmp(b, a), "{} vs {}", a, b);
            }
        }
    }

    // ===================
    // EVR
    // ===================

    #[test]
    fn test_evr_parse() {
        let evr = Evr::parse("2:1.2.3-4.el8");
        assert_eq!(evr.epoch, "2");
        assert_eq!(evr.version, "1.2.3");
        assert_eq!(evr.release, Some("4.el8"));

        let evr = Evr::parse("1.2.3");
        assert_eq!(evr.epoch, "");
        assert_eq!(evr.epoch_or_zero(), "0");
        assert_eq!(evr.release, None);
    }

    #[test]
    fn test_evr_parse_version_with_dash_in_release_only() {
        let evr = Evr::parse("1.0-1-2");
        assert_eq!(evr.version, "1.0-1");
        assert_eq!(evr.release, Some("2"));
    }

    #[test]
    fn test_evrcmp_epoch_wins() {
        assert_eq!(evrcmp("1:1.0-1", "0:2.0-1"), Ordering::Greater);
        assert_eq!(evrcmp("1.0-1", "0:1.0-1"), Ordering::Equal);
        assert_eq!(evrcmp("1.0-1", "1:0.1-1"), Ordering::Less);
    }

    #[test]
    fn test_evrcmp_release() {
        assert_eq!(evrcmp("1.0-1", "1.0-2"), Ordering::Less);
        assert_eq!(evrcmp("1.0", "1.0-1"), Ordering::Less);
        assert_eq!(evrcmp_match_release("1.0", "1.0-1"), Ordering::Equal);
        assert_eq!(evrcmp_match_release("1.0-2", "1.0-1"), Ordering::Greater);
    }

    #[test]
    fn test_evr_display() {
        assert_eq!(Evr::parse("0:1.0-1").to_string(), "1.0-1");
        assert_eq!(Evr::parse("3:1.0-1").to_string(), "3:1.0-1");
        assert_eq!(Evr::parse("1.0").to_string(), "1.0");
    }

    #[test]
    fn test_format_evr() {
        assert_eq!(format_evr(0, "1.0", "1"), "1.0-1");
        assert_eq!(format_evr(2, "1.0", "1"), "2:1.0-1");
    }
}
