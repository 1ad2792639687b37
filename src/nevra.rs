// src/nevra.rs

//! Package identity strings
//!
//! A NEVRA is `name-[epoch:]version-release.arch`. User input is ambiguous
//! (names contain dashes, versions contain dots), so [`Nevra::parse`] tries
//! several grammar forms and returns every interpretation that fits.

use crate::version::rpmvercmp;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;

/// Grammar forms a package spec can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NevraForm {
    /// `name-[epoch:]version-release.arch`
    Nevra,
    /// `name-[epoch:]version-release`
    Nevr,
    /// `name-[epoch:]version`
    Nev,
    /// `name.arch`
    Na,
    /// `name`
    Name,
}

/// Forms tried when the caller does not choose, most specific first
pub const DEFAULT_FORMS: [NevraForm; 5] = [
    NevraForm::Nevra,
    NevraForm::Nevr,
    NevraForm::Nev,
    NevraForm::Na,
    NevraForm::Name,
];

/// A parsed package identity; empty fields were not given
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Nevra {
    pub name: String,
    /// Empty means "0"
    pub epoch: String,
    pub version: String,
    pub release: String,
    pub arch: String,
}

/// Delimiter positions found while scanning a spec
struct Delimiters {
    before_last_dash: Option<usize>,
    last_dash: Option<usize>,
    last_dot: Option<usize>,
    colon: Option<usize>,
}

impl Delimiters {
    /// Scan `s`, ignoring delimiters inside glob `[...]` ranges
    ///
    /// Returns `None` for strings that can never be a NEVRA: a second `:`,
    /// or a character that only appears in dependency expressions and paths.
    fn scan(s: &str) -> Option<Self> {
        let mut found = Self {
            before_last_dash: None,
            last_dash: None,
            last_dot: None,
            colon: None,
        };
        let mut in_range = false;
        for (pos, c) in s.char_indices() {
            if in_range {
                if c == ']' {
                    in_range = false;
                }
                continue;
            }
            match c {
                '[' => in_range = true,
                '-' => {
                    found.before_last_dash = found.last_dash;
                    found.last_dash = Some(pos);
                }
                '.' => found.last_dot = Some(pos),
                ':' => {
                    if found.colon.is_some() {
                        return None;
                    }
                    found.colon = Some(pos);
                }
                '(' | '/' | '=' | '<' | '>' | ' ' => return None,
                _ => {}
            }
        }
        Some(found)
    }
}

/// Split an optional `epoch:` prefix off `s[start..end]`
///
/// Returns the epoch and the new start, or `None` when the colon lies
/// outside the range or leaves the epoch or what follows empty.
fn split_epoch<'a>(s: &'a str, colon: Option<usize>, start: usize, end: usize) -> Option<(&'a str, usize)> {
    match colon {
        None => Some(("", start)),
        Some(colon) if colon > start && colon + 1 < end => Some((&s[start..colon], colon + 1)),
        Some(_) => None,
    }
}

impl Nevra {
    pub fn new(
        name: impl Into<String>,
        epoch: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
        arch: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            epoch: epoch.into(),
            version: version.into(),
            release: release.into(),
            arch: arch.into(),
        }
    }

    /// Parse `s` against each form in order, returning every fit
    ///
    /// An empty result means the string is not a package spec.
    ///
    /// ```
    /// use pkgsack::nevra::{Nevra, NevraForm};
    ///
    /// let parsed = Nevra::parse("foo-1:1.2-3.x86_64", &[NevraForm::Nevra]);
    /// assert_eq!(parsed[0].epoch, "1");
    /// assert!(Nevra::parse("foo >= 1", &[NevraForm::Name]).is_empty());
    /// ```
    pub fn parse(s: &str, forms: &[NevraForm]) -> Vec<Nevra> {
        let Some(delims) = Delimiters::scan(s) else {
            return Vec::new();
        };
        forms
            .iter()
            .filter_map(|form| Self::parse_form(s, &delims, *form))
            .collect()
    }

    /// [`parse`](Self::parse) with [`DEFAULT_FORMS`]
    pub fn parse_default(s: &str) -> Vec<Nevra> {
        Self::parse(s, &DEFAULT_FORMS)
    }

    fn parse_form(s: &str, d: &Delimiters, form: NevraForm) -> Option<Nevra> {
        let end = s.len();
        match form {
            NevraForm::Nevra => {
                let (evr_dash, rel_dash, dot) = (d.before_last_dash?, d.last_dash?, d.last_dot?);
                if evr_dash == 0 {
                    return None;
                }
                let (epoch, ver_start) = split_epoch(s, d.colon, evr_dash + 1, rel_dash)?;
                if rel_dash <= ver_start || dot <= rel_dash + 1 || end <= dot + 1 {
                    return None;
                }
                Some(Nevra::new(
                    &s[..evr_dash],
                    epoch,
                    &s[ver_start..rel_dash],
                    &s[rel_dash + 1..dot],
                    &s[dot + 1..],
                ))
            }
            NevraForm::Nevr => {
                let (evr_dash, rel_dash) = (d.before_last_dash?, d.last_dash?);
                if evr_dash == 0 {
                    return None;
                }
                let (epoch, ver_start) = split_epoch(s, d.colon, evr_dash + 1, rel_dash)?;
                if rel_dash <= ver_start || end <= rel_dash + 1 {
                    return None;
                }
                Some(Nevra::new(
                    &s[..evr_dash],
                    epoch,
                    &s[ver_start..rel_dash],
                    &s[rel_dash + 1..],
                    "",
                ))
            }
            NevraForm::Nev => {
                let ver_dash = d.last_dash?;
                if ver_dash == 0 {
                    return None;
                }
                let (epoch, ver_start) = split_epoch(s, d.colon, ver_dash + 1, end)?;
                if end <= ver_start {
                    return None;
                }
                Some(Nevra::new(&s[..ver_dash], epoch, &s[ver_start..], "", ""))
            }
            NevraForm::Na => {
                let dot = d.last_dot?;
                if d.colon.is_some() || dot == 0 || end <= dot + 1 {
                    return None;
                }
                if d.last_dash.is_some_and(|dash| dash > dot) {
                    return None;
                }
                Some(Nevra::new(&s[..dot], "", "", "", &s[dot + 1..]))
            }
            NevraForm::Name => {
                if d.colon.is_some() || s.is_empty() {
                    return None;
                }
                Some(Nevra::new(s, "", "", "", ""))
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.epoch.is_empty()
            && self.version.is_empty()
            && self.release.is_empty()
            && self.arch.is_empty()
    }

    /// True when only the name is set
    pub fn has_just_name(&self) -> bool {
        !self.name.is_empty()
            && self.epoch.is_empty()
            && self.version.is_empty()
            && self.release.is_empty()
            && self.arch.is_empty()
    }

    pub fn epoch_or_zero(&self) -> &str {
        if self.epoch.is_empty() { "0" } else { &self.epoch }
    }

    /// `[epoch:]version[-release]`, epoch omitted when empty or zero
    pub fn evr(&self) -> String {
        let mut out = String::new();
        if !self.epoch.is_empty() && self.epoch != "0" {
            out.push_str(&self.epoch);
            out.push(':');
        }
        out.push_str(&self.version);
        if !self.release.is_empty() {
            out.push('-');
            out.push_str(&self.release);
        }
        out
    }

    /// `name-[epoch:]version-release.arch`, epoch omitted when empty or zero
    pub fn to_nevra_string(&self) -> String {
        render(self, false)
    }

    /// `name-epoch:version-release.arch`, epoch defaulting to "0"
    pub fn to_full_nevra_string(&self) -> String {
        render(self, true)
    }
}

fn render(n: &Nevra, full: bool) -> String {
    let mut out = n.name.clone();
    out.push('-');
    if full {
        out.push_str(n.epoch_or_zero());
        out.push(':');
    } else if !n.epoch.is_empty() && n.epoch != "0" {
        out.push_str(&n.epoch);
        out.push(':');
    }
    out.push_str(&n.version);
    out.push('-');
    out.push_str(&n.release);
    out.push('.');
    out.push_str(&n.arch);
    out
}

impl fmt::Display for Nevra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_full_nevra_string())
    }
}

/// Anything with a NEVRA identity
pub trait AsNevra {
    fn as_nevra(&self) -> Cow<'_, Nevra>;
}

impl AsNevra for Nevra {
    fn as_nevra(&self) -> Cow<'_, Nevra> {
        Cow::Borrowed(self)
    }
}

/// Compare epoch, version and release; an empty epoch counts as "0"
pub fn cmp_evr<A: AsNevra + ?Sized, B: AsNevra + ?Sized>(a: &A, b: &B) -> Ordering {
    let (a, b) = (a.as_nevra(), b.as_nevra());
    rpmvercmp(a.epoch_or_zero(), b.epoch_or_zero())
        .then_with(|| rpmvercmp(&a.version, &b.version))
        .then_with(|| rpmvercmp(&a.release, &b.release))
}

/// Order by name, then EVR, then arch
pub fn cmp_nevra<A: AsNevra + ?Sized, B: AsNevra + ?Sized>(a: &A, b: &B) -> Ordering {
    let (na, nb) = (a.as_nevra(), b.as_nevra());
    na.name
        .cmp(&nb.name)
        .then_with(|| cmp_evr(&*na, &*nb))
        .then_with(|| na.arch.cmp(&nb.arch))
}

/// Order by name, then arch, then EVR
pub fn cmp_naevr<A: AsNevra + ?Sized, B: AsNevra + ?Sized>(a: &A, b: &B) -> Ordering {
    let (na, nb) = (a.as_nevra(), b.as_nevra());
    na.name
        .cmp(&nb.name)
        .then_with(|| na.arch.cmp(&nb.arch))
        .then_with(|| cmp_evr(&*na, &*nb))
}
