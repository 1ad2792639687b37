// src/query/resolve.rs

//! Resolving free-form package specs

use super::PackageQuery;
use super::cmp::{QueryCmp, is_glob_pattern};
use crate::nevra::{DEFAULT_FORMS, Nevra, NevraForm};
use crate::pool::DepKind;
use crate::reldep::ReldepList;
use crate::solv_map::SolvMap;
use tracing::trace;

/// Directories searched when a spec names a binary
const BINARY_DIRS: [&str; 2] = ["/usr/bin/", "/usr/sbin/"];

/// Which interpretations [`PackageQuery::resolve_pkg_spec`] tries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveSpecSettings {
    pub ignore_case: bool,
    pub with_nevra: bool,
    pub with_provides: bool,
    pub with_filenames: bool,
    pub with_binaries: bool,
    pub expand_globs: bool,
    /// NEVRA forms to try, in order; empty means the default forms
    pub nevra_forms: Vec<NevraForm>,
}

impl Default for ResolveSpecSettings {
    fn default() -> Self {
        Self {
            ignore_case: false,
            with_nevra: true,
            with_provides: true,
            with_filenames: true,
            with_binaries: true,
            expand_globs: true,
            nevra_forms: Vec::new(),
        }
    }
}

impl ResolveSpecSettings {
    /// Only NEVRA interpretations, globs expanded
    pub fn nevra_only() -> Self {
        Self {
            with_provides: false,
            with_filenames: false,
            with_binaries: false,
            ..Self::default()
        }
    }

    pub fn with_ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    pub fn with_nevra_forms(mut self, forms: impl Into<Vec<NevraForm>>) -> Self {
        self.nevra_forms = forms.into();
        self
    }
}

impl PackageQuery {
    /// Narrow the query to `matched` when it selects anything
    fn take_if_found(&mut self, mut matched: SolvMap) -> bool {
        matched &= self.set.map();
        if matched.is_empty() {
            return false;
        }
        self.apply(&matched, false);
        true
    }

    /// Members whose files include `path` (glob when `glob` is set)
    fn file_matches(&self, path: &str, glob: bool) -> SolvMap {
        let mut query = PackageQuery::from_set(&self.set, self.flags);
        query.filter_file(&[path], if glob { QueryCmp::GLOB } else { QueryCmp::EQ });
        query.into_set().into_map()
    }

    /// Provides matches for dependency strings
    fn provide_matches(&self, specs: &[String], glob: bool) -> Option<SolvMap> {
        let sack = self.set.sack().clone();
        let mut reldeps = ReldepList::new(&sack);
        for spec in specs {
            if glob {
                reldeps.add_reldep_with_glob(spec);
            } else {
                reldeps.add_reldep(spec);
            }
        }
        if reldeps.is_empty() {
            return None;
        }
        Some(self.dep_matches(DepKind::Provides, &reldeps))
    }

    /// Resolve a user-supplied package spec against this query
    ///
    /// Interpretations are tried in order, and the first one selecting any
    /// member narrows the query:
    ///
    /// 1. the NEVRA forms of `settings` (or the default forms), then, for a
    ///    glob with default forms, the whole spec as a NEVRA glob
    /// 2. a provide
    /// 3. a file path, when the spec starts with `/`
    /// 4. a binary in `/usr/bin` or `/usr/sbin`, by provide and then by file
    ///
    /// Returns whether anything matched, and the NEVRA interpretation that
    /// did (empty for every other interpretation). Nothing matching empties
    /// the query.
    pub fn resolve_pkg_spec(&mut self, spec: &str, settings: &ResolveSpecSettings, with_src: bool) -> (bool, Nevra) {
        let glob = settings.expand_globs && is_glob_pattern(spec);
        let mut cmp = if glob { QueryCmp::GLOB } else { QueryCmp::EQ };
        if settings.ignore_case {
            cmp |= QueryCmp::ICASE;
        }

        if settings.with_nevra {
            let forms: &[NevraForm] = if settings.nevra_forms.is_empty() {
                &DEFAULT_FORMS
            } else {
                &settings.nevra_forms
            };
            for nevra in Nevra::parse(spec, forms) {
                let matched = self.nevra_struct_matches(&nevra, cmp, with_src);
                if self.take_if_found(matched) {
                    trace!("Spec \"{}\" resolved as {:?}", spec, nevra);
                    return (true, nevra);
                }
            }
            if settings.nevra_forms.is_empty() && glob {
                let matched = self.nevra_string_matches(spec, cmp);
                if self.take_if_found(matched) {
                    return (true, Nevra::default());
                }
            }
        }

        if settings.with_provides
            && let Some(matched) = self.provide_matches(&[spec.to_string()], glob)
            && self.take_if_found(matched)
        {
            trace!("Spec \"{}\" resolved as a provide", spec);
            return (true, Nevra::default());
        }

        let is_path = spec.starts_with('/');
        if settings.with_filenames && is_path {
            let matched = self.file_matches(spec, glob);
            if self.take_if_found(matched) {
                return (true, Nevra::default());
            }
        }

        if settings.with_binaries && !is_path {
            let paths: Vec<String> = BINARY_DIRS.iter().map(|dir| format!("{}{}", dir, spec)).collect();
            if let Some(matched) = self.provide_matches(&paths, glob)
                && self.take_if_found(matched)
            {
                return (true, Nevra::default());
            }
            for path in &paths {
                let matched = self.file_matches(path, glob);
                if self.take_if_found(matched) {
                    return (true, Nevra::default());
                }
            }
        }

        self.clear();
        (false, Nevra::default())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    fn resolve(spec: &str, settings: &ResolveSpecSettings, with_src: bool) -> (bool, Nevra, Vec<String>) {
        let sack = sample_sack();
        let mut query = PackageQuery::new(&sack);
        let (found, nevra) = query.resolve_pkg_spec(spec, settings, with_src);
        (found, nevra, nevras(&query))
    }

    fn without_nevra() -> ResolveSpecSettings {
        ResolveSpecSettings {
            with_nevra: false,
            ..ResolveSpecSettings::default()
        }
    }

    #[test]
    fn test_name_spec() {
        let (found, nevra, got) = resolve("vim", &ResolveSpecSettings::default(), false);
        assert!(found);
        assert_eq!(nevra.name, "vim");
        assert_eq!(got, vec!["vim-9.0-1.x86_64@fedora"]);
    }

    #[test]
    fn test_nevra_forms_in_order() {
        let (found, nevra, got) = resolve("bash-5.2-1.i686", &ResolveSpecSettings::default(), false);
        assert!(found);
        assert_eq!(nevra, Nevra::new("bash", "", "5.2", "1", "i686"));
        assert_eq!(got, vec!["bash-5.2-1.i686@fedora"]);

        let (_, nevra, got) = resolve("bash-5.2", &ResolveSpecSettings::default(), false);
        assert_eq!(nevra.version, "5.2");
        assert_eq!(got.len(), 3);

        let (_, nevra, got) = resolve("bash.i686", &ResolveSpecSettings::default(), true);
        assert_eq!(nevra.arch, "i686");
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn test_source_packages() {
        let (found, _, _) = resolve("bash.src", &ResolveSpecSettings::nevra_only(), false);
        assert!(!found);
        let (found, _, got) = resolve("bash.src", &ResolveSpecSettings::nevra_only(), true);
        assert!(found);
        assert_eq!(got, vec!["bash-5.2-1.src@fedora"]);
    }

    #[test]
    fn test_glob_and_case() {
        let (found, _, got) = resolve("tz*", &ResolveSpecSettings::default(), false);
        assert!(found);
        assert_eq!(got.len(), 2);

        let (found, _, _) = resolve("VIM", &ResolveSpecSettings::default(), false);
        assert!(!found);
        let (found, _, _) = resolve("VIM", &ResolveSpecSettings::default().with_ignore_case(true), false);
        assert!(found);
    }

    #[test]
    fn test_provides_files_and_binaries() {
        let (found, nevra, got) = resolve("libc.so.6", &ResolveSpecSettings::default(), false);
        assert!(found);
        assert!(nevra.is_empty());
        assert_eq!(got.len(), 3);

        let (found, _, got) = resolve("/usr/bin/vim", &ResolveSpecSettings::default(), false);
        assert!(found);
        assert_eq!(got, vec!["vim-9.0-1.x86_64@fedora"]);

        let (found, _, got) = resolve("bash", &without_nevra(), false);
        assert!(found);
        assert_eq!(got.len(), 6);

        let binaries_only = ResolveSpecSettings {
            with_provides: false,
            ..without_nevra()
        };
        let (found, _, got) = resolve("bash", &binaries_only, false);
        assert!(found);
        assert_eq!(got, vec!["bash-5.1-1.x86_64@@System", "bash-5.2-1.x86_64@fedora"]);
    }

    #[test]
    fn test_not_found_empties_query() {
        let (found, nevra, got) = resolve("does-not-exist", &ResolveSpecSettings::default(), false);
        assert!(!found);
        assert!(nevra.is_empty());
        assert!(got.is_empty());

        let settings = ResolveSpecSettings::nevra_only().with_nevra_forms(vec![NevraForm::Nevra]);
        let (found, _, _) = resolve("vim", &settings, false);
        assert!(!found);
    }
}
