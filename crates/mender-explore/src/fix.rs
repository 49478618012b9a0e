//! Fix sets: location-indexed replacement expressions.
//!
//! An `EFix` maps sites of the repair target to replacement expressions.
//! The map is ordered by site path (parents sort before descendants), and
//! merging is left-biased: a right entry is discarded when its site is
//! already taken by, or strictly contained in, a left entry's site.

use std::collections::BTreeMap;
use std::fmt;

use mender_ir::{Expr, SitePath};

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct EFix {
    entries: BTreeMap<SitePath, Expr>,
}

impl EFix {
    /// The empty fix: no change.
    pub fn empty() -> EFix {
        EFix::default()
    }

    pub fn single(site: SitePath, replacement: Expr) -> EFix {
        let mut entries = BTreeMap::new();
        entries.insert(site, replacement);
        EFix { entries }
    }

    /// Build a fix from an entry list, applying the overlap rule left to
    /// right: an entry is dropped if its site is already present or is
    /// strictly contained in an accepted site.
    pub fn from_list(entries: Vec<(SitePath, Expr)>) -> EFix {
        let mut fix = EFix::empty();
        for (site, expr) in entries {
            fix.insert(site, expr);
        }
        fix
    }

    /// Insert one entry under the overlap rule. Returns whether it was
    /// accepted.
    pub fn insert(&mut self, site: SitePath, replacement: Expr) -> bool {
        if self.entries.contains_key(&site)
            || self.entries.keys().any(|s| s.strictly_contains(&site))
        {
            return false;
        }
        self.entries.insert(site, replacement);
        true
    }

    /// Left-biased merge: all of `self`, plus the entries of `right` that
    /// survive the overlap rule against `self`.
    pub fn merge(&self, right: &EFix) -> EFix {
        let mut merged = self.clone();
        for (site, expr) in &right.entries {
            merged.insert(site.clone(), expr.clone());
        }
        merged
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&SitePath, &Expr)> {
        self.entries.iter()
    }

    pub fn sites(&self) -> impl Iterator<Item = &SitePath> {
        self.entries.keys()
    }

    pub fn to_list(&self) -> Vec<(SitePath, Expr)> {
        self.entries
            .iter()
            .map(|(s, e)| (s.clone(), e.clone()))
            .collect()
    }

    pub fn remove(&mut self, site: &SitePath) -> Option<Expr> {
        self.entries.remove(site)
    }

    /// Apply this fix to a program: substitute each site in map order,
    /// skipping sites strictly contained in an already-applied site.
    pub fn apply(&self, program: &Expr) -> Expr {
        program.replace_many(&self.entries)
    }
}

impl fmt::Display for EFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            return write!(f, "{{no change}}");
        }
        write!(f, "{{")?;
        for (i, (site, expr)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{site} => {expr}")?;
        }
        write!(f, "}}")
    }
}
