//! Used-character collection
//!
//! Groups every character that appears in a non-deleted text element by the
//! family that will render it. Characters are Unicode scalar values, so a
//! character outside the Basic Multilingual Plane counts once, not as two
//! surrogate halves.

use std::collections::btree_map;
use std::collections::{BTreeMap, BTreeSet};

use crate::{Element, FontFamilyRegistry};

/// Per-family sets of characters used in a scene
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedCharacters {
    by_family: BTreeMap<String, BTreeSet<char>>,
}

impl UsedCharacters {
    /// Characters used with a family
    pub fn get(&self, family: &str) -> Option<&BTreeSet<char>> {
        self.by_family.get(family)
    }

    /// Family names, sorted
    pub fn families(&self) -> impl Iterator<Item = &str> {
        self.by_family.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, BTreeSet<char>> {
        self.by_family.iter()
    }

    /// Number of families
    pub fn len(&self) -> usize {
        self.by_family.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_family.is_empty()
    }

    /// Distinct characters summed over all families
    pub fn total_characters(&self) -> usize {
        self.by_family.values().map(BTreeSet::len).sum()
    }

    fn add_text(&mut self, family: &str, text: &str) {
        if text.is_empty() {
            return;
        }
        self.by_family
            .entry(family.to_string())
            .or_default()
            .extend(text.chars());
    }
}

impl<'a> IntoIterator for &'a UsedCharacters {
    type Item = (&'a String, &'a BTreeSet<char>);
    type IntoIter = btree_map::Iter<'a, String, BTreeSet<char>>;

    fn into_iter(self) -> Self::IntoIter {
        self.by_family.iter()
    }
}

/// Collect the characters used per font family.
///
/// Deleted elements and non-text elements contribute nothing. Elements whose
/// family does not resolve are attributed to the registry default.
pub fn collect_used_characters<'a, I>(elements: I, registry: &FontFamilyRegistry) -> UsedCharacters
where
    I: IntoIterator<Item = &'a Element>,
{
    let mut used = UsedCharacters::default();

    for element in elements {
        if element.is_deleted || !element.is_text() {
            continue;
        }
        let family = registry.resolve_or_default(element.font_family.as_ref());
        used.add_text(family, &element.text);
    }

    tracing::debug!(
        families = used.len(),
        characters = used.total_characters(),
        "collected used characters"
    );
    used
}
