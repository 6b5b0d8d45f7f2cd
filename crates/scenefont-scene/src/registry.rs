//! Font Family Registry
//!
//! Stable numeric ids mapped to canonical family names. Both directions are
//! indexed when a family is registered, so resolving an element's family and
//! looking a name back up are constant-time.

use std::collections::{BTreeMap, HashMap};

use crate::{FontFamilyRef, Result, SceneError};

/// Family used when an element's family cannot be resolved
pub const DEFAULT_FAMILY: &str = "Segoe UI Emoji";

/// Families known to Excalidraw scenes
const EXCALIDRAW_FAMILIES: &[(u32, &str)] = &[
    (1, "Virgil"),
    (2, "Helvetica"),
    (3, "Cascadia"),
    (4, "ChineseFont"),
    (5, "Excalifont"),
    (6, "Nunito"),
    (7, "Lilita One"),
    (8, "Comic Shanns"),
    (9, "Liberation Sans"),
];

/// Bidirectional id <-> name registry
#[derive(Debug, Clone)]
pub struct FontFamilyRegistry {
    /// id -> name, ordered by id
    names: BTreeMap<u32, String>,
    /// name -> id
    ids: HashMap<String, u32>,
    /// Name unresolved references fall back to
    default_family: String,
}

impl FontFamilyRegistry {
    /// Create an empty registry
    pub fn new(default_family: &str) -> Self {
        Self {
            names: BTreeMap::new(),
            ids: HashMap::new(),
            default_family: default_family.to_string(),
        }
    }

    /// Registry pre-populated with the Excalidraw font families
    pub fn excalidraw() -> Self {
        let mut registry = Self::new(DEFAULT_FAMILY);
        for &(id, name) in EXCALIDRAW_FAMILIES {
            registry.names.insert(id, name.to_string());
            registry.ids.insert(name.to_string(), id);
        }
        registry
    }

    /// Register a family.
    ///
    /// Re-registering the same pair is a no-op. An id already bound to a
    /// different name, or a name already bound to a different id, is rejected.
    pub fn register(&mut self, id: u32, name: &str) -> Result<()> {
        if let Some(existing) = self.names.get(&id) {
            if existing == name {
                return Ok(());
            }
            return Err(SceneError::ConflictingFamily {
                id,
                existing: existing.clone(),
                requested: name.to_string(),
            });
        }
        if let Some(&existing) = self.ids.get(name) {
            return Err(SceneError::ConflictingId {
                name: name.to_string(),
                existing,
                requested: id,
            });
        }

        self.names.insert(id, name.to_string());
        self.ids.insert(name.to_string(), id);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_family(mut self, id: u32, name: &str) -> Result<Self> {
        self.register(id, name)?;
        Ok(self)
    }

    /// Change the default family name
    pub fn set_default_family(&mut self, name: &str) {
        self.default_family = name.to_string();
    }

    /// Family name for an id
    pub fn name(&self, id: u32) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Id for a family name
    pub fn id(&self, name: &str) -> Option<u32> {
        self.ids.get(name).copied()
    }

    /// Resolve an element's family reference to a registered name
    pub fn resolve(&self, family: Option<&FontFamilyRef>) -> Option<&str> {
        match family? {
            FontFamilyRef::Id(id) => self.name(*id),
            FontFamilyRef::Name(name) => {
                let id = self.id(name)?;
                self.name(id)
            }
            FontFamilyRef::Other(_) => None,
        }
    }

    /// Resolve, falling back to the default family
    pub fn resolve_or_default(&self, family: Option<&FontFamilyRef>) -> &str {
        self.resolve(family).unwrap_or(&self.default_family)
    }

    pub fn default_family(&self) -> &str {
        &self.default_family
    }

    /// Registered families in id order
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.names.iter().map(|(&id, name)| (id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for FontFamilyRegistry {
    fn default() -> Self {
        Self::excalidraw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excalidraw_families() {
        let registry = FontFamilyRegistry::excalidraw();
        assert_eq!(registry.len(), 9);
        assert_eq!(registry.name(1), Some("Virgil"));
        assert_eq!(registry.name(7), Some("Lilita One"));
        assert_eq!(registry.id("Liberation Sans"), Some(9));
        assert_eq!(registry.default_family(), DEFAULT_FAMILY);
    }

    #[test]
    fn test_both_directions_agree() {
        let registry = FontFamilyRegistry::excalidraw();
        for (id, name) in registry.iter() {
            assert_eq!(registry.id(name), Some(id));
            assert_eq!(registry.name(id), Some(name));
        }
    }

    #[test]
    fn test_iter_in_id_order() {
        let registry = FontFamilyRegistry::new("Fallback")
            .with_family(20, "Late")
            .unwrap()
            .with_family(3, "Early")
            .unwrap();
        let ids: Vec<u32> = registry.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![3, 20]);
    }

    #[test]
    fn test_resolve_unknown_uses_default() {
        let registry = FontFamilyRegistry::excalidraw();
        assert_eq!(registry.resolve(Some(&FontFamilyRef::Id(42))), None);
        assert_eq!(registry.resolve_or_default(Some(&FontFamilyRef::Id(42))), DEFAULT_FAMILY);
        assert_eq!(registry.resolve_or_default(None), DEFAULT_FAMILY);
        assert_eq!(
            registry.resolve_or_default(Some(&FontFamilyRef::Name("Papyrus".into()))),
            DEFAULT_FAMILY
        );
    }

    #[test]
    fn test_resolve_other_value_uses_default() {
        let registry = FontFamilyRegistry::excalidraw();
        let family = FontFamilyRef::Other(serde_json::json!(-1));
        assert_eq!(registry.resolve(Some(&family)), None);
        assert_eq!(registry.resolve_or_default(Some(&family)), DEFAULT_FAMILY);
    }

    #[test]
    fn test_resolve_symbolic_name() {
        let registry = FontFamilyRegistry::excalidraw();
        let family = FontFamilyRef::Name("Cascadia".into());
        assert_eq!(registry.resolve(Some(&family)), Some("Cascadia"));
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut registry = FontFamilyRegistry::excalidraw();
        registry.register(1, "Virgil").unwrap();
        assert_eq!(registry.len(), 9);
    }

    #[test]
    fn test_register_rejects_reused_id() {
        let mut registry = FontFamilyRegistry::excalidraw();
        let err = registry.register(1, "Papyrus").unwrap_err();
        assert!(matches!(err, SceneError::ConflictingFamily { id: 1, .. }));
        assert_eq!(registry.name(1), Some("Virgil"));
    }

    #[test]
    fn test_register_rejects_reused_name() {
        let mut registry = FontFamilyRegistry::excalidraw();
        let err = registry.register(99, "Virgil").unwrap_err();
        assert!(matches!(err, SceneError::ConflictingId { existing: 1, requested: 99, .. }));
    }
}
