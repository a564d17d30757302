//! RegistryObject - the per-hive index of keys by cellpath.

use crate::error::{Error, Result};
use crate::objects::cellobject::CellObject;
use std::collections::HashMap;

/// Index of the keys closed so far within one `hive`/`msregistry` element.
///
/// Keys are unique by cellpath within a registry; values are not indexed.
#[derive(Debug, Clone, Default)]
pub struct RegistryObject {
    keys: HashMap<String, CellObject>,
}

impl RegistryObject {
    /// Creates an empty registry index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes a key by its cellpath.
    ///
    /// Fails with [`Error::DuplicateCellpath`] if the path is already
    /// present; the index is left unchanged in that case.
    pub fn insert(&mut self, key: CellObject) -> Result<()> {
        if self.keys.contains_key(&key.cellpath) {
            return Err(Error::DuplicateCellpath(key.cellpath));
        }
        self.keys.insert(key.cellpath.clone(), key);
        Ok(())
    }

    /// Looks up a key by cellpath.
    pub fn get(&self, cellpath: &str) -> Option<&CellObject> {
        self.keys.get(cellpath)
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no key has been indexed.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Looks up the parent key of a cell.
    pub fn parent_of(&self, cell: &CellObject) -> Option<&CellObject> {
        cell.parent.as_deref().and_then(|p| self.get(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = RegistryObject::new();
        let root = CellObject::new_key("ROOT", None);
        let child = CellObject::new_key("Run", Some("\\ROOT"));
        registry.insert(child.clone()).unwrap();
        registry.insert(root).unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.parent_of(&child).map(|k| k.cellpath.as_str()),
            Some("\\ROOT")
        );
        assert!(registry.get("\\ROOT\\Missing").is_none());
    }

    #[test]
    fn test_duplicate_cellpath() {
        let mut registry = RegistryObject::new();
        registry.insert(CellObject::new_key("ROOT", None)).unwrap();
        let err = registry
            .insert(CellObject::new_key("ROOT", None))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateCellpath(ref p) if p == "\\ROOT"));
        assert_eq!(registry.len(), 1);
    }
}
