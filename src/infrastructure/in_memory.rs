use crate::domain::line_item::CatalogEntry;
use crate::domain::ports::LineItemCatalog;
use std::collections::HashMap;

/// A read-only catalog held in memory, keyed by item code.
///
/// Built once (from a CSV file or test fixture) and shared behind an `Arc`
/// between every engine that prices against it.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl InMemoryCatalog {
    /// Creates a new, empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces an entry.
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.code.clone(), entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CatalogEntry> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}

impl LineItemCatalog for InMemoryCatalog {
    fn lookup(&self, code: &str) -> Option<CatalogEntry> {
        self.entries.get(code).cloned()
    }
}
