//! Reference store: one rendered reference per identifier across a whole build.

use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::render::node::{RenderReference, RenderReferenceIdentifier};

/// Shared, deduplicated rendered references.
///
/// Lookups take the read lock. A missing reference is built with no lock
/// held and then inserted if still absent, so concurrent builders of the same
/// reference agree on the first one stored.
#[derive(Debug, Default)]
pub struct ReferenceStore {
    /// References by identifier, in identifier order.
    entries: RwLock<BTreeMap<RenderReferenceIdentifier, RenderReference>>,
}

impl ReferenceStore {
    /// An empty store.
    pub fn new() -> Self {
        return Self::default();
    }

    /// The stored reference for `identifier`.
    pub fn get(&self, identifier: &RenderReferenceIdentifier) -> Option<RenderReference> {
        return self.entries.read().get(identifier).cloned();
    }

    /// Insert `reference` unless its identifier is taken; returns the stored one.
    pub fn insert(&self, reference: RenderReference) -> RenderReference {
        let mut entries = self.entries.write();
        return entries
            .entry(reference.identifier().clone())
            .or_insert(reference)
            .clone();
    }

    /// The stored reference, or one built by `build` and inserted.
    ///
    /// `build` runs outside any lock and may be called by several threads
    /// for the same identifier; only the first result is kept.
    pub fn get_or_insert_with<F>(&self, identifier: &RenderReferenceIdentifier, build: F) -> Option<RenderReference>
    where
        F: FnOnce() -> Option<RenderReference>,
    {
        if let Some(found) = self.get(identifier) {
            return Some(found);
        }
        let built = build()?;
        return Some(self.insert(built));
    }

    /// Number of stored references.
    pub fn len(&self) -> usize {
        return self.entries.read().len();
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        return self.entries.read().is_empty();
    }

    /// A copy of every reference, in identifier order.
    pub fn snapshot(&self) -> BTreeMap<RenderReferenceIdentifier, RenderReference> {
        return self.entries.read().clone();
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    fn topic(id: &str, title: &str) -> RenderReference {
        return RenderReference::Topic {
            abstract_content: Vec::new(),
            identifier: RenderReferenceIdentifier(id.into()),
            kind: "symbol".into(),
            role: "class".into(),
            title: title.into(),
            url: String::new(),
        };
    }

    #[test]
    fn first_insert_wins() {
        let store = ReferenceStore::new();
        store.insert(topic("a", "First"));
        let stored = store.insert(topic("a", "Second"));
        assert_eq!(stored, topic("a", "First"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn builder_skipped_when_present() {
        let store = ReferenceStore::new();
        store.insert(topic("a", "First"));
        let id = RenderReferenceIdentifier("a".into());
        let found = store.get_or_insert_with(&id, || panic!("must not build"));
        assert_eq!(found, Some(topic("a", "First")));
        let missing = RenderReferenceIdentifier("b".into());
        assert_eq!(store.get_or_insert_with(&missing, || None), None);
        assert!(store.get(&missing).is_none());
    }

    #[test]
    fn concurrent_builders_agree() {
        let store = ReferenceStore::new();
        let id = RenderReferenceIdentifier("shared".into());
        let results: Vec<Option<RenderReference>> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let (store, id) = (&store, &id);
                    s.spawn(move || store.get_or_insert_with(id, || Some(topic("shared", &format!("T{i}")))))
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        let first = results.first().unwrap();
        assert!(results.iter().all(|r| r == first));
        assert_eq!(store.len(), 1);
    }
}
