//! In-memory template store with optimistic concurrency
//!
//! Persistent storage is an external collaborator; this store backs tests
//! and single-process deployments. Writes are version-checked: a stale base
//! version is rejected with a conflict and the stored template is left
//! unchanged. No field-level locking is needed because updates replace a
//! full-template snapshot.

use crate::error::EngineError;
use std::collections::HashMap;
use tabula_domain::traits::TemplateStore;
use tabula_domain::{Template, TemplateId};
use tracing::debug;

/// HashMap-backed template store
#[derive(Debug, Default)]
pub struct MemoryTemplateStore {
    templates: HashMap<TemplateId, Template>,
}

impl MemoryTemplateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored templates
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// True when the store holds no templates
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl TemplateStore for MemoryTemplateStore {
    type Error = EngineError;

    fn get(&self, id: TemplateId) -> Result<Option<Template>, Self::Error> {
        Ok(self.templates.get(&id).cloned())
    }

    fn insert(&mut self, template: Template) -> Result<TemplateId, Self::Error> {
        let id = template.id;
        if self.templates.contains_key(&id) {
            return Err(EngineError::DuplicateTemplate(id.to_string()));
        }
        self.templates.insert(id, template);
        Ok(id)
    }

    fn update(&mut self, template: Template, base_version: u64) -> Result<u64, Self::Error> {
        let stored = self
            .templates
            .get_mut(&template.id)
            .ok_or_else(|| EngineError::TemplateNotFound(template.id.to_string()))?;

        if stored.version != base_version {
            return Err(EngineError::Conflict {
                base: base_version,
                stored: stored.version,
            });
        }

        let new_version = stored.version + 1;
        debug!(
            "Template '{}' updated: version {} -> {}",
            template.name, base_version, new_version
        );

        *stored = Template {
            version: new_version,
            ..template
        };
        Ok(new_version)
    }

    fn list(&self) -> Result<Vec<Template>, Self::Error> {
        let mut templates: Vec<Template> = self.templates.values().cloned().collect();
        templates.sort_by_key(|t| t.id);
        Ok(templates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_domain::ExtractionMethod;

    fn template(name: &str) -> Template {
        Template::new(name, ExtractionMethod::Ai)
    }

    #[test]
    fn test_insert_and_get() {
        let mut store = MemoryTemplateStore::new();
        let t = template("monthly");
        let id = store.insert(t.clone()).unwrap();

        assert_eq!(store.get(id).unwrap(), Some(t));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = MemoryTemplateStore::new();
        let t = template("monthly");
        store.insert(t.clone()).unwrap();

        assert!(matches!(
            store.insert(t),
            Err(EngineError::DuplicateTemplate(_))
        ));
    }

    #[test]
    fn test_update_bumps_version() {
        let mut store = MemoryTemplateStore::new();
        let t = template("monthly");
        let id = store.insert(t.clone()).unwrap();

        let mut edited = t.clone();
        edited.name = "monthly_v2".into();
        let new_version = store.update(edited, 0).unwrap();

        assert_eq!(new_version, 1);
        let stored = store.get(id).unwrap().unwrap();
        assert_eq!(stored.name, "monthly_v2");
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_stale_version_is_conflict_and_store_unchanged() {
        let mut store = MemoryTemplateStore::new();
        let t = template("monthly");
        let id = store.insert(t.clone()).unwrap();

        let mut first = t.clone();
        first.name = "first_writer".into();
        store.update(first, 0).unwrap();

        // Second writer still bases its edit on version 0
        let mut second = t.clone();
        second.name = "second_writer".into();
        let result = store.update(second, 0);

        assert!(matches!(
            result,
            Err(EngineError::Conflict { base: 0, stored: 1 })
        ));
        assert_eq!(store.get(id).unwrap().unwrap().name, "first_writer");
    }

    #[test]
    fn test_update_missing_template() {
        let mut store = MemoryTemplateStore::new();
        assert!(matches!(
            store.update(template("ghost"), 0),
            Err(EngineError::TemplateNotFound(_))
        ));
    }

    #[test]
    fn test_refetch_and_reapply_after_conflict() {
        let mut store = MemoryTemplateStore::new();
        let t = template("monthly");
        let id = store.insert(t.clone()).unwrap();
        store.update(t.clone(), 0).unwrap();

        // Conflicted writer refetches and reapplies on the fresh version
        let fresh = store.get(id).unwrap().unwrap();
        let mut edited = fresh.clone();
        edited.name = "retry".into();
        let version = store.update(edited, fresh.version).unwrap();

        assert_eq!(version, 2);
        assert_eq!(store.get(id).unwrap().unwrap().name, "retry");
    }

    #[test]
    fn test_list_sorted_by_id() {
        let mut store = MemoryTemplateStore::new();
        store.insert(template("a")).unwrap();
        store.insert(template("b")).unwrap();

        let listed = store.list().unwrap();
        assert_eq!(listed.len(), 2);
        assert!(listed[0].id <= listed[1].id);
    }
}
