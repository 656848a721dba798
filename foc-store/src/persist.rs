//! The persisted boundary: a local key-value store holding the template
//! list and the last-used template id, JSON-encoded under fixed keys.

use anyhow::Result;
use foc_model::template::Template;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Key holding the JSON array of templates.
pub const TEMPLATES_KEY: &str = "operationsTemplates";

/// Key holding the JSON-encoded id of the last selected template.
pub const LAST_USED_KEY: &str = "lastUsedTemplate";

/// Minimal local-storage-shaped backend. Write failures (quota, I/O)
/// propagate to the caller; nothing here retries.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory backend. Cheaply cloneable; clones share the same map, so a
/// test can hand one handle to a session and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Reads the persisted template list. A missing, empty or unreadable value
/// reads as `None` so the caller can fall back to the shipped defaults;
/// only store access itself fails.
pub fn read_templates(store: &dyn KeyValueStore) -> Result<Option<Vec<Template>>> {
    let Some(raw) = store.get(TEMPLATES_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<Vec<Template>>(&raw) {
        Ok(templates) if !templates.is_empty() => Ok(Some(templates)),
        Ok(_) => Ok(None),
        Err(err) => {
            log::warn!("[FOC Debug] persist: discarding unreadable template list: {err}");
            Ok(None)
        }
    }
}

pub fn write_templates(store: &mut dyn KeyValueStore, templates: &[Template]) -> Result<()> {
    let raw = serde_json::to_string(templates)?;
    store.set(TEMPLATES_KEY, &raw)?;
    log::debug!(
        "[FOC Debug] persist: wrote {} templates ({} bytes)",
        templates.len(),
        raw.len()
    );
    Ok(())
}

pub fn read_last_used(store: &dyn KeyValueStore) -> Result<Option<String>> {
    let Some(raw) = store.get(LAST_USED_KEY)? else {
        return Ok(None);
    };
    match serde_json::from_str::<String>(&raw) {
        Ok(id) => Ok(Some(id)),
        Err(err) => {
            log::warn!("[FOC Debug] persist: discarding unreadable last-used id: {err}");
            Ok(None)
        }
    }
}

pub fn write_last_used(store: &mut dyn KeyValueStore, id: &str) -> Result<()> {
    store.set(LAST_USED_KEY, &serde_json::to_string(id)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foc_model::loader;

    #[test]
    fn memory_store_clones_share_their_entries() {
        let mut store = MemoryStore::new();
        let view = store.clone();
        store.set("k", "v").unwrap();
        assert_eq!(view.get("k").unwrap().as_deref(), Some("v"));
        assert_eq!(view.get("missing").unwrap(), None);
    }

    #[test]
    fn templates_round_trip_through_the_fixed_key() {
        let mut store = MemoryStore::new();
        let templates = loader::default_templates().unwrap();
        write_templates(&mut store, &templates).unwrap();

        let back = read_templates(&store).unwrap().unwrap();
        assert_eq!(back, templates);
    }

    #[test]
    fn unreadable_or_empty_template_lists_read_as_absent() {
        let mut store = MemoryStore::new();
        assert!(read_templates(&store).unwrap().is_none());

        store.set(TEMPLATES_KEY, "{definitely not json").unwrap();
        assert!(read_templates(&store).unwrap().is_none());

        store.set(TEMPLATES_KEY, "[]").unwrap();
        assert!(read_templates(&store).unwrap().is_none());
    }

    #[test]
    fn last_used_id_is_stored_as_a_json_string() {
        let mut store = MemoryStore::new();
        write_last_used(&mut store, "tpl-working").unwrap();
        assert_eq!(
            store.get(LAST_USED_KEY).unwrap().as_deref(),
            Some("\"tpl-working\"")
        );
        assert_eq!(read_last_used(&store).unwrap().as_deref(), Some("tpl-working"));

        store.set(LAST_USED_KEY, "tpl-working").unwrap();
        assert!(read_last_used(&store).unwrap().is_none());
    }
}
