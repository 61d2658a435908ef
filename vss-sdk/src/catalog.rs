//! Session-scoped path/id catalog.
//!
//! The broker identifies signals by path in metadata and by numeric id on
//! the provider stream. The catalog is the bidirectional mapping between
//! the two, populated lazily as paths are registered and never evicted for
//! the life of its owning client or provider.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
struct CatalogInner {
    path_to_id: HashMap<String, i32>,
    id_to_path: HashMap<i32, String>,
}

/// Bidirectional path/id mapping behind a single mutex.
///
/// Invariant: at most one id per path and at most one path per id. A
/// re-registration that changes a mapping replaces both directions so the
/// mapping stays a bijection.
#[derive(Default)]
pub struct SignalCatalog {
    inner: Mutex<CatalogInner>,
}

impl SignalCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a resolved path/id pair.
    pub fn insert(&self, path: impl Into<String>, id: i32) {
        let path = path.into();
        let mut inner = self.inner.lock().unwrap();
        if let Some(old_id) = inner.path_to_id.insert(path.clone(), id) {
            if old_id != id {
                inner.id_to_path.remove(&old_id);
            }
        }
        if let Some(old_path) = inner.id_to_path.insert(id, path.clone()) {
            if old_path != path {
                inner.path_to_id.remove(&old_path);
            }
        }
    }

    pub fn id_for_path(&self, path: &str) -> Option<i32> {
        self.inner.lock().unwrap().path_to_id.get(path).copied()
    }

    pub fn path_for_id(&self, id: i32) -> Option<String> {
        self.inner.lock().unwrap().id_to_path.get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().path_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
