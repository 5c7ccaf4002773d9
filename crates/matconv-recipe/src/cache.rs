//! Process-wide cache of loaded recipe indexes.
//!
//! Loading walks every search root and parses every data file, so sessions
//! share one index per distinct root list. The cache is read-mostly; a
//! writer only appears on the first load of a root list or on `reload`.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::index::RecipeIndex;

static GLOBAL: Lazy<RecipeCache> = Lazy::new(RecipeCache::new);

#[derive(Debug, Default)]
pub struct RecipeCache {
    entries: RwLock<HashMap<Vec<PathBuf>, Arc<RecipeIndex>>>,
}

impl RecipeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache shared by every session in the process.
    pub fn global() -> &'static RecipeCache {
        &GLOBAL
    }

    /// The index for `roots`, loading it on first use.
    pub fn get_or_load(&self, roots: &[PathBuf]) -> Arc<RecipeIndex> {
        {
            let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
            if let Some(index) = entries.get(roots) {
                return Arc::clone(index);
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        // Another thread may have loaded it between the two locks.
        if let Some(index) = entries.get(roots) {
            return Arc::clone(index);
        }
        let index = Arc::new(RecipeIndex::load(roots));
        log::info!(
            "loaded {} conversion recipes from {} search roots",
            index.recipes().count(),
            roots.len()
        );
        entries.insert(roots.to_vec(), Arc::clone(&index));
        index
    }

    /// Re-read `roots` from disk and replace the cached index. Sessions
    /// holding the old index keep it.
    pub fn reload(&self, roots: &[PathBuf]) -> Arc<RecipeIndex> {
        let index = Arc::new(RecipeIndex::load(roots));
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(roots.to_vec(), Arc::clone(&index));
        index
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;

    const DEFS: &str = r#"{
        "src": {"id": "Src", "domain": "3dsmax", "inputs": {"a": "float"}},
        "dst": {"id": "Dst", "domain": "usd", "inputs": {"b": "float"}}
    }"#;

    fn recipe_json(key: &str) -> String {
        format!(
            r#"{{"{}": {{
                "source_material": {{"id": "Src", "domain": "3dsmax"}},
                "target_material": {{"id": "Dst", "domain": "usd"}},
                "parameter_mapping": {{"mappings": {{"b": "a"}}}}
            }}}}"#,
            key
        )
    }

    #[test]
    fn test_get_or_load_shares_index() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("defs.mat_def"), DEFS).unwrap();
        fs::write(root.path().join("r.material_conversion"), recipe_json("first")).unwrap();
        let roots = vec![root.path().to_path_buf()];

        let cache = RecipeCache::new();
        let a = cache.get_or_load(&roots);
        let b = cache.get_or_load(&roots);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("defs.mat_def"), DEFS).unwrap();
        fs::write(root.path().join("r.material_conversion"), recipe_json("first")).unwrap();
        let roots = vec![root.path().to_path_buf()];

        let cache = RecipeCache::new();
        let old = cache.get_or_load(&roots);
        fs::write(root.path().join("r.material_conversion"), recipe_json("second")).unwrap();

        let fresh = cache.reload(&roots);
        assert_eq!(old.lookup("Src", "3dsmax", "Dst", "usd").unwrap().key, "first");
        assert_eq!(fresh.lookup("Src", "3dsmax", "Dst", "usd").unwrap().key, "second");
        assert!(Arc::ptr_eq(&fresh, &cache.get_or_load(&roots)));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_concurrent_loads() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("defs.mat_def"), DEFS).unwrap();
        fs::write(root.path().join("r.material_conversion"), recipe_json("first")).unwrap();
        let roots = vec![root.path().to_path_buf()];
        let cache = Arc::new(RecipeCache::new());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let roots = roots.clone();
                thread::spawn(move || cache.get_or_load(&roots))
            })
            .collect();
        let indexes: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(indexes.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }
}
