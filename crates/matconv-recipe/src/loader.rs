//! Data file discovery and merging.

use indexmap::IndexMap;
use matconv_core::{ConfigError, Diagnostics};
use std::fs;
use std::path::{Path, PathBuf};

pub const MAT_DEF_EXTENSION: &str = ".mat_def";
pub const CONVERSION_EXTENSION: &str = ".material_conversion";

/// Kind of data file, by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFileKind {
    MaterialDefinition,
    Conversion,
}

impl DataFileKind {
    pub fn of(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(MAT_DEF_EXTENSION) {
            Some(DataFileKind::MaterialDefinition)
        } else if name.ends_with(CONVERSION_EXTENSION) {
            Some(DataFileKind::Conversion)
        } else {
            None
        }
    }
}

/// Top-level entries of all data files, merged by key.
#[derive(Debug, Default)]
pub struct MergedDocuments {
    pub material_definitions: IndexMap<String, serde_json::Value>,
    pub conversions: IndexMap<String, serde_json::Value>,
}

/// Data files directly under `root`, sorted by file name.
pub fn gather_data_files(root: &Path) -> Result<Vec<(DataFileKind, PathBuf)>, ConfigError> {
    let entries = fs::read_dir(root).map_err(|source| ConfigError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let mut files: Vec<(DataFileKind, PathBuf)> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter_map(|path| DataFileKind::of(&path).map(|kind| (kind, path)))
        .collect();
    files.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(files)
}

/// Parse one data file into its top-level entries.
pub fn read_data_file(path: &Path) -> Result<serde_json::Map<String, serde_json::Value>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    match json {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ConfigError::InvalidEntry {
            key: path.display().to_string(),
            reason: "top level must be an object".into(),
        }),
    }
}

/// Merge every data file under `roots`. Later roots, and later files within a
/// root, replace earlier entries with the same top-level key. Unreadable or
/// malformed files are skipped with a warning.
pub fn merge_roots(roots: &[PathBuf], diagnostics: &mut Diagnostics) -> MergedDocuments {
    let mut merged = MergedDocuments::default();

    for root in roots {
        let files = match gather_data_files(root) {
            Ok(files) => files,
            Err(err) => {
                log::debug!("skipping search root {}: {}", root.display(), err);
                continue;
            }
        };

        for (kind, path) in files {
            let entries = match read_data_file(&path) {
                Ok(entries) => entries,
                Err(err) => {
                    diagnostics.warn(err.to_string());
                    continue;
                }
            };
            log::debug!("loaded {} entries from {}", entries.len(), path.display());

            let target = match kind {
                DataFileKind::MaterialDefinition => &mut merged.material_definitions,
                DataFileKind::Conversion => &mut merged.conversions,
            };
            // An overridden key moves to the end so iteration follows load order.
            for (key, value) in entries {
                target.shift_remove(&key);
                target.insert(key, value);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_data_file_kind() {
        assert_eq!(
            DataFileKind::of(Path::new("a/Physical.MAT_DEF")),
            Some(DataFileKind::MaterialDefinition)
        );
        assert_eq!(
            DataFileKind::of(Path::new("x.material_conversion")),
            Some(DataFileKind::Conversion)
        );
        assert_eq!(DataFileKind::of(Path::new("readme.json")), None);
    }

    #[test]
    fn test_later_root_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(
            first.path().join("base.mat_def"),
            r#"{"a": {"id": "A", "domain": "usd"}, "b": {"id": "B", "domain": "usd"}}"#,
        )
        .unwrap();
        fs::write(
            second.path().join("user.mat_def"),
            r#"{"a": {"id": "A2", "domain": "usd"}}"#,
        )
        .unwrap();

        let mut diags = Diagnostics::new();
        let merged = merge_roots(
            &[first.path().to_path_buf(), second.path().to_path_buf()],
            &mut diags,
        );
        assert_eq!(merged.material_definitions.len(), 2);
        assert_eq!(merged.material_definitions["a"]["id"], "A2");
        assert_eq!(merged.material_definitions["b"]["id"], "B");
        let keys: Vec<&str> = merged.material_definitions.keys().map(String::as_str).collect();
        assert_eq!(keys, ["b", "a"]);
        assert!(diags.is_empty());
    }

    #[test]
    fn test_bad_json_is_skipped() {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("broken.material_conversion"), "{ not json").unwrap();
        fs::write(root.path().join("list.mat_def"), "[1, 2]").unwrap();
        fs::write(
            root.path().join("ok.material_conversion"),
            r#"{"r": {"source_material": {}}}"#,
        )
        .unwrap();

        let mut diags = Diagnostics::new();
        let merged = merge_roots(&[root.path().to_path_buf()], &mut diags);
        assert_eq!(merged.conversions.len(), 1);
        assert!(merged.material_definitions.is_empty());
        assert_eq!(diags.warning_count(), 2);
    }

    #[test]
    fn test_missing_root_is_ignored() {
        let mut diags = Diagnostics::new();
        let merged = merge_roots(&[PathBuf::from("/nonexistent/matconv/root")], &mut diags);
        assert!(merged.conversions.is_empty());
        assert!(diags.is_empty());
    }
}
