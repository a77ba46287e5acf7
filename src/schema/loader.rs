//! Loading additional attribute types from disk
//!
//! - One JSON file holds an array of attribute type definitions
//! - Non-JSON files are skipped
//! - Unreadable or invalid files are FATAL: the store must not start with a
//!   partial schema

use std::fs;
use std::path::Path;

use super::errors::{SchemaError, SchemaResult};
use super::registry::SchemaRegistry;
use super::types::AttributeType;
use crate::observability::{Event, Logger};

impl SchemaRegistry {
    /// Loads every `*.json` file in `dir`, in file name order.
    ///
    /// Returns the number of attribute types registered. A missing
    /// directory loads nothing.
    pub fn load_dir(&mut self, dir: &Path) -> SchemaResult<usize> {
        if !dir.exists() {
            return Ok(0);
        }

        let entries = fs::read_dir(dir).map_err(|e| {
            SchemaError::malformed(
                dir.display().to_string(),
                format!("Failed to read schema directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                SchemaError::malformed(
                    dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let files = paths.len();
        let mut loaded = 0;
        for path in paths {
            loaded += self.load_file(&path)?;
        }
        Logger::info(
            Event::SchemaLoaded.as_str(),
            &[
                ("dir", &dir.display().to_string()),
                ("files", &files.to_string()),
                ("attribute_types", &loaded.to_string()),
            ],
        );
        Ok(loaded)
    }

    /// Loads one attribute type file.
    pub fn load_file(&mut self, path: &Path) -> SchemaResult<usize> {
        let content = fs::read_to_string(path).map_err(|e| {
            SchemaError::malformed(
                path.display().to_string(),
                format!("Failed to read file: {}", e),
            )
        })?;

        let types: Vec<AttributeType> = serde_json::from_str(&content).map_err(|e| {
            SchemaError::malformed(path.display().to_string(), format!("Invalid JSON: {}", e))
        })?;

        for at in &types {
            at.validate_structure()
                .map_err(|e| SchemaError::malformed(path.display().to_string(), e))?;
        }

        let count = types.len();
        for at in types {
            self.register(at)?;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaErrorCode;
    use tempfile::TempDir;

    #[test]
    fn test_load_dir() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("local.json"),
            r#"[
                {"oid":"1.3.6.1.4.1.99.1","names":["nickName"],"equality":"caseIgnoreMatch"},
                {"oid":"1.3.6.1.4.1.99.2","names":["shoeSize"],"equality":"integerMatch","single_value":true}
            ]"#,
        )
        .unwrap();
        fs::write(temp_dir.path().join("README.txt"), "ignored").unwrap();

        let mut registry = SchemaRegistry::core();
        let before = registry.len();
        assert_eq!(registry.load_dir(temp_dir.path()).unwrap(), 2);
        assert_eq!(registry.len(), before + 2);
        assert!(registry.lookup("shoeSize").unwrap().single_value);
    }

    #[test]
    fn test_missing_dir_loads_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let mut registry = SchemaRegistry::new();
        let loaded = registry.load_dir(&temp_dir.path().join("absent")).unwrap();
        assert_eq!(loaded, 0);
    }

    #[test]
    fn test_invalid_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("bad.json"), "{ not json").unwrap();

        let mut registry = SchemaRegistry::new();
        let err = registry.load_dir(temp_dir.path()).unwrap_err();
        assert_eq!(err.code(), SchemaErrorCode::MalformedSchema);
        assert!(err.is_fatal());
    }
}
