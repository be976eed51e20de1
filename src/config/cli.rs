use crate::domain::ports::DocumentSource;
use crate::utils::error::{RecipeError, Result};
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Reads recipe documents from a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalDocuments {
    base_path: String,
}

impl LocalDocuments {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl DocumentSource for LocalDocuments {
    fn read_document(&self, path: &str) -> Result<Value> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = fs::read(&full_path)?;

        serde_json::from_slice(&data).map_err(|e| RecipeError::InvalidDocument {
            message: format!("{}: {}", full_path.display(), e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_document() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("stone.json"), r#"{"result": "minecraft:stone"}"#).unwrap();
        fs::write(dir.path().join("broken.json"), "{ nope").unwrap();

        let source = LocalDocuments::new(dir.path().to_str().unwrap().to_string());
        let doc = source.read_document("stone.json").unwrap();
        assert_eq!(doc["result"], "minecraft:stone");

        assert!(matches!(
            source.read_document("broken.json"),
            Err(RecipeError::InvalidDocument { .. })
        ));
        assert!(matches!(
            source.read_document("missing.json"),
            Err(RecipeError::IoError(_))
        ));
    }
}
