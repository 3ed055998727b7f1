// crates/serve/src/store/seed.rs

use super::StoreError;
use domain::item::{Item, ItemId};
use domain::resource::Term;
use serde::Deserialize;
use std::path::Path;

/// Initial content, usually read from `content.json` next to the settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub terms: Vec<Term>,
    #[serde(default)]
    pub sticky: Vec<ItemId>,
}

impl Seed {
    pub fn from_json(text: &str) -> Result<Self, StoreError> {
        serde_json::from_str(text).map_err(|e| StoreError::Seed(e.to_string()))
    }

    /// Read a seed file. A missing file is an empty seed.
    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_empty_seed() {
        let dir = tempfile::tempdir().unwrap();
        let seed = Seed::from_path(&dir.path().join("content.json")).unwrap();
        assert!(seed.items.is_empty() && seed.terms.is_empty() && seed.sticky.is_empty());
    }

    #[test]
    fn reads_items_terms_and_sticky() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "items": [{{
                    "id": 3, "type": "post", "status": "publish",
                    "date": "2024-01-02T03:04:05",
                    "modified": "2024-01-02T03:04:05",
                    "modified_gmt": "2024-01-02T03:04:05",
                    "title": "Seeded"
                }}],
                "terms": [{{ "id": 1, "taxonomy": "category", "name": "News" }}],
                "sticky": [3]
            }}"#
        )
        .unwrap();

        let seed = Seed::from_path(file.path()).unwrap();
        assert_eq!(seed.items[0].title, "Seeded");
        assert_eq!(seed.terms[0].slug, "");
        assert_eq!(seed.sticky, vec![3]);
    }

    #[test]
    fn malformed_json_is_a_seed_error() {
        let err = Seed::from_json("{ nope").unwrap_err();
        assert_eq!(err.code(), "seed_error");
    }
}
