//! Content loading.
//!
//! Terminology files are parsed into plain records, checked, and only then
//! turned into engine items. A content path may be a single JSON file or a
//! directory of them.

use dojang_engine::{Catalog, EngineError, Item, RankLadder, RankLevel};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path}: term {index} is missing '{field}'")]
    MissingField {
        path: PathBuf,
        index: usize,
        field: &'static str,
    },
    #[error("No content files found in {0}")]
    Empty(PathBuf),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type ContentResult<T> = Result<T, ContentError>;

/// One terminology file.
#[derive(Debug, Deserialize)]
struct ContentFile {
    #[serde(default)]
    ranks: Vec<RankLevel>,
    #[serde(alias = "items")]
    terminology: Vec<TermRecord>,
}

#[derive(Debug, Deserialize)]
struct TermRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(alias = "romanized_pronunciation", alias = "korean_term")]
    korean: Option<String>,
    #[serde(alias = "english_term")]
    english: Option<String>,
    #[serde(default, alias = "korean_hangul")]
    hangul: Option<String>,
    #[serde(default)]
    pronunciation: Option<String>,
    #[serde(default)]
    definition: Option<String>,
    #[serde(alias = "belt_level", alias = "rank")]
    belt: Option<String>,
    category: Option<String>,
    #[serde(default)]
    difficulty: Option<u8>,
}

impl TermRecord {
    fn into_item(self, path: &Path, index: usize) -> ContentResult<Item> {
        let missing = |field| ContentError::MissingField {
            path: path.to_path_buf(),
            index,
            field,
        };
        let korean = self
            .korean
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("korean"))?;
        let english = self
            .english
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| missing("english"))?;
        let belt = self.belt.ok_or_else(|| missing("belt"))?;
        let category = self.category.ok_or_else(|| missing("category"))?;

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("content");
        let id = self.id.unwrap_or_else(|| format!("{}-{}", stem, index));
        let pronunciation = self.pronunciation.or(self.hangul).unwrap_or_default();

        Ok(Item::new(id, korean.trim(), english.trim(), belt, category)
            .with_pronunciation(pronunciation)
            .with_definition(self.definition.unwrap_or_default())
            .with_difficulty(self.difficulty.unwrap_or(1)))
    }
}

/// Load a catalog from a file or directory.
pub fn load_catalog(path: &Path) -> ContentResult<Catalog> {
    let files = content_files(path)?;
    let mut items = Vec::new();
    let mut ranks = Vec::new();

    for file in &files {
        let text = std::fs::read_to_string(file).map_err(|source| ContentError::Io {
            path: file.clone(),
            source,
        })?;
        let content = parse_content(&text, file)?;
        ranks.extend(content.ranks);
        for (index, record) in content.terminology.into_iter().enumerate() {
            items.push(record.into_item(file, index)?);
        }
    }

    let ladder = if ranks.is_empty() {
        RankLadder::standard()
    } else {
        RankLadder::new(ranks)?
    };
    tracing::info!(files = files.len(), items = items.len(), "loaded content");
    Ok(Catalog::new(items, ladder)?)
}

fn parse_content(text: &str, path: &Path) -> ContentResult<ContentFile> {
    serde_json::from_str(text).map_err(|source| ContentError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn content_files(path: &Path) -> ContentResult<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let entries = std::fs::read_dir(path).map_err(|source| ContentError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    if files.is_empty() {
        return Err(ContentError::Empty(path.to_path_buf()));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WHITE_BELT: &str = r#"{
        "terminology": [
            {
                "english_term": "Attention",
                "romanized_pronunciation": "Charyot",
                "korean_hangul": "차렷",
                "belt_level": "10th_keup",
                "category": "commands"
            },
            {
                "english_term": "Bow",
                "romanized_pronunciation": "Kyong ye",
                "belt_level": "10th_keup",
                "category": "commands",
                "difficulty": 1
            },
            {
                "id": "kick-1",
                "english": "Front kick",
                "korean": "Ap chagi",
                "belt": "9th_keup",
                "category": "kicks",
                "difficulty": 2
            }
        ]
    }"#;

    #[test]
    fn test_load_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("white_belt.json");
        std::fs::write(&path, WHITE_BELT).unwrap();

        let catalog = load_catalog(&path).unwrap();
        assert_eq!(catalog.len(), 3);
        let first = catalog.get("white_belt-0").unwrap();
        assert_eq!(first.front_text, "Charyot");
        assert_eq!(first.back_text, "Attention");
        assert_eq!(first.pronunciation, "차렷");
        assert_eq!(catalog.get("kick-1").unwrap().difficulty, 2);
    }

    #[test]
    fn test_load_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.json"), WHITE_BELT).unwrap();
        std::fs::write(
            dir.path().join("b.json"),
            r#"{"items": [{
                "english": "Low block",
                "korean": "Najunde makgi",
                "belt": "8th_keup",
                "category": "blocks"
            }]}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = load_catalog(dir.path()).unwrap();
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.categories(), vec!["blocks", "commands", "kicks"]);
    }

    #[test]
    fn test_missing_field_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"terminology": [{"english": "Bow", "belt": "10th_keup", "category": "commands"}]}"#,
        )
        .unwrap();
        let err = load_catalog(&path).unwrap_err();
        assert!(matches!(err, ContentError::MissingField { field: "korean", .. }));
    }

    #[test]
    fn test_unknown_belt_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"terminology": [
                {"english": "Bow", "korean": "Kyong ye", "belt": "purple", "category": "commands"}
            ]}"#,
        )
        .unwrap();
        assert!(matches!(load_catalog(&path), Err(ContentError::Engine(_))));
    }
}
