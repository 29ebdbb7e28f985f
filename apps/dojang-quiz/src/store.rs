//! JSON persistence for learner progress, interrupted sessions and history.

use dojang_engine::{ProgressBook, Results, SessionSnapshot};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Files for one learner profile under a data directory.
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(data_dir: &Path, profile: &str) -> Self {
        Self {
            dir: data_dir.join("profiles").join(profile),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_progress(&self) -> StoreResult<ProgressBook> {
        Ok(self.read("progress.json")?.unwrap_or_default())
    }

    pub fn save_progress(&self, book: &ProgressBook) -> StoreResult<()> {
        self.write("progress.json", book)
    }

    pub fn load_session(&self) -> StoreResult<Option<SessionSnapshot>> {
        self.read("session.json")
    }

    pub fn save_session(&self, snapshot: &SessionSnapshot) -> StoreResult<()> {
        self.write("session.json", snapshot)
    }

    pub fn clear_session(&self) -> StoreResult<()> {
        let path = self.dir.join("session.json");
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn load_history(&self) -> StoreResult<Vec<Results>> {
        Ok(self.read("history.json")?.unwrap_or_default())
    }

    pub fn append_history(&self, results: &Results) -> StoreResult<()> {
        let mut history = self.load_history()?;
        history.push(results.clone());
        self.write("history.json", &history)
    }

    fn read<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        let path = self.dir.join(name);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> StoreResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
        std::fs::rename(tmp, path)?;
        Ok(())
    }
}
