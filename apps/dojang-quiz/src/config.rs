//! Configuration for the quiz runner.

use dojang_engine::{EngineConfig, LearningMode};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub study: StudyConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    pub fn load() -> Self {
        Self::config_path()
            .and_then(|p| std::fs::read_to_string(p).ok())
            .and_then(|s| toml::from_str(&s).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> anyhow::Result<PathBuf> {
        let path = Self::config_path().unwrap_or_else(|| PathBuf::from("config.toml"));
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "dojang-quiz")
            .map(|d| d.config_dir().join("config.toml"))
    }

    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "dojang-quiz")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".dojang-quiz"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_rank")]
    pub rank: String,
    #[serde(default)]
    pub learning_mode: LearningMode,
    #[serde(default = "default_question_count")]
    pub question_count: usize,
    #[serde(default)]
    pub content_path: Option<PathBuf>,
}

fn default_profile() -> String { "default".to_string() }
fn default_rank() -> String { "10th_keup".to_string() }
fn default_question_count() -> usize { 20 }

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            rank: default_rank(),
            learning_mode: LearningMode::Progression,
            question_count: default_question_count(),
            content_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String { "warn".to_string() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}
