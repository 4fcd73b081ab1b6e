//! Settings collaborator: credential, destination database, and the AI
//! enhancement switch. Read-only input to the pipeline.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_AI_BASE_URL: &str = "http://localhost:1234/v1";
pub const DEFAULT_AI_MODEL: &str = "deepseek-r1-distill-llama-8b";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub notion_token: String,
    pub database_id: String,
    #[serde(default)]
    pub enhance_ai: bool,
    #[serde(default = "default_ai_base_url")]
    pub ai_base_url: String,
    #[serde(default = "default_ai_model")]
    pub ai_model: String,
}

fn default_ai_base_url() -> String {
    DEFAULT_AI_BASE_URL.to_string()
}

fn default_ai_model() -> String {
    DEFAULT_AI_MODEL.to_string()
}

impl Settings {
    pub fn default_path() -> PathBuf {
        // Use XDG config directory or fallback
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "stash") {
            proj_dirs.config_dir().join("settings.json")
        } else {
            PathBuf::from("stash-settings.json")
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let raw = fs::read_to_string(path).with_context(|| {
            format!(
                "Failed to read settings from {}. Run 'stash setup' first.",
                path.display()
            )
        })?;
        let mut settings: Settings =
            serde_json::from_str(&raw).context("Failed to parse the settings file")?;

        // The token can live in the environment instead of on disk.
        if let Ok(token) = std::env::var("NOTION_TOKEN") {
            if !token.trim().is_empty() {
                settings.notion_token = token.trim().to_string();
            }
        }
        Ok(settings)
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::default_path();
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(self)?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }
}
