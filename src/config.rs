use crate::drag::DragThreshold;
use crate::session::MAX_BUBBLES_CEILING;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// --- CONSTANTS ---
const DEFAULT_MAX_BUBBLES: usize = 7;
const CONFIG_DIR_NAME: &str = "drag-drop-overlay";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    #[serde(default = "default_max_bubbles")]
    pub max_bubbles: usize,

    // Pixels before a press on a bubble turns into a drag; None = system drag metrics
    #[serde(default)]
    pub drag_threshold: Option<i32>,

    // Closing a bubble keeps its files for the next session unless this is set
    #[serde(default)]
    pub delete_folder_on_close: bool,

    #[serde(default = "default_storage_folder_name")]
    pub storage_folder_name: String,

    #[serde(default)]
    pub window_position: Option<(i32, i32)>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_bubbles() -> usize { DEFAULT_MAX_BUBBLES }
fn default_storage_folder_name() -> String { "DragDropOverlay".to_string() }
fn default_log_level() -> String { "info".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            max_bubbles: default_max_bubbles(),
            drag_threshold: None,
            delete_folder_on_close: false,
            storage_folder_name: default_storage_folder_name(),
            window_position: None,
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// Clamp values a hand-edited file could break.
    pub fn normalized(mut self) -> Self {
        self.max_bubbles = self.max_bubbles.clamp(1, MAX_BUBBLES_CEILING);
        if let Some(px) = self.drag_threshold {
            self.drag_threshold = Some(px.max(0));
        }
        if self.storage_folder_name.trim().is_empty() {
            self.storage_folder_name = default_storage_folder_name();
        }
        self
    }

    /// Records a new strip position. Returns false when nothing changed.
    pub fn update_window_position(&mut self, pos: (i32, i32)) -> bool {
        if self.window_position == Some(pos) {
            return false;
        }
        self.window_position = Some(pos);
        true
    }

    pub fn drag_threshold(&self) -> DragThreshold {
        match self.drag_threshold {
            Some(px) => DragThreshold::uniform(px),
            None => DragThreshold::system(),
        }
    }

    pub fn log_level(&self) -> tracing::Level {
        self.log_level.parse().unwrap_or(tracing::Level::INFO)
    }
}

pub fn get_config_dir() -> PathBuf {
    let config_dir = dirs::config_dir().unwrap_or_default().join(CONFIG_DIR_NAME);
    let _ = std::fs::create_dir_all(&config_dir);
    config_dir
}

pub fn get_config_path() -> PathBuf {
    get_config_dir().join("config.json")
}

pub fn load_config() -> Config {
    load_config_from(&get_config_path())
}

pub fn load_config_from(path: &Path) -> Config {
    if !path.exists() {
        return Config::default();
    }

    let data = std::fs::read_to_string(path).unwrap_or_default();
    let config: Config = match serde_json::from_str(&data) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("ignoring unreadable config {}: {}", path.display(), e);
            Config::default()
        }
    };
    config.normalized()
}

pub fn save_config(config: &Config) {
    if let Err(e) = save_config_to(config, &get_config_path()) {
        tracing::warn!("could not save config: {:#}", e);
    }
}

pub fn save_config_to(config: &Config, path: &Path) -> anyhow::Result<()> {
    let data = serde_json::to_string_pretty(config)?;
    std::fs::write(path, data)?;
    Ok(())
}
