//! User options, read from `config.yaml` in the collection folder.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::errors::Result;
use crate::specific_fail;
use crate::utils::find_collection_folder;

pub const CONFIG_FILE: &str = "config.yaml";

/// Options read from `config.yaml` next to the collection files
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    /// field that keeps a note's id from before its first renumbering
    pub backup_field: Option<String>,
    /// field that shows a note's id
    pub display_id_field: Option<String>,
    /// write the final id into `display_id_field` of notes created by a run
    pub overwrite_display_id: bool,
    /// reposition new cards to follow the new note order
    pub reposition: bool,
    pub ask_confirmation: bool,
    /// ask before organizing more cards than this; 0 turns the warning off
    pub card_count_warning: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            backup_field: Some("Original NID".to_string()),
            display_id_field: Some("Note ID".to_string()),
            overwrite_display_id: false,
            reposition: false,
            ask_confirmation: true,
            card_count_warning: 1000,
        }
    }
}

impl Config {
    pub fn from_path(path: &Path) -> Result<Config> {
        if !path.is_file() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }
        let mut contents = String::new();
        File::open(path)?.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(Config::default());
        }
        match serde_yaml::from_str(&contents) {
            Ok(c) => Ok(c),
            Err(e) => specific_fail!(format!("invalid YAML in {}: {}", path.display(), e)),
        }
    }

    /// load `config.yaml` from the collection folder
    pub fn load(collection_folder: &Option<String>) -> Result<Config> {
        let folder = find_collection_folder(collection_folder)?;
        Config::from_path(&folder.join(CONFIG_FILE))
    }

    pub fn backup_field(&self) -> Option<&str> {
        self.backup_field.as_deref().filter(|f| !f.is_empty())
    }

    pub fn display_id_field(&self) -> Option<&str> {
        self.display_id_field.as_deref().filter(|f| !f.is_empty())
    }
}
