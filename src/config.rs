use std::path::{Path, PathBuf};
use std::time::Duration;

use anvil_engine::graph::IslandParams;
use anvil_engine::storage::{DiskStorage, FileStorage};
use serde::{Deserialize, Serialize};

use crate::cli_args::Args;
use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Where the graph is loaded from and saved to.
    pub graph_path: PathBuf,
    /// The generation service endpoint.
    pub service_url: String,
    /// Generated world positions are divided by this before they reach the
    /// scene.
    pub distance_scalar: f32,
    /// Uniform scale applied to generated meshes.
    pub terrain_scale: f32,
    /// Write the graph after every edit.
    pub auto_save: bool,
    /// Request new terrain after every edit.
    pub auto_generate: bool,
    /// Shape of newly created islands.
    pub default_island: IslandParams,
    /// Zero disables the timeout.
    pub request_timeout_secs: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            graph_path: PathBuf::from("anvil_graph.json"),
            service_url: "http://127.0.0.1:105/Generate/".into(),
            distance_scalar: 10.0,
            terrain_scale: 7.0,
            auto_save: true,
            auto_generate: false,
            default_island: IslandParams::default(),
            request_timeout_secs: 30,
        }
    }
}

impl EditorConfig {
    pub fn from_ron(data: &str) -> Result<Self> {
        ron::from_str(data).context("Could not parse editor settings")
    }

    /// Reads the settings at `path`. Without a path, or when the file does
    /// not exist, the defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(&DiskStorage, path)
    }

    pub fn load_from(storage: &impl FileStorage, path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        match storage.read_text(path)? {
            Some(data) => {
                Self::from_ron(&data).with_context(|| format!("In {}", path.display()))
            }
            None => {
                log::warn!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    pub fn with_overrides(mut self, args: &Args) -> Self {
        if let Some(graph) = &args.graph {
            self.graph_path = graph.clone();
        }
        if let Some(url) = &args.url {
            self.service_url = url.clone();
        }
        if args.no_auto_save {
            self.auto_save = false;
        }
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use anvil_engine::storage::MemoryStorage;
    use clap::Parser;

    #[test]
    fn missing_fields_use_defaults() {
        let config = EditorConfig::from_ron(
            r#"(
                service_url: "http://localhost:8000/Generate/",
                default_island: (width: 250.0),
            )"#,
        )
        .unwrap();
        assert_eq!(config.service_url, "http://localhost:8000/Generate/");
        assert_eq!(config.default_island.width, 250.0);
        assert_eq!(config.default_island.length, 100.0);
        assert_eq!(config.graph_path, PathBuf::from("anvil_graph.json"));
        assert_eq!(config.distance_scalar, 10.0);
        assert!(config.auto_save);
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let storage = MemoryStorage::new();
        let config = EditorConfig::load_from(&storage, Some(Path::new("nope.ron"))).unwrap();
        assert_eq!(config, EditorConfig::default());
    }

    #[test]
    fn broken_file_is_an_error() {
        let storage = MemoryStorage::with_file("anvil.ron", "(auto_save: maybe)");
        assert!(EditorConfig::load_from(&storage, Some(Path::new("anvil.ron"))).is_err());
    }

    #[test]
    fn command_line_wins() {
        let args = Args::try_parse_from([
            "anvil_editor",
            "--graph",
            "other.json",
            "--url",
            "http://example.test/Generate/",
            "--no-auto-save",
            "show",
        ])
        .unwrap();
        let config = EditorConfig::default().with_overrides(&args);
        assert_eq!(config.graph_path, PathBuf::from("other.json"));
        assert_eq!(config.service_url, "http://example.test/Generate/");
        assert!(!config.auto_save);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
    }
}
