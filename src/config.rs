use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::protocol::DEFAULT_PORT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub listen_address: String,
    pub audio_directory: PathBuf,
    pub auto_create_directories: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_address: format!("0.0.0.0:{}", DEFAULT_PORT),
            audio_directory: PathBuf::from("audio_files"),
            auto_create_directories: true,
        }
    }
}

impl ServerConfig {
    pub fn load_or_create(config_path: Option<&str>) -> Result<Self> {
        let config_file = config_path.unwrap_or("clipd.toml");

        if std::path::Path::new(config_file).exists() {
            let content = std::fs::read_to_string(config_file)?;
            let config: ServerConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save(config_file)?;
            Ok(config)
        }
    }

    pub fn save(&self, config_path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        if self.auto_create_directories && !self.audio_directory.exists() {
            std::fs::create_dir_all(&self.audio_directory)?;
            tracing::info!(
                "created audio directory: {}",
                self.audio_directory.display()
            );
        }
        Ok(())
    }
}
