//! The catalog: an immutable-after-startup table of playable audio files.
//!
//! Built once by scanning the audio directory through the engine's probe,
//! then shared read-only with every session. There is no refresh path, which
//! is what makes lock-free sharing safe.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::audio::AudioEngine;

/// Extensions the catalog scan admits.
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "ogg", "flac"];

/// Name of the snapshot artifact written into the audio directory.
pub const SNAPSHOT_FILE: &str = "metadata.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub filename: String,
    pub duration_sec: f64,
    pub format: String,
}

#[derive(Debug, Default)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    /// Scan `audio_dir` and probe every supported file. A missing directory
    /// is created and yields an empty catalog; a file the engine cannot read
    /// is logged and skipped, never aborting the scan.
    pub async fn build(audio_dir: &Path, engine: &dyn AudioEngine) -> anyhow::Result<Catalog> {
        if !audio_dir.exists() {
            warn!("audio directory {} not found, creating it", audio_dir.display());
            std::fs::create_dir_all(audio_dir)?;
            return Ok(Catalog::default());
        }

        let mut entries = Vec::new();
        for dir_entry in std::fs::read_dir(audio_dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(format) = supported_format(&path) else {
                continue;
            };

            match engine.probe(&path).await {
                Ok(duration_sec) => {
                    entries.push(CatalogEntry {
                        filename: filename.to_string(),
                        duration_sec: round_centis(duration_sec),
                        format,
                    });
                }
                Err(err) => error!("skipping '{}': {}", filename, err),
            }
        }

        // read_dir order is platform-dependent; sort so LIST and the
        // snapshot artifact are deterministic.
        entries.sort_by(|a, b| a.filename.cmp(&b.filename));
        info!("catalog built with {} entries", entries.len());

        Ok(Catalog { entries })
    }

    #[cfg(test)]
    pub fn from_entries(entries: Vec<CatalogEntry>) -> Catalog {
        Catalog { entries }
    }

    pub fn lookup(&self, filename: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.filename == filename)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist the entry list as pretty JSON inside the audio directory.
    /// Informational artifact only; the running server never reads it back,
    /// and a write failure is not fatal.
    pub fn write_snapshot(&self, audio_dir: &Path) {
        let path = audio_dir.join(SNAPSHOT_FILE);
        match serde_json::to_string_pretty(&self.entries) {
            Ok(json) => match std::fs::write(&path, json) {
                Ok(()) => info!("catalog snapshot saved to {}", path.display()),
                Err(err) => error!("failed to write catalog snapshot {}: {}", path.display(), err),
            },
            Err(err) => error!("failed to serialize catalog snapshot: {}", err),
        }
    }
}

fn supported_format(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

fn round_centis(seconds: f64) -> f64 {
    (seconds * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use async_trait::async_trait;

    struct StubEngine;

    #[async_trait]
    impl AudioEngine for StubEngine {
        async fn probe(&self, path: &Path) -> anyhow::Result<f64> {
            if path.to_string_lossy().contains("corrupt") {
                anyhow::bail!("unreadable stream");
            }
            Ok(12.3456)
        }

        async fn extract(
            &self,
            _path: &Path,
            _start_ms: u64,
            _end_ms: u64,
        ) -> anyhow::Result<Vec<u8>> {
            Ok(vec![0u8; 4])
        }
    }

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, b"x").unwrap();
        path
    }

    #[tokio::test]
    async fn build_scans_only_supported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "b.mp3");
        touch(dir.path(), "a.wav");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "cover.jpg");
        touch(dir.path(), "c.FLAC");

        let catalog = Catalog::build(dir.path(), &StubEngine).await.unwrap();
        let names: Vec<&str> = catalog.entries().iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(names, ["a.wav", "b.mp3", "c.FLAC"]);
        assert_eq!(catalog.entries()[0].format, "wav");
        assert_eq!(catalog.entries()[2].format, "flac");
    }

    #[tokio::test]
    async fn build_rounds_durations_to_centiseconds() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.wav");

        let catalog = Catalog::build(dir.path(), &StubEngine).await.unwrap();
        assert_eq!(catalog.entries()[0].duration_sec, 12.35);
    }

    #[tokio::test]
    async fn build_skips_files_the_engine_rejects() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "good.wav");
        touch(dir.path(), "corrupt.wav");

        let catalog = Catalog::build(dir.path(), &StubEngine).await.unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.lookup("good.wav").is_some());
        assert!(catalog.lookup("corrupt.wav").is_none());
    }

    #[tokio::test]
    async fn build_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("library");

        let catalog = Catalog::build(&missing, &StubEngine).await.unwrap();
        assert!(catalog.is_empty());
        assert!(missing.is_dir());
    }

    #[tokio::test]
    async fn snapshot_is_valid_json() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.wav");

        let catalog = Catalog::build(dir.path(), &StubEngine).await.unwrap();
        catalog.write_snapshot(dir.path());

        let raw = std::fs::read_to_string(dir.path().join(SNAPSHOT_FILE)).unwrap();
        let parsed: Vec<CatalogEntry> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed, catalog.entries());
    }

    #[test]
    fn lookup_is_exact_match() {
        let catalog = Catalog::from_entries(vec![CatalogEntry {
            filename: "a.wav".to_string(),
            duration_sec: 10.0,
            format: "wav".to_string(),
        }]);
        assert!(catalog.lookup("a.wav").is_some());
        assert!(catalog.lookup("A.wav").is_none());
        assert!(catalog.lookup("a").is_none());
    }
}
