//! Read-only track catalog
//!
//! The library scanner writes `<data_dir>/library.json`; the player only
//! reads it to put titles, artists and cover art on now-playing messages.
//!
//! A missing or malformed catalog is never fatal: the player starts with an
//! empty catalog and falls back to whatever metadata the client sends.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the scanner's output inside the data directory
pub const LIBRARY_FILE: &str = "library.json";

/// Metadata for one playable track
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CatalogEntry {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Absolute path of the album cover, if the album has one
    pub cover_path: Option<PathBuf>,
}

/// Lookup from raw track reference to catalog metadata
pub trait CatalogReader: Send + Sync {
    fn lookup(&self, reference: &str) -> Option<CatalogEntry>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Deserialize)]
struct AlbumRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    artist: String,
    #[serde(default)]
    cover_url: Option<String>,
    #[serde(default)]
    discs: Vec<DiscRecord>,
}

#[derive(Debug, Deserialize)]
struct DiscRecord {
    #[serde(default)]
    tracks: Vec<TrackRecord>,
}

#[derive(Debug, Deserialize)]
struct TrackRecord {
    #[serde(default)]
    title: String,
    #[serde(default)]
    file_path: Option<String>,
    /// Streaming albums carry a URI instead of a path
    #[serde(default)]
    uri: Option<String>,
}

/// Catalog backed by the scanner's JSON output
#[derive(Debug, Default)]
pub struct JsonCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl JsonCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load `<data_dir>/library.json`.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(LIBRARY_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No catalog at {}, starting with an empty catalog", path.display());
                return Self::empty();
            }
            Err(e) => {
                warn!("Failed to read catalog {}: {}", path.display(), e);
                return Self::empty();
            }
        };
        match Self::parse(&content, data_dir) {
            Ok(catalog) => {
                info!("Loaded catalog with {} tracks", catalog.entries.len());
                catalog
            }
            Err(e) => {
                warn!("Malformed catalog {}: {}", path.display(), e);
                Self::empty()
            }
        }
    }

    /// Parse catalog JSON; cover URLs resolve under `data_dir`.
    pub fn parse(content: &str, data_dir: &Path) -> serde_json::Result<Self> {
        let albums: Vec<AlbumRecord> = serde_json::from_str(content)?;
        let mut entries = HashMap::new();

        for album in albums {
            let cover_path = album
                .cover_url
                .as_deref()
                .filter(|url| !url.is_empty())
                .map(|url| data_dir.join(url.trim_start_matches('/')));

            for track in album.discs.into_iter().flat_map(|disc| disc.tracks) {
                let Some(reference) = track.file_path.or(track.uri) else {
                    debug!("Catalog track '{}' has no file_path or uri", track.title);
                    continue;
                };
                entries.insert(
                    reference,
                    CatalogEntry {
                        title: track.title,
                        artist: album.artist.clone(),
                        album: album.title.clone(),
                        cover_path: cover_path.clone(),
                    },
                );
            }
        }

        Ok(Self { entries })
    }
}

impl CatalogReader for JsonCatalog {
    fn lookup(&self, reference: &str) -> Option<CatalogEntry> {
        self.entries.get(reference).cloned()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
