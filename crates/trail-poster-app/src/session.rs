//! Session persistence between runs
//!
//! The web flow hands config, geometry and bounds from page to page under
//! well-known keys; the CLI mirrors that with a [`SessionStore`] trait and a
//! single-JSON-file backend. Values are stored as serialized strings and the
//! structured helpers below layer serde on top. A missing key is never an
//! error: callers fall back to the sample trail.

use serde::{Serialize, de::DeserializeOwned};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use trail_poster_lib::catalog::PosterConfig;
use trail_poster_lib::track::{self, ParsedTrail, TrailBounds, TrailGeometry};

pub const KEY_POSTER_CONFIG: &str = "posterConfig";
pub const KEY_TRAIL_GEOMETRY: &str = "trailGeoJSON";
pub const KEY_TRAIL_BOUNDS: &str = "trailBounds";
pub const KEY_GPX_CONTENT: &str = "gpxContent";
pub const KEY_GPX_FILE_NAME: &str = "gpxFileName";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// String key/value storage; higher-level helpers build on these primitives.
pub trait SessionStore {
    /// Store a string value for a key.
    fn set_string(&self, key: &str, value: &str) -> SessionResult<()>;

    /// Read a string value for a key. Returns Ok(None) when key is missing.
    fn get_string(&self, key: &str) -> SessionResult<Option<String>>;

    /// Remove a key (no-op if key does not exist).
    fn remove(&self, key: &str) -> SessionResult<()>;
}

pub fn save_json<T: Serialize>(
    store: &dyn SessionStore,
    key: &str,
    value: &T,
) -> SessionResult<()> {
    let json = serde_json::to_string(value).map_err(|e| SessionError::Json(e.to_string()))?;
    store.set_string(key, &json)
}

pub fn load_json<T: DeserializeOwned>(
    store: &dyn SessionStore,
    key: &str,
) -> SessionResult<Option<T>> {
    match store.get_string(key)? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| SessionError::Json(e.to_string())),
        None => Ok(None),
    }
}

/// Stores all keys in one JSON file: a map of string keys to string values.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_map(&self) -> SessionResult<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| SessionError::Io(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| SessionError::Json(e.to_string()))
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> SessionResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::Io(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(map).map_err(|e| SessionError::Json(e.to_string()))?;
        std::fs::write(&self.path, json).map_err(|e| SessionError::Io(e.to_string()))
    }
}

impl SessionStore for FileStorage {
    fn set_string(&self, key: &str, value: &str) -> SessionResult<()> {
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn get_string(&self, key: &str) -> SessionResult<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn remove(&self, key: &str) -> SessionResult<()> {
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

/// What a render run needs from the session.
pub struct SessionState {
    pub config: PosterConfig,
    pub trail: ParsedTrail,
}

/// Load the persisted session, falling back wherever keys are missing.
///
/// Geometry and bounds restore the trail directly; without them the raw GPX
/// content is re-parsed, and with nothing at all the sample trail is used.
pub fn load_session(store: &dyn SessionStore) -> SessionState {
    let config: PosterConfig = load_json(store, KEY_POSTER_CONFIG)
        .ok()
        .flatten()
        .unwrap_or_default();

    let geometry: Option<TrailGeometry> = load_json(store, KEY_TRAIL_GEOMETRY).ok().flatten();
    let bounds: Option<TrailBounds> = load_json(store, KEY_TRAIL_BOUNDS).ok().flatten();
    let trail = match (geometry, bounds) {
        (Some(geometry), Some(bounds)) => ParsedTrail::from_geometry(geometry, bounds),
        _ => match store.get_string(KEY_GPX_CONTENT).ok().flatten() {
            Some(content) => track::parse_gpx(&content),
            None => {
                tracing::debug!("no session trail data, using the sample trail");
                track::sample_trail()
            }
        },
    };

    SessionState { config, trail }
}

/// Persist everything the next run (or page) needs.
pub fn save_session(
    store: &dyn SessionStore,
    config: &PosterConfig,
    trail: &ParsedTrail,
    gpx_content: Option<&str>,
    gpx_file_name: Option<&str>,
) -> SessionResult<()> {
    save_json(store, KEY_POSTER_CONFIG, config)?;
    save_json(store, KEY_TRAIL_GEOMETRY, &trail.geometry)?;
    save_json(store, KEY_TRAIL_BOUNDS, &trail.bounds)?;
    if let Some(content) = gpx_content {
        store.set_string(KEY_GPX_CONTENT, content)?;
    }
    if let Some(name) = gpx_file_name {
        store.set_string(KEY_GPX_FILE_NAME, name)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trail_poster_lib::track::{ParseOutcome, sample_trail};

    fn scratch_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir()
            .join("trail-poster-tests")
            .join(format!("{}-{}.json", name, std::process::id()));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[test]
    fn test_file_storage_roundtrip() {
        let storage = FileStorage::new(scratch_file("roundtrip"));
        assert_eq!(storage.get_string("missing").unwrap(), None);

        storage.set_string("a", "1").unwrap();
        storage.set_string("b", "2").unwrap();
        assert_eq!(storage.get_string("a").unwrap().as_deref(), Some("1"));

        storage.remove("a").unwrap();
        assert_eq!(storage.get_string("a").unwrap(), None);
        assert_eq!(storage.get_string("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_empty_session_falls_back_to_sample() {
        let storage = FileStorage::new(scratch_file("empty"));
        let state = load_session(&storage);
        assert_eq!(state.trail.outcome, ParseOutcome::FellBackToSample);
        assert_eq!(state.config, PosterConfig::default());
    }

    #[test]
    fn test_session_roundtrip_restores_trail_and_config() {
        let storage = FileStorage::new(scratch_file("full"));
        let trail = sample_trail();
        let mut config = PosterConfig::default();
        config.title = "Skyline Ridge".to_string();
        save_session(&storage, &config, &trail, None, Some("skyline.gpx")).unwrap();

        let state = load_session(&storage);
        assert_eq!(state.config.title, "Skyline Ridge");
        assert_eq!(state.trail.geometry, trail.geometry);
        assert_eq!(state.trail.bounds, trail.bounds);
        assert_eq!(state.trail.stats, trail.stats);
        assert_eq!(
            storage.get_string(KEY_GPX_FILE_NAME).unwrap().as_deref(),
            Some("skyline.gpx")
        );
    }

    #[test]
    fn test_partial_session_reparses_gpx_content() {
        let storage = FileStorage::new(scratch_file("partial"));
        let gpx = "<gpx><trkpt lat=\"37.0\" lon=\"-122.0\"/><trkpt lat=\"37.01\" lon=\"-122.0\"/></gpx>";
        storage.set_string(KEY_GPX_CONTENT, gpx).unwrap();

        // Geometry/bounds keys absent: the stored raw GPX is parsed instead
        let state = load_session(&storage);
        assert_eq!(state.trail.outcome, ParseOutcome::Parsed);
        assert_eq!(state.trail.geometry.coordinates.len(), 2);
    }
}
