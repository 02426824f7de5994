use std::fs;
use std::path::{Path, PathBuf};

use layers::LayerOptions;
use scene::DataSource;
use tracing::debug;

use crate::geojson::{GeoJsonError, data_from_geojson_str};

#[derive(Debug)]
pub enum LoadError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    GeoJson {
        path: PathBuf,
        source: GeoJsonError,
    },
    Options {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io { path, source } => write!(f, "failed to read {}: {source}", path.display()),
            LoadError::GeoJson { path, source } => write!(f, "failed to parse {}: {source}", path.display()),
            LoadError::Options { path, source } => {
                write!(f, "invalid layer options in {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io { source, .. } => Some(source),
            LoadError::GeoJson { source, .. } => Some(source),
            LoadError::Options { source, .. } => Some(source),
        }
    }
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_geojson(path: impl AsRef<Path>) -> Result<DataSource, LoadError> {
    let path = path.as_ref();
    let data = data_from_geojson_str(&read(path)?).map_err(|source| LoadError::GeoJson {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "geojson loaded");
    Ok(data)
}

/// Unknown keys are rejected.
pub fn options_from_str(payload: &str) -> Result<LayerOptions, serde_json::Error> {
    serde_json::from_str(payload)
}

pub fn load_options(path: impl AsRef<Path>) -> Result<LayerOptions, LoadError> {
    let path = path.as_ref();
    options_from_str(&read(path)?).map_err(|source| LoadError::Options {
        path: path.to_path_buf(),
        source,
    })
}
