//! Boundary GeoJSON files, one per administrative level.

use std::path::{Path, PathBuf};

use catalog::project::AdminLevel;
use formats::boundary::{BoundaryCollection, BoundaryError};

#[derive(Debug)]
pub enum BoundaryLoadError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: BoundaryError },
}

impl std::fmt::Display for BoundaryLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BoundaryLoadError::Io { path, source } => write!(f, "{}: {source}", path.display()),
            BoundaryLoadError::Parse { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for BoundaryLoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BoundaryLoadError::Io { source, .. } => Some(source),
            BoundaryLoadError::Parse { source, .. } => Some(source),
        }
    }
}

/// `district.json`, `dun.json`, `parliament.json`.
pub fn boundary_path(dir: &Path, level: AdminLevel) -> PathBuf {
    dir.join(format!("{}.json", level.as_str()))
}

pub async fn load_boundary(
    dir: &Path,
    level: AdminLevel,
) -> Result<BoundaryCollection, BoundaryLoadError> {
    let path = boundary_path(dir, level);
    let text = match tokio::fs::read_to_string(&path).await {
        Ok(text) => text,
        Err(source) => return Err(BoundaryLoadError::Io { path, source }),
    };
    BoundaryCollection::from_geojson_str(&text).map_err(|source| BoundaryLoadError::Parse { path, source })
}
