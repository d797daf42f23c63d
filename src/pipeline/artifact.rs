//! Optional persistence of the normalised image for diagnostics.
//!
//! Each request writes its own file, `normalized-<random>.png`, created
//! atomically with `O_EXCL` semantics by [`tempfile`]. Two requests in
//! flight at once can never overwrite or read each other's image.

use crate::error::Doc2TextError;
use crate::raster::BinaryImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes normalised images into a caller-supplied directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist `image` as PNG under a fresh unique name and return its path.
    pub fn save(&self, image: &BinaryImage) -> Result<PathBuf, Doc2TextError> {
        let write_err = |detail: String| Doc2TextError::ArtifactWriteFailed {
            path: self.dir.clone(),
            detail,
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| write_err(e.to_string()))?;
        let png = image.to_png()?;

        let mut file = tempfile::Builder::new()
            .prefix("normalized-")
            .suffix(".png")
            .tempfile_in(&self.dir)
            .map_err(|e| write_err(e.to_string()))?;
        file.write_all(&png).map_err(|e| write_err(e.to_string()))?;

        let (_, path) = file.keep().map_err(|e| write_err(e.to_string()))?;
        debug!("Saved normalised image to {}", path.display());
        Ok(path)
    }
}
