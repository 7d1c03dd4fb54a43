//! Directory-backed image library

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use shared::{run_debug, ImageId, RunId};

use crate::error::{PosterError, PosterResult};
use crate::traits::CandidateSource;

/// File extensions treated as candidate images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Candidate pool made of the image files directly inside one directory
pub struct DirectoryLibrary {
    root: PathBuf,
}

impl DirectoryLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn library_error(&self, operation: &str, path: &Path, source: std::io::Error) -> PosterError {
        PosterError::Library {
            operation: operation.to_string(),
            path: path.to_path_buf(),
            source,
        }
    }

    /// Resolve an identifier to its path, refusing anything outside the root
    pub fn image_path(&self, id: &ImageId) -> PosterResult<PathBuf> {
        let name = id.as_str();
        if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
            return Err(PosterError::malformed(name, "not a plain file name"));
        }
        Ok(self.root.join(name))
    }
}

/// Whether a file name looks like a candidate image
pub fn is_candidate_name(name: &str) -> bool {
    if name.starts_with('.') {
        return false;
    }
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|allowed| ext.eq_ignore_ascii_case(allowed))
        })
        .unwrap_or(false)
}

#[async_trait]
impl CandidateSource for DirectoryLibrary {
    async fn list_candidates(&self) -> PosterResult<Vec<ImageId>> {
        let mut reader = fs::read_dir(&self.root)
            .await
            .map_err(|e| self.library_error("read_dir", &self.root, e))?;

        let mut candidates = Vec::new();
        while let Some(entry) = reader
            .next_entry()
            .await
            .map_err(|e| self.library_error("read_dir", &self.root, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| self.library_error("stat", &entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            // Non-UTF-8 names cannot round-trip through the ledger
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if is_candidate_name(&name) {
                candidates.push(ImageId::new(name));
            }
        }

        candidates.sort();
        run_debug!(
            RunId::current(),
            "🖼️ Found {} candidate images in {}",
            candidates.len(),
            self.root.display()
        );
        Ok(candidates)
    }

    async fn read_image(&self, id: &ImageId) -> PosterResult<Vec<u8>> {
        let path = self.image_path(id)?;
        fs::read(&path)
            .await
            .map_err(|e| self.library_error("read", &path, e))
    }
}
