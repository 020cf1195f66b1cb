use std::io;
use std::path::{Path, PathBuf};

use crate::core::config::Settings;

/// Filesystem-backed store for raw uploads and derived images.
#[derive(Debug, Clone)]
pub(crate) struct ImageStore {
    upload_dir: PathBuf,
    processed_dir: PathBuf,
}

impl ImageStore {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.storage().upload_dir, &settings.storage().processed_dir)
    }

    pub(crate) fn new(
        upload_dir: impl Into<PathBuf>,
        processed_dir: impl Into<PathBuf>,
    ) -> Self {
        Self { upload_dir: upload_dir.into(), processed_dir: processed_dir.into() }
    }

    pub(crate) async fn ensure_dirs(&self) -> io::Result<()> {
        tokio::fs::create_dir_all(&self.upload_dir).await?;
        tokio::fs::create_dir_all(&self.processed_dir).await?;
        Ok(())
    }

    /// Reads raw bytes from a path recorded on a job row.
    pub(crate) async fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        tokio::fs::read(path).await
    }

    /// Writes normalized bytes under the processed root, named after the
    /// original upload. Returns the stored path for the job record.
    pub(crate) async fn write_normalized(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> io::Result<String> {
        tokio::fs::create_dir_all(&self.processed_dir).await?;
        let path = self.processed_dir.join(normalized_name(filename));
        tokio::fs::write(&path, bytes).await?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn normalized_name(filename: &str) -> String {
    let stem = Path::new(filename).file_stem().and_then(|stem| stem.to_str()).unwrap_or("image");
    format!("normalized_{stem}.png")
}
