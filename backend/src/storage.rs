use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Uploads above this size are rejected while the multipart stream is read.
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// One stored upload: generated name, absolute location and on-disk size.
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub file_name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Local-disk file storage for uploaded images and rendered reports. Both
/// directories are served verbatim through the static mounts, so anything
/// written here is reachable by generated filename.
#[derive(Clone)]
pub struct LocalStorage {
    upload_dir: PathBuf,
    reports_dir: PathBuf,
}

impl LocalStorage {
    pub fn new(
        upload_dir: impl Into<PathBuf>,
        reports_dir: impl Into<PathBuf>,
    ) -> io::Result<Self> {
        let storage = LocalStorage {
            upload_dir: upload_dir.into(),
            reports_dir: reports_dir.into(),
        };
        std::fs::create_dir_all(&storage.upload_dir)?;
        std::fs::create_dir_all(&storage.reports_dir)?;
        Ok(storage)
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn reports_dir(&self) -> &Path {
        &self.reports_dir
    }

    /// Extension taken from the client filename, lowercased with a leading dot.
    /// Nothing else about the client name is trusted. Defaults to ".jpg".
    pub fn extension_for(file_name: Option<&str>) -> String {
        file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext.to_lowercase()))
            .unwrap_or_else(|| ".jpg".to_string())
    }

    /// Collision-free generated name: uuid4 hex plus the extension.
    pub fn generate_file_name(extension: &str) -> String {
        format!("{}{}", Uuid::new_v4().simple(), extension)
    }

    /// Public URL an upload is served under.
    pub fn public_url(file_name: &str) -> String {
        format!("/uploads/{}", file_name)
    }

    pub async fn save_upload(&self, file_name: &str, data: &[u8]) -> io::Result<StoredFile> {
        let path = self.upload_dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        // Size is taken from disk after the write, not from the request.
        let size_bytes = tokio::fs::metadata(&path).await?.len();
        Ok(StoredFile {
            file_name: file_name.to_string(),
            path,
            size_bytes,
        })
    }

    /// Destination for a classification's rendered report.
    pub fn report_path(&self, classification_id: i64) -> PathBuf {
        self.reports_dir
            .join(format!("reporte_{}.pdf", classification_id))
    }
}
