//! Writes exported transcripts and downloaded documents to disk.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::viewer::pdf::DownloadRequest;

/// Saves files into one export directory without overwriting
#[derive(Debug, Clone)]
pub struct Exporter {
    dir: PathBuf,
    client: reqwest::Client,
    timeout: Duration,
}

impl Exporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// First free path for `file_name`: `name.ext`, then `name (1).ext`, ...
    pub async fn unique_path(&self, file_name: &str) -> PathBuf {
        let candidate = self.dir.join(file_name);
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }

        let path = Path::new(file_name);
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| file_name.to_string());
        let extension = path.extension().map(|e| e.to_string_lossy().to_string());

        let mut n = 1;
        loop {
            let name = match &extension {
                Some(ext) => format!("{} ({}).{}", stem, n, ext),
                None => format!("{} ({})", stem, n),
            };
            let candidate = self.dir.join(name);
            if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Write `contents` under `file_name`
    pub async fn save_text(&self, file_name: &str, contents: &str) -> Result<PathBuf> {
        self.save_bytes(file_name, contents.as_bytes()).await
    }

    /// Fetch the document behind `request` and save it under its file name
    pub async fn save_download(&self, request: &DownloadRequest) -> Result<PathBuf> {
        let bytes = if request.url.starts_with("http://") || request.url.starts_with("https://") {
            let response = self
                .client
                .get(&request.url)
                .timeout(self.timeout)
                .send()
                .await
                .with_context(|| format!("Failed to download {}", request.url))?;

            if !response.status().is_success() {
                bail!("Download of {} failed: {}", request.url, response.status());
            }

            response
                .bytes()
                .await
                .context("Failed to read download body")?
                .to_vec()
        } else {
            let path = request.url.strip_prefix("file://").unwrap_or(&request.url);
            tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path))?
        };

        self.save_bytes(&request.file_name, &bytes).await
    }

    async fn save_bytes(&self, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create export directory {}", self.dir.display()))?;

        let path = self.unique_path(file_name).await;
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;

        info!(path = %path.display(), bytes = bytes.len(), "Exported file");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_text_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path().join("exports"));

        let first = exporter.save_text("transcript.txt", "one").await.unwrap();
        let second = exporter.save_text("transcript.txt", "two").await.unwrap();

        assert_eq!(first.file_name().unwrap(), "transcript.txt");
        assert_eq!(second.file_name().unwrap(), "transcript (1).txt");
        assert_eq!(std::fs::read_to_string(first).unwrap(), "one");
        assert_eq!(std::fs::read_to_string(second).unwrap(), "two");
    }

    #[tokio::test]
    async fn test_save_download_copies_local_file() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("source.pdf");
        std::fs::write(&source, b"%PDF-1.4 test").unwrap();

        let exporter = Exporter::new(dir.path().join("out"));
        let request = DownloadRequest {
            url: format!("file://{}", source.display()),
            file_name: "document.pdf".to_string(),
        };

        let saved = exporter.save_download(&request).await.unwrap();
        assert_eq!(saved.file_name().unwrap(), "document.pdf");
        assert_eq!(std::fs::read(saved).unwrap(), b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn test_save_download_missing_source() {
        let dir = TempDir::new().unwrap();
        let exporter = Exporter::new(dir.path());
        let request = DownloadRequest {
            url: "/no/such/file.pdf".to_string(),
            file_name: "document.pdf".to_string(),
        };

        assert!(exporter.save_download(&request).await.is_err());
    }
}
