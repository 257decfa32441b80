//! Boundary to the mail client that owns the compose window

use crate::ai::error::{AssistError, AssistResult};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Async access to the draft being composed
#[async_trait]
pub trait MailHost: Send + Sync {
    /// Current compose body as HTML
    async fn get_body_html(&self) -> AssistResult<String>;

    /// Replace the whole compose body
    async fn set_body_html(&self, html: &str) -> AssistResult<()>;

    async fn set_subject(&self, subject: &str) -> AssistResult<()>;
}

/// Host backed by an HTML file; the subject goes to `<file>.subject`
#[derive(Debug, Clone)]
pub struct FileHost {
    path: PathBuf,
}

impl FileHost {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subject_path(&self) -> PathBuf {
        self.sibling("subject")
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(extension);
        PathBuf::from(name)
    }

    /// Write through a temporary file so a failed write never leaves half a body
    async fn replace_file(&self, target: &Path, contents: &str) -> AssistResult<()> {
        let staging = self.sibling("tmp");
        tokio::fs::write(&staging, contents).await.map_err(|e| {
            AssistError::host_write(format!("Failed to write {}: {}", staging.display(), e))
        })?;
        if let Err(e) = tokio::fs::rename(&staging, target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(AssistError::host_write(format!(
                "Failed to replace {}: {}",
                target.display(),
                e
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MailHost for FileHost {
    async fn get_body_html(&self) -> AssistResult<String> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AssistError::host_read(format!("Failed to read {}: {}", self.path.display(), e))
        })
    }

    async fn set_body_html(&self, html: &str) -> AssistResult<()> {
        self.replace_file(&self.path, html).await?;
        tracing::debug!("Wrote {} bytes to {}", html.len(), self.path.display());
        Ok(())
    }

    async fn set_subject(&self, subject: &str) -> AssistResult<()> {
        let target = self.subject_path();
        self.replace_file(&target, subject).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_read_write_body() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("draft.html");
        tokio::fs::write(&path, "<div>Hi</div>").await.unwrap();

        let host = FileHost::new(&path);
        assert_eq!(host.get_body_html().await.unwrap(), "<div>Hi</div>");

        host.set_body_html("<p>Hello</p>").await.unwrap();
        assert_eq!(host.get_body_html().await.unwrap(), "<p>Hello</p>");
        assert!(!dir.path().join("draft.html.tmp").exists());
    }

    #[tokio::test]
    async fn test_subject_goes_to_sibling_file() {
        let dir = tempdir().unwrap();
        let host = FileHost::new(dir.path().join("draft.html"));

        host.set_subject("Re: Budget").await.unwrap();
        assert_eq!(host.subject_path(), dir.path().join("draft.html.subject"));
        assert_eq!(
            tokio::fs::read_to_string(host.subject_path()).await.unwrap(),
            "Re: Budget"
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_a_read_error() {
        let dir = tempdir().unwrap();
        let host = FileHost::new(dir.path().join("missing.html"));
        assert!(matches!(
            host.get_body_html().await,
            Err(AssistError::HostRead { .. })
        ));
    }

    #[tokio::test]
    async fn test_unwritable_location_is_a_write_error() {
        let dir = tempdir().unwrap();
        let host = FileHost::new(dir.path().join("no-such-dir").join("draft.html"));
        assert!(matches!(
            host.set_body_html("<p>x</p>").await,
            Err(AssistError::HostWrite { .. })
        ));
    }
}
