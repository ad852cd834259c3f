//! Conversation export
//!
//! The server renders the document; the client only picks the format,
//! names the file and writes the bytes through an [`ExportSink`].

use crate::api::{ApiClient, ApiError};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

pub const DEFAULT_FILENAME: &str = "conversation-export";

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Export request failed: {0}")]
    Api(#[from] ApiError),

    #[error("Could not save export: {0}")]
    Save(#[from] io::Error),
}

impl ExportError {
    /// Server detail when the server explained the failure
    pub fn detail(&self) -> String {
        match self {
            ExportError::Api(e) => e.detail(),
            ExportError::Save(e) => e.to_string(),
        }
    }
}

/// Document format understood by the export endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Markdown,
    Html,
    Pdf,
    /// Passed through untouched; saved as `.txt`
    Other(String),
}

impl ExportFormat {
    /// Formats offered to the user, in menu order
    pub const AVAILABLE: [ExportFormat; 3] =
        [ExportFormat::Markdown, ExportFormat::Html, ExportFormat::Pdf];

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "markdown" => ExportFormat::Markdown,
            "html" => ExportFormat::Html,
            "pdf" => ExportFormat::Pdf,
            other => ExportFormat::Other(other.to_string()),
        }
    }

    /// Wire name
    pub fn as_str(&self) -> &str {
        match self {
            ExportFormat::Markdown => "markdown",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Other(s) => s,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Html => "html",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Other(_) => "txt",
        }
    }

    pub fn label(&self) -> String {
        match self {
            ExportFormat::Markdown => "Markdown (.md)".to_string(),
            ExportFormat::Html => "HTML (.html)".to_string(),
            ExportFormat::Pdf => "PDF (.pdf)".to_string(),
            ExportFormat::Other(s) => format!("{} (.txt)", s),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `<name>.<ext>`, with path separators in `name` replaced
pub fn export_filename(name: &str, format: &ExportFormat) -> String {
    let name = name.trim();
    let name = if name.is_empty() { DEFAULT_FILENAME } else { name };
    let safe: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.{}", safe, format.extension())
}

/// Where exported documents end up
#[async_trait]
pub trait ExportSink: Send + Sync {
    async fn save(&self, filename: &str, data: &[u8]) -> io::Result<PathBuf>;
}

/// Writes exports into a directory, creating it when missing
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl ExportSink for DirectorySink {
    async fn save(&self, filename: &str, data: &[u8]) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(filename);
        tokio::fs::write(&path, data).await?;
        Ok(path)
    }
}

#[derive(Serialize)]
struct ExportRequest<'a> {
    conversation_id: i64,
    format: &'a str,
}

pub struct ExportService {
    client: Arc<ApiClient>,
    sink: Arc<dyn ExportSink>,
}

impl ExportService {
    pub fn new(client: Arc<ApiClient>, sink: Arc<dyn ExportSink>) -> Self {
        Self { client, sink }
    }

    /// Export a conversation and save it as `<filename>.<ext>`.
    ///
    /// The outcome is also reported through the client's notifier.
    pub async fn export_conversation(
        &self,
        conversation_id: i64,
        format: &ExportFormat,
        filename: Option<&str>,
    ) -> Result<PathBuf, ExportError> {
        let name = export_filename(filename.unwrap_or(DEFAULT_FILENAME), format);
        let notifier = self.client.notifier();

        match self.fetch_and_save(conversation_id, format, &name).await {
            Ok(path) => {
                info!("Exported conversation {} to {}", conversation_id, path.display());
                notifier.success("Export succeeded");
                Ok(path)
            }
            Err(e) => {
                error!("Export of conversation {} failed: {}", conversation_id, e);
                notifier.error(&format!("Export failed: {}", e.detail()));
                Err(e)
            }
        }
    }

    async fn fetch_and_save(
        &self,
        conversation_id: i64,
        format: &ExportFormat,
        filename: &str,
    ) -> Result<PathBuf, ExportError> {
        let request = ExportRequest {
            conversation_id,
            format: format.as_str(),
        };
        let data = self
            .client
            .post_for_bytes("/export/conversation", &request)
            .await?;
        Ok(self.sink.save(filename, &data).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extensions() {
        assert_eq!(export_filename("Report", &ExportFormat::Pdf), "Report.pdf");
        assert_eq!(export_filename("Report", &ExportFormat::Markdown), "Report.md");
        assert_eq!(export_filename("Report", &ExportFormat::Html), "Report.html");
        assert_eq!(
            export_filename("Report", &ExportFormat::parse("unknown")),
            "Report.txt"
        );
    }

    #[test]
    fn test_filename_defaults_and_sanitizing() {
        assert_eq!(
            export_filename("  ", &ExportFormat::default()),
            "conversation-export.md"
        );
        assert_eq!(
            export_filename("../notes\\q1", &ExportFormat::Html),
            ".._notes_q1.html"
        );
    }

    #[test]
    fn test_parse_keeps_unknown_wire_name() {
        assert_eq!(ExportFormat::parse(" markdown "), ExportFormat::Markdown);
        assert_eq!(ExportFormat::parse("docx").as_str(), "docx");
        assert_eq!(ExportFormat::Pdf.label(), "PDF (.pdf)");
        assert_eq!(ExportFormat::AVAILABLE.len(), 3);
    }

    #[test]
    fn test_parse_is_exact_and_case_sensitive() {
        assert_eq!(ExportFormat::parse("PDF"), ExportFormat::Other("PDF".to_string()));
        assert_eq!(ExportFormat::parse("md"), ExportFormat::Other("md".to_string()));
        assert_eq!(
            export_filename("Report", &ExportFormat::parse("PDF")),
            "Report.txt"
        );
    }

    #[tokio::test]
    async fn test_directory_sink_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(tmp.path().join("exports"));

        let path = sink.save("a.md", b"# hi").await.unwrap();

        assert_eq!(path, tmp.path().join("exports").join("a.md"));
        assert_eq!(std::fs::read(&path).unwrap(), b"# hi");
    }
}
