//! Document upload and management endpoints

use super::{ApiClient, ApiError, FileInfo, FileList, FileUpload};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::debug;

/// Bytes handed to the transport per progress tick
const UPLOAD_CHUNK: usize = 64 * 1024;

/// Filters for the file listing
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ApiClient {
    /// Upload a document. `on_progress` receives the percentage of the body
    /// handed to the transport so far.
    pub async fn upload_file<F>(&self, path: &Path, on_progress: F) -> Result<FileUpload, ApiError>
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        let data = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let total = data.len() as u64;
        debug!("Uploading {} ({} bytes)", file_name, total);

        let chunks: Vec<Vec<u8>> = data.chunks(UPLOAD_CHUNK).map(|c| c.to_vec()).collect();
        let mut sent = 0u64;
        let stream = futures_util::stream::iter(chunks.into_iter().map(move |chunk| {
            sent += chunk.len() as u64;
            on_progress(percent(sent, total));
            Ok::<_, std::io::Error>(chunk)
        }));

        let part = Part::stream_with_length(Body::wrap_stream(stream), total).file_name(file_name);
        let form = Form::new().part("file", part);

        self.send_json(self.request(Method::POST, "/files/").multipart(form))
            .await
    }

    pub async fn list_files(&self, query: &FileQuery) -> Result<FileList, ApiError> {
        self.get_with("/files/", query).await
    }

    pub async fn get_file(&self, file_id: i64) -> Result<FileInfo, ApiError> {
        self.get(&format!("/files/{}", file_id)).await
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<Value, ApiError> {
        self.delete(&format!("/files/{}", file_id)).await
    }

    /// Indexing status of a file
    pub async fn file_status(&self, file_id: i64) -> Result<Value, ApiError> {
        self.get(&format!("/files/{}/status", file_id)).await
    }
}

fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((done * 100) / total).min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent() {
        assert_eq!(percent(0, 0), 100);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(3, 3), 100);
    }

    #[test]
    fn test_file_query_skips_unset() {
        let query = FileQuery {
            page: Some(2),
            ..Default::default()
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, serde_json::json!({"page": 2}));
    }
}
