//! Administration endpoints

use super::{ApiClient, ApiError, SystemStats};
use serde_json::{json, Value};

impl ApiClient {
    pub async fn system_stats(&self) -> Result<SystemStats, ApiError> {
        self.get("/admin/stats").await
    }

    /// Queue a file for re-indexing
    pub async fn reindex_file(&self, file_id: i64) -> Result<Value, ApiError> {
        self.post("/admin/reindex", &json!({ "file_id": file_id }))
            .await
    }
}
