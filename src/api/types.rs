//! Typed views of the backend's REST resources

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub message_count: i64,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<String>,
}

/// A document passage an answer was grounded on
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    pub file_id: i64,
    pub file_name: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub chunk_id: Option<String>,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub similarity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub source_refs: Vec<Value>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationDetail {
    pub conversation: Conversation,
    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Answer of the non-streaming question endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub message_id: i64,
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    pub file_id: i64,
    pub filename: String,
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: i64,
    pub filename: String,
    pub original_filename: String,
    pub file_type: String,
    pub size: i64,
    pub status: String,
    #[serde(default)]
    pub page_count: Option<i64>,
    #[serde(default)]
    pub chunk_count: i64,
    pub created_at: String,
    #[serde(default)]
    pub indexed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileList {
    pub files: Vec<FileInfo>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}

/// Body of `POST /feedback/messages/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackRequest {
    /// `positive` or `negative`
    pub feedback_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default)]
    pub issue_tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub message_id: i64,
    pub feedback_type: String,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub issue_tags: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackStats {
    pub total_feedbacks: i64,
    pub positive_count: i64,
    pub negative_count: i64,
    pub satisfaction_rate: f64,
    pub average_rating: f64,
    #[serde(default)]
    pub issue_tag_counts: BTreeMap<String, i64>,
}

/// One row of the daily feedback trend; the backend adds fields freely
pub type DailyFeedback = Value;

/// One unresolved negative feedback entry
pub type NegativeFeedback = Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStats {
    pub total_users: i64,
    pub total_files: i64,
    pub total_conversations: i64,
    pub total_messages: i64,
    pub total_storage_bytes: i64,
}

impl std::fmt::Display for SystemStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== System Stats ===")?;
        writeln!(f, "Users: {}", self.total_users)?;
        writeln!(f, "Files: {}", self.total_files)?;
        writeln!(f, "Conversations: {}", self.total_conversations)?;
        writeln!(f, "Messages: {}", self.total_messages)?;
        writeln!(
            f,
            "Storage: {:.1} MiB",
            self.total_storage_bytes as f64 / (1024.0 * 1024.0)
        )?;
        Ok(())
    }
}

impl std::fmt::Display for FeedbackStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Feedback ===")?;
        writeln!(
            f,
            "Total: {} ({} positive / {} negative)",
            self.total_feedbacks, self.positive_count, self.negative_count
        )?;
        writeln!(f, "Satisfaction: {:.1}%", self.satisfaction_rate * 100.0)?;
        writeln!(f, "Average rating: {:.2}", self.average_rating)?;
        for (tag, count) in &self.issue_tag_counts {
            writeln!(f, "  {}: {}", tag, count)?;
        }
        Ok(())
    }
}
