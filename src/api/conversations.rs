//! Conversation endpoints

use super::{ApiClient, ApiError, Conversation, ConversationDetail, Message, QueryResponse};
use serde_json::{json, Value};

impl ApiClient {
    pub async fn create_conversation(&self, title: Option<&str>) -> Result<Conversation, ApiError> {
        let body = match title {
            Some(title) => json!({ "title": title }),
            None => json!({}),
        };
        self.post("/conversations/", &body).await
    }

    pub async fn list_conversations(
        &self,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Conversation>, ApiError> {
        self.get_with("/conversations/", &[("skip", skip), ("limit", limit)])
            .await
    }

    pub async fn get_conversation(&self, conversation_id: i64) -> Result<ConversationDetail, ApiError> {
        self.get(&format!("/conversations/{}", conversation_id))
            .await
    }

    pub async fn get_messages(&self, conversation_id: i64) -> Result<Vec<Message>, ApiError> {
        self.get(&format!("/conversations/{}/messages", conversation_id))
            .await
    }

    /// Ask a question and wait for the whole answer
    pub async fn send_message(
        &self,
        conversation_id: i64,
        content: &str,
    ) -> Result<QueryResponse, ApiError> {
        self.post(
            &format!("/conversations/{}/messages", conversation_id),
            &json!({ "content": content }),
        )
        .await
    }

    pub async fn delete_conversation(&self, conversation_id: i64) -> Result<Value, ApiError> {
        self.delete(&format!("/conversations/{}", conversation_id))
            .await
    }

    /// Rate an answer inside a conversation
    pub async fn rate_message(
        &self,
        conversation_id: i64,
        message_id: i64,
        rating: i32,
        feedback: Option<&str>,
    ) -> Result<Value, ApiError> {
        self.post(
            &format!(
                "/conversations/{}/messages/{}/feedback",
                conversation_id, message_id
            ),
            &json!({ "rating": rating, "feedback": feedback }),
        )
        .await
    }

    /// Rendered conversation via the conversation resource itself
    pub async fn download_conversation(
        &self,
        conversation_id: i64,
        format: &str,
    ) -> Result<Vec<u8>, ApiError> {
        self.get_bytes_with(
            &format!("/conversations/{}/export", conversation_id),
            &[("format", format)],
        )
        .await
    }
}
