//! Answer feedback endpoints

use super::{ApiClient, ApiError, DailyFeedback, Feedback, FeedbackRequest, FeedbackStats, NegativeFeedback};
use serde_json::{json, Value};

impl ApiClient {
    pub async fn create_feedback(
        &self,
        message_id: i64,
        request: &FeedbackRequest,
    ) -> Result<Feedback, ApiError> {
        self.post(&format!("/feedback/messages/{}", message_id), request)
            .await
    }

    /// `None` when the message has no feedback yet
    pub async fn get_feedback(&self, message_id: i64) -> Result<Option<Feedback>, ApiError> {
        self.get(&format!("/feedback/messages/{}", message_id))
            .await
    }

    pub async fn delete_feedback(&self, message_id: i64) -> Result<Value, ApiError> {
        self.delete(&format!("/feedback/messages/{}", message_id))
            .await
    }

    pub async fn org_feedback_stats(&self, days: u32) -> Result<FeedbackStats, ApiError> {
        self.get_with("/feedback/stats/org", &[("days", days)]).await
    }

    pub async fn daily_feedback_stats(&self, days: u32) -> Result<Vec<DailyFeedback>, ApiError> {
        self.get_with("/feedback/stats/daily", &[("days", days)])
            .await
    }

    pub async fn recent_negative_feedback(
        &self,
        limit: u32,
    ) -> Result<Vec<NegativeFeedback>, ApiError> {
        self.get_with("/feedback/negative/recent", &[("limit", limit)])
            .await
    }

    pub async fn resolve_negative_feedback(
        &self,
        feedback_id: i64,
        resolution_note: &str,
    ) -> Result<Value, ApiError> {
        self.patch(
            &format!("/feedback/negative/{}/resolve", feedback_id),
            &json!({ "resolution_note": resolution_note }),
        )
        .await
    }
}
