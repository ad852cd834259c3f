//! REST API client for the chat backend
//!
//! [`ApiClient`] wraps a `reqwest::Client` with the two interceptors every
//! call goes through: the bearer credential is attached on the way out, and
//! failed responses are turned into notifications (plus the global logout on
//! 401) on the way back. Resource endpoints live in their own files as
//! `impl ApiClient` blocks.

mod admin;
mod auth;
mod client;
mod conversations;
mod feedback;
mod files;
mod types;

pub use client::{extract_detail, ApiClient};
pub use files::FileQuery;
pub use types::{
    Conversation, ConversationDetail, DailyFeedback, Feedback, FeedbackRequest, FeedbackStats,
    FileInfo, FileList, FileUpload, Message, NegativeFeedback, QueryResponse, SourceRef,
    SystemStats,
};

use crate::auth::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Credential store error: {0}")]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status of the failed response, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth(_) => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-provided detail when there is one, otherwise the error text
    pub fn detail(&self) -> String {
        match self {
            ApiError::Auth(message) | ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
