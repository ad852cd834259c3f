//! ragchat - Client for a retrieval-augmented chat service
//!
//! The backend answers questions about an organisation's uploaded documents.
//! This library is everything a front end needs to talk to it:
//!
//! - **Streaming answers**: [`StreamConsumer`] reads `data: <json>` events off
//!   a chunked response and delivers fragments as they arrive
//! - **Auth state**: [`AuthSession`] holds the bearer credential and profile,
//!   persisted across runs, and is cleared exactly once on expiry
//! - **REST client**: [`ApiClient`] with credential and error interceptors for
//!   files, conversations, feedback and admin endpoints
//! - **Route guard**: [`Router`] decides where a navigation may go
//! - **Export**: [`ExportService`] saves server-rendered conversation documents

pub mod api;
pub mod auth;
pub mod config;
pub mod export;
pub mod notify;
pub mod router;
pub mod streaming;
pub mod tui;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthSession, CredentialStore, FileCredentialStore, MemoryCredentialStore, UserProfile};
pub use config::{Config, ConfigBuilder, ConfigError};
pub use export::{DirectorySink, ExportFormat, ExportService, ExportSink};
pub use notify::{CollectingNotifier, LogNotifier, Notifier};
pub use router::{NavigationDecision, RouteName, Router};
pub use streaming::{
    ChatStreamRequest, StreamConsumer, StreamError, StreamHandle, StreamObserver, StreamOutcome,
    StreamUpdate,
};
