//! Terminal front end
//!
//! Interactive chat shell with streamed answers, markdown rendering and a
//! few slash commands, plus a [`Notifier`] that prints in colour.

pub mod commands;
pub mod prompt;
pub mod renderer;
pub mod spinner;
pub mod theme;

use crate::api::ApiClient;
use crate::export::ExportService;
use crate::notify::{Level, Notification, Notifier};
use crate::streaming::{
    ChatStreamRequest, StreamConsumer, StreamError, StreamObserver, StreamOutcome,
};

use commands::{parse_command, render_help, SlashCommand};
use prompt::PromptHandler;
use renderer::TerminalRenderer;
use spinner::ThinkingSpinner;

use anyhow::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Prints notifications to the terminal
#[derive(Default)]
pub struct TerminalNotifier {
    renderer: TerminalRenderer,
}

impl TerminalNotifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Notifier for TerminalNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Success => self.renderer.render_success(&notification.message),
            Level::Info => self.renderer.render_info(&notification.message),
            Level::Warning => self.renderer.render_warning(&notification.message),
            Level::Error => self.renderer.render_error(&notification.message),
        }
    }
}

/// Streams fragments to the terminal as they arrive
struct AnswerPrinter<'a> {
    renderer: &'a TerminalRenderer,
    spinner: ThinkingSpinner,
    answer: String,
}

impl StreamObserver for AnswerPrinter<'_> {
    fn on_chunk(&mut self, fragment: &str, accumulated: &str) {
        self.spinner.stop();
        self.renderer.render_delta(fragment);
        self.answer = accumulated.to_string();
    }

    fn on_complete(&mut self, payload: &Value) {
        self.spinner.stop();
        let full = payload["full_answer"].as_str().unwrap_or(&self.answer);
        self.renderer.render_markdown(full);
        self.renderer.render_sources(payload);
        println!();
    }

    fn on_error(&mut self, _message: &str) {
        // already reported through the notifier
        self.spinner.stop();
        println!();
    }
}

pub struct ChatShell {
    client: Arc<ApiClient>,
    consumer: StreamConsumer,
    exporter: ExportService,
    renderer: TerminalRenderer,
    prompt: PromptHandler,
    conversation_id: i64,
}

impl ChatShell {
    pub fn new(
        client: Arc<ApiClient>,
        consumer: StreamConsumer,
        exporter: ExportService,
        conversation_id: i64,
    ) -> Self {
        Self {
            client,
            consumer,
            exporter,
            renderer: TerminalRenderer::new(),
            prompt: PromptHandler::new(),
            conversation_id,
        }
    }

    pub fn conversation_id(&self) -> i64 {
        self.conversation_id
    }

    /// Stream one answer to the terminal. Ctrl-C stops it.
    pub async fn ask(&self, question: &str) -> Result<StreamOutcome, StreamError> {
        let handle = self
            .consumer
            .begin_stream(ChatStreamRequest::new(self.conversation_id, question))?;

        let mut printer = AnswerPrinter {
            renderer: &self.renderer,
            spinner: ThinkingSpinner::new(),
            answer: String::new(),
        };
        printer.spinner.start("Searching documents...");

        let outcome = tokio::select! {
            outcome = handle.observe(&mut printer) => outcome,
            _ = tokio::signal::ctrl_c() => {
                self.consumer.stop_stream();
                StreamOutcome::Ended
            }
        };

        printer.spinner.stop();
        if outcome == StreamOutcome::Ended {
            println!();
            self.renderer.render_system("Answer stopped");
        }
        Ok(outcome)
    }

    /// Read questions until EOF or `/quit`
    pub async fn run(&mut self) -> Result<()> {
        let user = self.client.session().user().map(|u| u.username);
        self.renderer
            .render_banner(self.client.base_url(), user.as_deref(), self.conversation_id);

        loop {
            let Some(line) = self.prompt.read_line(">", self.renderer.prompt_color()) else {
                break;
            };
            if line.is_empty() {
                continue;
            }

            match parse_command(&line) {
                Some(SlashCommand::Quit) => break,
                Some(command) => self.handle_command(command).await,
                None => {
                    if let Err(e) = self.ask(&line).await {
                        self.renderer.render_error(&e.to_string());
                    }
                }
            }
        }

        self.consumer.stop_stream();
        Ok(())
    }

    async fn handle_command(&mut self, command: SlashCommand) {
        match command {
            SlashCommand::Help => render_help(&self.renderer),
            SlashCommand::Quit => {}
            SlashCommand::New(title) => match self.client.create_conversation(title.as_deref()).await {
                Ok(conversation) => {
                    self.conversation_id = conversation.id;
                    self.renderer.render_success(&format!(
                        "Started conversation {} \"{}\"",
                        conversation.id, conversation.title
                    ));
                }
                Err(e) => debug!("Creating conversation failed: {}", e),
            },
            SlashCommand::Switch(id) => match self.client.get_conversation(id).await {
                Ok(detail) => {
                    self.conversation_id = id;
                    self.renderer.render_success(&format!(
                        "Switched to \"{}\" ({} messages)",
                        detail.conversation.title,
                        detail.messages.len()
                    ));
                }
                Err(e) => debug!("Switching conversation failed: {}", e),
            },
            SlashCommand::History => match self.client.get_messages(self.conversation_id).await {
                Ok(messages) if messages.is_empty() => self.renderer.render_info("No messages yet"),
                Ok(messages) => {
                    for message in messages {
                        self.renderer.render_system(&message.role);
                        self.renderer.render_markdown(&message.content);
                        println!();
                    }
                }
                Err(e) => debug!("Loading messages failed: {}", e),
            },
            SlashCommand::Export { format, filename } => {
                // outcome is reported by the notifier
                let _ = self
                    .exporter
                    .export_conversation(self.conversation_id, &format, filename.as_deref())
                    .await;
            }
            SlashCommand::Status => {
                let session = self.client.session();
                let user = session.user();
                self.renderer.render_field("Server", self.client.base_url());
                self.renderer.render_field(
                    "User",
                    user.as_ref().map(|u| u.display_name()).unwrap_or("anonymous"),
                );
                self.renderer.render_field(
                    "Role",
                    user.as_ref().map(|u| u.role.as_str()).unwrap_or("-"),
                );
                self.renderer
                    .render_field("Conversation", &self.conversation_id.to_string());
            }
            SlashCommand::Invalid(message) => self.renderer.render_error(&message),
        }
    }
}
