//! Slash commands of the interactive chat

use crate::export::ExportFormat;
use crossterm::style::Stylize;

#[derive(Debug, PartialEq)]
pub enum SlashCommand {
    Help,
    Quit,
    /// Start a new conversation, optionally titled
    New(Option<String>),
    /// Switch to an existing conversation
    Switch(i64),
    /// Show the messages of the current conversation
    History,
    /// Export the current conversation
    Export {
        format: ExportFormat,
        filename: Option<String>,
    },
    Status,
    /// Something that looked like a command but wasn't one
    Invalid(String),
}

/// Parse a slash command. `None` if the input is a question.
pub fn parse_command(input: &str) -> Option<SlashCommand> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }

    let parts: Vec<&str> = input.splitn(3, ' ').collect();
    let cmd = parts[0].to_lowercase();
    let arg1 = parts.get(1).map(|s| s.trim().to_string());
    let arg2 = parts.get(2).map(|s| s.trim().to_string());

    let command = match cmd.as_str() {
        "/help" | "/h" | "/?" => SlashCommand::Help,
        "/quit" | "/q" | "/exit" => SlashCommand::Quit,
        "/new" => {
            let title = [arg1, arg2]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            SlashCommand::New(Some(title).filter(|t| !t.is_empty()))
        }
        "/switch" | "/open" => match arg1.as_deref().map(str::parse::<i64>) {
            Some(Ok(id)) => SlashCommand::Switch(id),
            _ => SlashCommand::Invalid("usage: /switch <conversation id>".to_string()),
        },
        "/history" | "/messages" => SlashCommand::History,
        "/export" => SlashCommand::Export {
            format: arg1
                .as_deref()
                .map(ExportFormat::parse)
                .unwrap_or_default(),
            filename: arg2,
        },
        "/status" => SlashCommand::Status,
        other => SlashCommand::Invalid(format!("unknown command {}", other)),
    };

    Some(command)
}

pub fn render_help(renderer: &super::renderer::TerminalRenderer) {
    let cmd_color = renderer.command_color();
    let dim_color = renderer.dim_color();

    println!();
    renderer.render_system("Available commands:");
    println!();

    let commands = [
        ("/help", "Show this help message"),
        ("/quit", "Leave the chat"),
        ("/new [title]", "Start a new conversation"),
        ("/switch <id>", "Continue another conversation"),
        ("/history", "Show the messages so far"),
        ("/export [format] [name]", "Export as markdown, html or pdf"),
        ("/status", "Show user and conversation"),
    ];

    for (cmd, desc) in &commands {
        println!("  {:<25} {}", cmd.with(cmd_color), desc.with(dim_color));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_is_not_a_command() {
        assert!(parse_command("what is our leave policy?").is_none());
    }

    #[test]
    fn test_new_with_title() {
        assert_eq!(
            parse_command("/new Travel rules 2024"),
            Some(SlashCommand::New(Some("Travel rules 2024".to_string())))
        );
        assert_eq!(parse_command("/new"), Some(SlashCommand::New(None)));
    }

    #[test]
    fn test_switch_needs_id() {
        assert_eq!(parse_command("/switch 12"), Some(SlashCommand::Switch(12)));
        assert!(matches!(
            parse_command("/switch abc"),
            Some(SlashCommand::Invalid(_))
        ));
    }

    #[test]
    fn test_export_defaults_to_markdown() {
        assert_eq!(
            parse_command("/export"),
            Some(SlashCommand::Export {
                format: ExportFormat::Markdown,
                filename: None
            })
        );
        assert_eq!(
            parse_command("/export pdf Report"),
            Some(SlashCommand::Export {
                format: ExportFormat::Pdf,
                filename: Some("Report".to_string())
            })
        );
    }
}
