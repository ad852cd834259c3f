//! Terminal rendering with markdown support

use crossterm::style::{Color, Stylize};
use serde_json::Value;
use std::io::Write;
use termimad::MadSkin;

use super::theme::Theme;

pub struct TerminalRenderer {
    theme: Theme,
    skin: MadSkin,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalRenderer {
    pub fn new() -> Self {
        let theme = Theme::default();
        let skin = Self::build_skin(&theme);
        Self { theme, skin }
    }

    fn build_skin(theme: &Theme) -> MadSkin {
        let mut skin = MadSkin::default();
        skin.set_headers_fg(to_termimad_color(theme.title));
        skin.bold.set_fg(to_termimad_color(Color::White));
        skin.italic.set_fg(to_termimad_color(Color::DarkYellow));
        skin.inline_code.set_fg(to_termimad_color(Color::Green));
        skin.code_block.set_fg(to_termimad_color(Color::Green));
        skin
    }

    pub fn render_banner(&self, server: &str, user: Option<&str>, conversation_id: i64) {
        println!();
        println!("{}", "  ragchat".with(self.theme.title));
        println!(
            "  {} {}",
            "Server:".with(self.theme.dim),
            server.with(self.theme.stats)
        );
        println!(
            "  {} {}  {} {}",
            "User:".with(self.theme.dim),
            user.unwrap_or("anonymous").with(self.theme.stats),
            "Conversation:".with(self.theme.dim),
            conversation_id.to_string().with(self.theme.stats),
        );
        println!(
            "  {}",
            "Type /help for commands, Ctrl-C stops an answer, /quit exits".with(self.theme.dim)
        );
        println!();
    }

    /// Print a streamed fragment as-is
    pub fn render_delta(&self, text: &str) {
        print!("{}", text.with(self.theme.answer));
        let _ = std::io::stdout().flush();
    }

    /// Close a streamed answer, re-rendering it when it carries markdown
    pub fn render_markdown(&self, content: &str) {
        println!();
        if has_markdown_elements(content) {
            println!();
            self.skin.print_text(content);
        }
    }

    /// Sources listed in a `complete` payload
    pub fn render_sources(&self, payload: &Value) {
        let Some(sources) = payload["sources"].as_array() else {
            return;
        };
        if sources.is_empty() {
            return;
        }

        println!("  {}", "Sources:".with(self.theme.dim));
        for (idx, source) in sources.iter().enumerate() {
            let name = source["file_name"].as_str().unwrap_or("unknown");
            let page = source["page"]
                .as_i64()
                .map(|p| format!(", p. {}", p))
                .unwrap_or_default();
            println!(
                "    {} {}{}",
                format!("[{}]", idx + 1).with(self.theme.stats),
                name.with(self.theme.dim),
                page.with(self.theme.dim)
            );
        }
    }

    /// Pretty-print an untyped server answer
    pub fn render_json(&self, value: &Value) {
        match serde_json::to_string_pretty(value) {
            Ok(text) => println!("{}", text),
            Err(_) => println!("{}", value),
        }
    }

    pub fn render_system(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{25b6}".with(self.theme.system),
            msg.with(self.theme.system)
        );
    }

    pub fn render_error(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            "\u{2717}".with(self.theme.error),
            msg.with(self.theme.error)
        );
    }

    pub fn render_warning(&self, msg: &str) {
        eprintln!(
            "  {} {}",
            "!".with(self.theme.warning),
            msg.with(self.theme.warning)
        );
    }

    pub fn render_success(&self, msg: &str) {
        println!(
            "  {} {}",
            "\u{2713}".with(self.theme.success),
            msg.with(self.theme.success)
        );
    }

    pub fn render_info(&self, msg: &str) {
        println!("  {}", msg.with(self.theme.dim));
    }

    /// `label: value` line with the value highlighted
    pub fn render_field(&self, label: &str, value: &str) {
        println!(
            "  {:<14} {}",
            format!("{}:", label).with(self.theme.dim),
            value.with(self.theme.stats)
        );
    }

    pub fn prompt_color(&self) -> Color {
        self.theme.prompt
    }

    pub fn command_color(&self) -> Color {
        self.theme.command
    }

    pub fn dim_color(&self) -> Color {
        self.theme.dim
    }
}

/// Whether re-rendering through termimad changes anything
fn has_markdown_elements(content: &str) -> bool {
    content.contains("```")
        || content.contains("# ")
        || content.contains("**")
        || content.contains("| ")
        || content.contains("- [")
}

fn to_termimad_color(color: Color) -> termimad::crossterm::style::Color {
    use termimad::crossterm::style::Color as Mad;
    match color {
        Color::Black => Mad::Black,
        Color::DarkGrey => Mad::DarkGrey,
        Color::Red => Mad::Red,
        Color::DarkRed => Mad::DarkRed,
        Color::Green => Mad::Green,
        Color::DarkGreen => Mad::DarkGreen,
        Color::Yellow => Mad::Yellow,
        Color::DarkYellow => Mad::DarkYellow,
        Color::Blue => Mad::Blue,
        Color::DarkBlue => Mad::DarkBlue,
        Color::Magenta => Mad::Magenta,
        Color::DarkMagenta => Mad::DarkMagenta,
        Color::Cyan => Mad::Cyan,
        Color::DarkCyan => Mad::DarkCyan,
        Color::White => Mad::White,
        Color::Grey => Mad::Grey,
        _ => Mad::Reset,
    }
}
