//! Terminal colours

use crossterm::style::Color;

pub struct Theme {
    /// Input prompt symbol
    pub prompt: Color,
    /// Streamed answer text
    pub answer: Color,
    pub system: Color,
    pub error: Color,
    pub warning: Color,
    /// Secondary info (sources, hints)
    pub dim: Color,
    pub success: Color,
    pub title: Color,
    /// Numbers in listings and stats
    pub stats: Color,
    /// Slash command names
    pub command: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            prompt: Color::Cyan,
            answer: Color::White,
            system: Color::DarkYellow,
            error: Color::Red,
            warning: Color::Yellow,
            dim: Color::DarkGrey,
            success: Color::Green,
            title: Color::Magenta,
            stats: Color::Blue,
            command: Color::Yellow,
        }
    }
}
