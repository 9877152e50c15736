//! Terminal styling for command output.

use owo_colors::{OwoColorize, Style, colors::css};

/// Whether stdout renders colour.
pub fn supports_color() -> bool {
    supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Terminal width in columns, if stdout is a terminal.
pub fn terminal_width() -> Option<u16> {
    terminal_size::terminal_size().map(|(w, _)| w.0)
}

/// Narrow terminals (< 60 columns) get stacked rather than tabular output.
pub fn is_narrow() -> bool {
    terminal_width().is_some_and(|w| w < 60)
}

/// Shortens `text` to at most `max` characters, marking the cut with `…`.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Semantic colours for output lines.
pub trait Colorize {
    /// Something was added or succeeded (green).
    fn success(&self) -> String;
    /// Something was removed or needs attention (amber).
    fn warning(&self) -> String;
    /// Something changed (blue).
    fn info(&self) -> String;
    /// Secondary detail.
    fn dim(&self) -> String;
}

fn paint(text: &str, style: Style) -> String {
    if supports_color() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

impl Colorize for str {
    fn success(&self) -> String {
        paint(self, Style::new().fg::<css::Green>())
    }

    fn warning(&self) -> String {
        paint(self, Style::new().fg::<css::Orange>())
    }

    fn info(&self) -> String {
        paint(self, Style::new().fg::<css::LightBlue>())
    }

    fn dim(&self) -> String {
        paint(self, Style::new().dimmed())
    }
}

impl Colorize for String {
    fn success(&self) -> String {
        self.as_str().success()
    }

    fn warning(&self) -> String {
        self.as_str().warning()
    }

    fn info(&self) -> String {
        self.as_str().info()
    }

    fn dim(&self) -> String {
        self.as_str().dim()
    }
}
