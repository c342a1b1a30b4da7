/*!
format.rs

Terminal formatting for human output paths.

  - StyleOptions::detect()       NO_COLOR / NO_EMOJI aware, plain when piped
  - color(role, text, &style)    ANSI role coloring
  - emoji(tag, &style)           status glyphs
  - banner(title, sub, &style)   boxed title for the REPL
  - table_header(headers, widths, &style) + render_row(values, widths)
                                 fixed-width columns (terminal cells), ellipsis truncation

JSON output paths must not use these helpers.
*/

use std::borrow::Cow;
use std::io::IsTerminal;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

#[derive(Debug, Clone)]
pub struct StyleOptions {
    pub use_color: bool,
    pub use_emoji: bool,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self::detect()
    }
}

impl StyleOptions {
    pub fn detect() -> Self {
        if !std::io::stdout().is_terminal() {
            return Self::plain();
        }
        StyleOptions {
            use_color: std::env::var_os("NO_COLOR").is_none(),
            use_emoji: std::env::var_os("NO_EMOJI").is_none(),
        }
    }

    /// Colorless, emoji-free style for tests and piped output.
    pub fn plain() -> Self {
        StyleOptions {
            use_color: false,
            use_emoji: false,
        }
    }
}

/* ---- Color / Emoji ---- */

#[derive(Debug, Clone, Copy)]
pub enum Role {
    Primary,
    Secondary,
    Accent,
    Success,
    Error,
    Prompt,
    Dim,
}

pub fn color(role: Role, text: impl AsRef<str>, style: &StyleOptions) -> String {
    if !style.use_color {
        return text.as_ref().to_string();
    }
    let code = match role {
        Role::Primary => "38;5;45",
        Role::Secondary => "38;5;250",
        Role::Accent => "38;5;213",
        Role::Success => "38;5;82",
        Role::Error => "38;5;196",
        Role::Prompt => "31",
        Role::Dim => "2",
    };
    format!("\x1b[{code}m{}\x1b[0m", text.as_ref())
}

pub fn emoji(tag: &str, style: &StyleOptions) -> &'static str {
    if !style.use_emoji {
        return "";
    }
    match tag {
        "success" => "✔",
        "error" => "✖",
        "info" => "ℹ",
        "package" => "📦",
        "search" => "🔎",
        _ => "",
    }
}

/* ---- Banner ---- */

/// Single-line boxed title with an optional dimmed subtitle.
pub fn banner(title: &str, subtitle: Option<&str>, style: &StyleOptions) -> String {
    let inner = match subtitle {
        Some(sub) => format!(
            "{}  {}",
            color(Role::Primary, title, style),
            color(Role::Secondary, sub, style)
        ),
        None => color(Role::Primary, title, style),
    };
    let width = display_width(&inner) + 2;
    let rule = "─".repeat(width);
    format!("┌{rule}┐\n│ {inner} │\n└{rule}┘")
}

/* ---- Table ---- */

const COL_PADDING: &str = "  ";

/// Header line plus a dashed rule, sized to `widths`. Rows follow via
/// [`render_row`] so results can be printed as they stream in.
pub fn table_header(headers: &[&str], widths: &[usize], style: &StyleOptions) -> String {
    let cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    format!(
        "{}\n{}",
        color(Role::Accent, render_row(&cells, widths), style),
        color(Role::Dim, rule.join(COL_PADDING), style)
    )
}

/// One table line (no trailing newline).
pub fn render_row(values: &[String], widths: &[usize]) -> String {
    let last = widths.len().saturating_sub(1);
    let mut line = String::new();
    for (i, width) in widths.iter().enumerate() {
        let value = values.get(i).map(String::as_str).unwrap_or("");
        let cell = truncate_ellipsis(value, *width);
        line.push_str(&cell);
        if i < last {
            let pad = width.saturating_sub(display_width(&cell));
            line.push_str(&" ".repeat(pad));
            line.push_str(COL_PADDING);
        }
    }
    line
}

/// Cut `s` to at most `max_width` terminal cells, ending in `…` when cut.
pub fn truncate_ellipsis(s: &str, max_width: usize) -> String {
    if max_width == 0 {
        return String::new();
    }
    if s.width() <= max_width {
        return s.to_string();
    }
    let budget = max_width - 1;
    let mut used = 0;
    let mut out = String::new();
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        out.push(c);
    }
    out.push('…');
    out
}

/* ---- ANSI / Width ---- */

fn strip_ansi(s: &str) -> Cow<'_, str> {
    if !s.contains('\x1b') {
        return Cow::Borrowed(s);
    }
    let mut buf = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            // skip parameters up to and including the final letter
            for c in chars.by_ref() {
                if c.is_ascii_alphabetic() {
                    break;
                }
            }
            continue;
        }
        buf.push(c);
    }
    Cow::Owned(buf)
}

/// Terminal cells taken by `s` once ANSI sequences are removed.
fn display_width(s: &str) -> usize {
    strip_ansi(s).width()
}
