//! Rendering of legacy `§`-coded MOTDs into plain text and HTML.
//!
//! Colours and styles are tracked separately: at most one colour span is
//! open at a time, while any number of style spans may be stacked on top of
//! it. A colour code closes every open style before switching colour, and
//! `§r` closes everything.

use shared::protocol::FORMAT_CHAR;

const CLOSE_SPAN: &str = "</span>";

/// The two derived views of a raw MOTD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMotd {
    pub clean: String,
    pub html: String,
}

pub fn render(raw: &str) -> RenderedMotd {
    RenderedMotd {
        clean: strip_codes(raw),
        html: to_html(raw),
    }
}

/// Drop every `§x` pair. A lone trailing `§` is kept.
pub fn strip_codes(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c == FORMAT_CHAR && chars.next().is_some() {
            continue;
        }
        out.push(c);
    }

    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormatCode {
    Color(char),
    Style(Style),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Obfuscated,
}

impl FormatCode {
    fn parse(c: char) -> Option<Self> {
        let c = c.to_ascii_lowercase();
        match c {
            '0'..='9' | 'a'..='f' => Some(Self::Color(c)),
            'l' => Some(Self::Style(Style::Bold)),
            'o' => Some(Self::Style(Style::Italic)),
            'n' => Some(Self::Style(Style::Underline)),
            'm' => Some(Self::Style(Style::Strikethrough)),
            'k' => Some(Self::Style(Style::Obfuscated)),
            'r' => Some(Self::Reset),
            _ => None,
        }
    }
}

impl Style {
    fn open_tag(self) -> &'static str {
        match self {
            Style::Bold => "<span style='font-weight:bold;'>",
            Style::Italic => "<span style='font-style:italic;'>",
            Style::Underline => "<span style='text-decoration:underline;'>",
            Style::Strikethrough => "<span style='text-decoration:line-through;'>",
            Style::Obfuscated => "<span class='motd-obfuscated'>",
        }
    }
}

fn color_hex(code: char) -> &'static str {
    match code {
        '0' => "#000000",
        '1' => "#0000AA",
        '2' => "#00AA00",
        '3' => "#00AAAA",
        '4' => "#AA0000",
        '5' => "#AA00AA",
        '6' => "#FFAA00",
        '7' => "#AAAAAA",
        '8' => "#555555",
        '9' => "#5555FF",
        'a' => "#55FF55",
        'b' => "#55FFFF",
        'c' => "#FF5555",
        'd' => "#FF55FF",
        'e' => "#FFFF55",
        _ => "#FFFFFF",
    }
}

/// Open elements while scanning one MOTD.
#[derive(Debug, Default)]
struct FormattingState {
    open_styles: Vec<&'static str>,
    active_color: Option<char>,
}

impl FormattingState {
    fn apply(&mut self, code: FormatCode, out: &mut String) {
        match code {
            FormatCode::Color(color) => {
                self.close_styles(out);
                if self.active_color != Some(color) {
                    self.close_color(out);
                    out.push_str("<span style='color:");
                    out.push_str(color_hex(color));
                    out.push_str("!important'>");
                    self.active_color = Some(color);
                }
            }
            FormatCode::Style(style) => {
                out.push_str(style.open_tag());
                self.open_styles.push(CLOSE_SPAN);
            }
            FormatCode::Reset => self.close_all(out),
        }
    }

    fn close_styles(&mut self, out: &mut String) {
        while let Some(closer) = self.open_styles.pop() {
            out.push_str(closer);
        }
    }

    fn close_color(&mut self, out: &mut String) {
        if self.active_color.take().is_some() {
            out.push_str(CLOSE_SPAN);
        }
    }

    fn close_all(&mut self, out: &mut String) {
        self.close_styles(out);
        self.close_color(out);
    }
}

/// Convert the MOTD into balanced HTML. Text is escaped and newlines become `<br>`.
pub fn to_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() * 2);
    let mut state = FormattingState::default();
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        if c == FORMAT_CHAR {
            if let Some(code) = chars.peek().copied().and_then(FormatCode::parse) {
                chars.next();
                state.apply(code, &mut out);
                continue;
            }
        }
        push_text(&mut out, c);
    }

    state.close_all(&mut out);
    out
}

fn push_text(out: &mut String, c: char) {
    match c {
        '\n' => out.push_str("<br>"),
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(c),
    }
}
