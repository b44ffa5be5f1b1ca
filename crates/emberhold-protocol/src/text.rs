//! Text layout for terminal output.
//!
//! Game code writes messages with whatever line breaks are convenient
//! (`\n`, `\n\r`, `\r\n`). Before they hit the wire, [`wrap_text`] turns
//! every break into CRLF and word-wraps each line to the viewport width.
//! ANSI colour escapes take no space on screen, so they don't count
//! toward the width.

pub const CRLF: &str = "\r\n";

const ESC: char = '\u{1b}';

/// Foreground colours used by room titles and system notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightWhite,
}

impl Color {
    fn sgr(self) -> &'static str {
        match self {
            Color::Red => "31",
            Color::Green => "32",
            Color::Yellow => "33",
            Color::Blue => "34",
            Color::Magenta => "35",
            Color::Cyan => "36",
            Color::White => "37",
            Color::BrightWhite => "97",
        }
    }
}

/// Wraps `text` in the escape sequence for `color` and a reset.
pub fn paint(text: &str, color: Color) -> String {
    format!("{ESC}[{}m{text}{ESC}[0m", color.sgr())
}

/// Number of terminal cells `s` occupies, skipping `ESC [ ... <letter>`
/// sequences.
pub fn visible_len(s: &str) -> usize {
    let mut n = 0;
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == ESC {
            // CSI: parameters up to and including the final letter.
            if chars.next() == Some('[') {
                for p in chars.by_ref() {
                    if p.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        n += 1;
    }
    n
}

/// Normalizes line breaks to CRLF and word-wraps every line to `width`.
///
/// Existing breaks are kept, including leading and trailing ones, so a
/// prompt without a trailing newline stays on the cursor's line. Words
/// longer than the width are left whole for the terminal to fold.
pub fn wrap_text(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut out = String::with_capacity(text.len() + 8);
    for (i, line) in split_breaks(text).into_iter().enumerate() {
        if i > 0 {
            out.push_str(CRLF);
        }
        wrap_line(line, width, &mut out);
    }
    out
}

/// Splits on `\r\n`, `\n\r`, `\n` and `\r`, each counting as one break.
fn split_breaks(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            first @ (b'\r' | b'\n') => {
                lines.push(&text[start..i]);
                let pair = if first == b'\r' { b'\n' } else { b'\r' };
                i += if bytes.get(i + 1) == Some(&pair) { 2 } else { 1 };
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(&text[start..]);
    lines
}

fn wrap_line(line: &str, width: usize, out: &mut String) {
    if visible_len(line) <= width {
        out.push_str(line);
        return;
    }

    let mut col = 0;
    let mut first = true;
    for word in line.split(' ') {
        let len = visible_len(word);
        if first {
            out.push_str(word);
            col = len;
            first = false;
        } else if col + 1 + len <= width {
            out.push(' ');
            out.push_str(word);
            col += 1 + len;
        } else {
            out.push_str(CRLF);
            out.push_str(word);
            col = len;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_line_is_untouched() {
        assert_eq!(wrap_text("You say hello", 80), "You say hello");
    }

    #[test]
    fn test_breaks_are_normalized_to_crlf() {
        assert_eq!(wrap_text("\n\rYou say hi\n\r", 80), "\r\nYou say hi\r\n");
        assert_eq!(wrap_text("a\nb\r\nc\rd", 80), "a\r\nb\r\nc\r\nd");
    }

    #[test]
    fn test_blank_lines_survive() {
        assert_eq!(wrap_text("a\n\nb", 80), "a\r\n\r\nb");
    }

    #[test]
    fn test_prompt_gets_no_trailing_newline() {
        assert_eq!(wrap_text("> ", 80), "> ");
    }

    #[test]
    fn test_long_line_wraps_at_word_boundary() {
        let text = "the quick brown fox jumps over the lazy dog";
        assert_eq!(
            wrap_text(text, 16),
            "the quick brown\r\nfox jumps over\r\nthe lazy dog"
        );
    }

    #[test]
    fn test_colour_codes_do_not_count() {
        let title = paint("[Market Square]", Color::White);
        assert_eq!(visible_len(&title), 15);
        assert_eq!(wrap_text(&title, 15), title);
    }

    #[test]
    fn test_oversized_word_is_left_whole() {
        assert_eq!(wrap_text("a supercalifragilistic b", 8), "a\r\nsupercalifragilistic\r\nb");
    }
}
