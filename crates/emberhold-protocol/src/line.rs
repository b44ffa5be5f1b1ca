//! Server-side line editing.
//!
//! Telnet clients in character mode (and browser terminals) send every
//! keystroke as it is typed, so the server does the cooking: it buffers
//! printable characters, handles erase keys, and cuts a line when the
//! player presses enter. [`LineEditor::push`] consumes one code point and
//! reports what happened as an [`Edit`]; the caller decides what to echo
//! and where completed lines go.

/// Longest line the editor buffers before discarding it.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// ETX, what a terminal sends for Ctrl-C.
pub const DEFAULT_INTERRUPT: char = '\u{3}';

const BACKSPACE: char = '\u{8}';
const DELETE: char = '\u{7f}';

/// The result of feeding one code point to a [`LineEditor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Nothing changed (a stray control character, a backspace on an
    /// empty buffer, the LF half of a CRLF pair).
    Ignored,
    /// The character was appended to the buffer.
    Append(char),
    /// The last buffered character was erased.
    Erase,
    /// Enter was pressed with text in the buffer; here is the line.
    Line(String),
    /// Enter was pressed on an empty buffer.
    Blank,
    /// The buffer hit its limit and everything typed so far was thrown
    /// away.
    Overflow,
    /// The interrupt key was pressed.
    Interrupt,
}

impl Edit {
    /// Appends the terminal echo for this edit to `out`.
    pub fn echo_into(&self, out: &mut String) {
        match self {
            Edit::Append(c) => out.push(*c),
            // Step back, blank the cell, step back again.
            Edit::Erase => out.push_str("\u{8} \u{8}"),
            Edit::Line(_) | Edit::Blank => out.push_str("\r\n"),
            Edit::Ignored | Edit::Overflow | Edit::Interrupt => {}
        }
    }
}

/// Accumulates keystrokes into lines.
#[derive(Debug)]
pub struct LineEditor {
    buf: String,
    len: usize,
    max_len: usize,
    interrupt: char,
    after_cr: bool,
}

impl Default for LineEditor {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE_LEN, DEFAULT_INTERRUPT)
    }
}

impl LineEditor {
    pub fn new(max_len: usize, interrupt: char) -> Self {
        Self {
            buf: String::new(),
            len: 0,
            max_len,
            interrupt,
            after_cr: false,
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// What has been typed so far (not yet submitted).
    pub fn buffered(&self) -> &str {
        &self.buf
    }

    pub fn push(&mut self, c: char) -> Edit {
        let after_cr = std::mem::replace(&mut self.after_cr, c == '\r');

        if c == self.interrupt {
            return Edit::Interrupt;
        }

        match c {
            '\r' => self.submit(),
            // CR LF counts as one enter; a bare LF is an enter of its own.
            '\n' if after_cr => Edit::Ignored,
            '\n' => self.submit(),
            BACKSPACE | DELETE => match self.buf.pop() {
                Some(_) => {
                    self.len -= 1;
                    Edit::Erase
                }
                None => Edit::Ignored,
            },
            '\t' => self.append(' '),
            c if c.is_control() => Edit::Ignored,
            c => self.append(c),
        }
    }

    fn append(&mut self, c: char) -> Edit {
        if self.len >= self.max_len {
            self.clear();
            return Edit::Overflow;
        }
        self.buf.push(c);
        self.len += 1;
        Edit::Append(c)
    }

    fn submit(&mut self) -> Edit {
        if self.buf.is_empty() {
            return Edit::Blank;
        }
        self.len = 0;
        Edit::Line(std::mem::take(&mut self.buf))
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(editor: &mut LineEditor, s: &str) -> Vec<Edit> {
        s.chars().map(|c| editor.push(c)).collect()
    }

    fn lines(edits: &[Edit]) -> Vec<&str> {
        edits
            .iter()
            .filter_map(|e| match e {
                Edit::Line(l) => Some(l.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_crlf_yields_one_line() {
        let mut ed = LineEditor::default();
        let edits = feed(&mut ed, "look\r\nwho\n");
        assert_eq!(lines(&edits), vec!["look", "who"]);
        assert_eq!(edits[5], Edit::Ignored, "LF after CR is swallowed");
    }

    #[test]
    fn test_empty_lines_are_not_submitted() {
        let mut ed = LineEditor::default();
        let edits = feed(&mut ed, "\r\n\r\n\n");
        assert!(lines(&edits).is_empty());
        assert_eq!(edits.iter().filter(|e| **e == Edit::Blank).count(), 3);
    }

    #[test]
    fn test_backspace_and_delete_erase() {
        let mut ed = LineEditor::default();
        let edits = feed(&mut ed, "lool\u{8}k\u{7f}\u{7f}ok\r");
        assert_eq!(lines(&edits), vec!["look"]);
    }

    #[test]
    fn test_backspace_on_empty_buffer_is_ignored() {
        let mut ed = LineEditor::default();
        assert_eq!(ed.push(BACKSPACE), Edit::Ignored);
    }

    #[test]
    fn test_erase_echo_rubs_out_the_cell() {
        let mut out = String::new();
        Edit::Erase.echo_into(&mut out);
        assert_eq!(out, "\u{8} \u{8}");
    }

    #[test]
    fn test_erase_counts_code_points_not_bytes() {
        let mut ed = LineEditor::default();
        feed(&mut ed, "héé\u{8}");
        assert_eq!(ed.buffered(), "hé");
    }

    #[test]
    fn test_overflow_discards_the_line() {
        let mut ed = LineEditor::new(4, DEFAULT_INTERRUPT);
        let edits = feed(&mut ed, "abcde");
        assert_eq!(edits[4], Edit::Overflow);
        assert_eq!(ed.buffered(), "");
        // The editor keeps working after an overflow.
        let edits = feed(&mut ed, "go\r");
        assert_eq!(lines(&edits), vec!["go"]);
    }

    #[test]
    fn test_interrupt_is_reported() {
        let mut ed = LineEditor::default();
        let edits = feed(&mut ed, "sa\u{3}");
        assert_eq!(edits[2], Edit::Interrupt);
    }

    #[test]
    fn test_control_characters_are_dropped() {
        let mut ed = LineEditor::default();
        // Telnet's CR NUL and a stray bell.
        let edits = feed(&mut ed, "s\u{7}ay\r\0");
        assert_eq!(lines(&edits), vec!["say"]);
        assert_eq!(edits[1], Edit::Ignored);
        assert_eq!(edits[5], Edit::Ignored);
    }

    #[test]
    fn test_tab_becomes_space() {
        let mut ed = LineEditor::default();
        let edits = feed(&mut ed, "say\thi\r");
        assert_eq!(lines(&edits), vec!["say hi"]);
    }
}
