//! What the session knows about the player's terminal.
//!
//! Shared between the reader (which updates the size from NAWS and reads
//! the echo flag), the writer (which wraps to the width), and the game
//! (which turns echo off for passwords and lays out `who` by width).

use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

/// Narrower than this and nothing lays out sensibly.
pub const MIN_WIDTH: u16 = 20;

#[derive(Debug)]
pub struct TerminalState {
    width: AtomicU16,
    height: AtomicU16,
    echo: AtomicBool,
}

impl TerminalState {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width: AtomicU16::new(width.max(MIN_WIDTH)),
            height: AtomicU16::new(height),
            echo: AtomicBool::new(true),
        }
    }

    pub fn width(&self) -> u16 {
        self.width.load(Ordering::Relaxed)
    }

    pub fn height(&self) -> u16 {
        self.height.load(Ordering::Relaxed)
    }

    /// Records a reported size. Zero means "unknown" in NAWS and is
    /// ignored.
    pub fn resize(&self, width: u16, height: u16) {
        if width > 0 {
            self.width.store(width.max(MIN_WIDTH), Ordering::Relaxed);
        }
        if height > 0 {
            self.height.store(height, Ordering::Relaxed);
        }
    }

    pub fn echo(&self) -> bool {
        self.echo.load(Ordering::Relaxed)
    }

    pub fn set_echo(&self, on: bool) {
        self.echo.store(on, Ordering::Relaxed);
    }
}

impl Default for TerminalState {
    fn default() -> Self {
        Self::new(80, 24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_is_clamped() {
        let t = TerminalState::new(5, 10);
        assert_eq!(t.width(), MIN_WIDTH);
        t.resize(132, 0);
        assert_eq!((t.width(), t.height()), (132, 10));
    }

    #[test]
    fn test_echo_defaults_on() {
        let t = TerminalState::default();
        assert!(t.echo());
        t.set_echo(false);
        assert!(!t.echo());
    }
}
