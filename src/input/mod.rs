//! # Input Module
//!
//! Maps typed keys to crawl commands.

use crate::game::{Direction, Position};

/// Input handler for processing player commands.
///
/// The crawl reads one line per turn; the first non-blank character of the
/// line decides the command.
#[derive(Debug, Clone)]
pub struct InputHandler {
    /// Whether to enable Vi-style movement keys (hjkl)
    pub vi_keys_enabled: bool,
}

impl Default for InputHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl InputHandler {
    /// Creates a new input handler.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{InputHandler, PlayerInput, Position};
    ///
    /// let input_handler = InputHandler::new();
    /// assert_eq!(input_handler.parse_key('d'), Some(PlayerInput::Move(Position::new(0, 1))));
    /// ```
    pub fn new() -> Self {
        Self {
            vi_keys_enabled: true,
        }
    }

    /// Maps a single key to a command, case-insensitively.
    pub fn parse_key(&self, key: char) -> Option<PlayerInput> {
        let direction = match key.to_ascii_lowercase() {
            'w' => Direction::North,
            's' => Direction::South,
            'a' => Direction::West,
            'd' => Direction::East,
            'k' if self.vi_keys_enabled => Direction::North,
            'j' if self.vi_keys_enabled => Direction::South,
            'h' if self.vi_keys_enabled => Direction::West,
            'l' if self.vi_keys_enabled => Direction::East,
            'q' => return Some(PlayerInput::Quit),
            '?' => return Some(PlayerInput::Help),
            _ => return None,
        };
        Some(PlayerInput::Move(direction.to_delta()))
    }

    /// Maps a typed line to a command using its first non-blank character.
    pub fn parse_line(&self, line: &str) -> Option<PlayerInput> {
        line.trim().chars().next().and_then(|key| self.parse_key(key))
    }

    /// Key summary shown for the help command.
    pub fn help_text(&self) -> String {
        let mut text = String::from("Move: w/a/s/d");
        if self.vi_keys_enabled {
            text.push_str(" or h/j/k/l");
        }
        text.push_str("  Quit: q  Help: ?");
        text
    }
}

/// Player input types that can be processed by the input handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerInput {
    /// Move by a relative (row, col) delta
    Move(Position),
    /// Quit the game
    Quit,
    /// Show help information
    Help,
}
