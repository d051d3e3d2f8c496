//! # Display Management
//!
//! Plain-text rendering of the live room grid, with optional ANSI colours
//! and a rolling message log.

use crate::game::{CrawlEvent, CrawlSession, Grid, MovementClass, Position, StyleHint, TurnReport};

const RESET: &str = "\x1b[0m";

/// Text display for the crawl.
///
/// Rendering only produces strings; the caller decides where they go.
#[derive(Debug, Clone)]
pub struct TextDisplay {
    /// Whether to wrap styled tiles in ANSI colour codes
    pub use_color: bool,
    /// Message history
    pub messages: Vec<String>,
    /// Maximum number of messages to keep
    pub max_messages: usize,
    /// Number of recent messages shown under the grid
    pub visible_messages: usize,
}

impl Default for TextDisplay {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TextDisplay {
    pub fn new(use_color: bool) -> Self {
        Self {
            use_color,
            messages: Vec::new(),
            max_messages: 100,
            visible_messages: 3,
        }
    }

    /// ANSI colour for a style hint, if it has one.
    pub fn color_code(hint: StyleHint) -> Option<&'static str> {
        match hint {
            StyleHint::Player => Some("\x1b[32m"),
            StyleHint::Enemy => Some("\x1b[31m"),
            StyleHint::Trap => Some("\x1b[90m"),
            StyleHint::Water => Some("\x1b[34m"),
            StyleHint::Plain => None,
        }
    }

    /// Renders a grid, one line per row.
    ///
    /// # Examples
    ///
    /// ```
    /// use delver::{Grid, TextDisplay};
    ///
    /// let grid = Grid::from_rows(&["=====", "|@ E|", "====="]).unwrap();
    /// let display = TextDisplay::new(false);
    /// assert_eq!(display.render_grid(&grid), "=====\n|@ E|\n=====\n");
    /// ```
    pub fn render_grid(&self, grid: &Grid) -> String {
        if !self.use_color {
            return grid.to_string();
        }

        let mut output = String::new();
        for row in 0..grid.height() as i32 {
            for col in 0..grid.width() as i32 {
                let Some(tile) = grid.get(Position::new(row, col)) else {
                    continue;
                };
                match Self::color_code(tile.style_hint()) {
                    Some(code) => {
                        output.push_str(code);
                        output.push(tile.symbol());
                        output.push_str(RESET);
                    }
                    None => output.push(tile.symbol()),
                }
            }
            output.push('\n');
        }
        output
    }

    /// Renders a status line, the current room and the recent messages.
    pub fn render_session(&self, session: &CrawlSession) -> String {
        let stats = session.statistics();
        let mut output = format!(
            "{} / {}  turn {}  steps {}  enemies {}\n",
            session.dungeon().key,
            session.current_room(),
            session.turn_number(),
            stats.steps_taken,
            session.enemies().len()
        );
        output.push_str(&self.render_grid(session.grid()));

        let start = self.messages.len().saturating_sub(self.visible_messages);
        for message in &self.messages[start..] {
            output.push_str(message);
            output.push('\n');
        }
        output
    }

    /// Adds a message to the message history.
    pub fn add_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());

        // Keep only the most recent messages
        if self.messages.len() > self.max_messages {
            self.messages.remove(0);
        }
    }

    /// Logs a narrative line for every event in a turn that deserves one.
    pub fn narrate(&mut self, report: &TurnReport) {
        for event in &report.events {
            if let Some(line) = Self::describe(event) {
                self.add_message(line);
            }
        }
    }

    fn describe(event: &CrawlEvent) -> Option<String> {
        match event {
            CrawlEvent::TrapSprung { .. } => Some("A trap snaps shut around your ankle!".to_string()),
            CrawlEvent::RoomEntered { room, .. } => Some(format!("You enter {}.", room)),
            CrawlEvent::EnemyPerished { class, .. } => Some(match class {
                MovementClass::Reckless => "The reckless creature charges to its doom.".to_string(),
                other => format!("The {} creature perishes.", format!("{:?}", other).to_lowercase()),
            }),
            CrawlEvent::EncounterStarted(handoff) if handoff.initiated_by_player => {
                Some("You engage the enemy!".to_string())
            }
            CrawlEvent::EncounterStarted(_) => Some("An enemy catches you!".to_string()),
            CrawlEvent::DungeonExited { .. } => {
                Some("You step through the exit and leave the dungeon behind.".to_string())
            }
            CrawlEvent::Message(line) => Some(line.clone()),
            _ => None,
        }
    }
}
