//! Turn-based consumer policy.
//!
//! The core emits confirmed labels; what a label *means* is the consumer's
//! decision. This module carries the stock policy of the hand-pose game
//! client: one designated label resets the game, labels "1".."9" select a
//! board cell, anything else is ignored. A game engine plugs in behind
//! `TurnCommand`; the minimax search itself is not part of this crate.

use serde::{Deserialize, Serialize};

/// Action a confirmed label maps to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnCommand {
    /// Start a new game.
    Reset,
    /// Play the given board cell (1..=9).
    Move(u8),
    /// Label has no meaning for this consumer.
    Unmapped,
}

/// Maps confirmed labels to turn commands.
///
/// Feed it confirmations only (see `ConfirmationLatch`); feeding every
/// published snapshot would replay the same move once per frame.
#[derive(Clone, Debug)]
pub struct TurnMapper {
    reset_label: String,
}

impl TurnMapper {
    pub fn new(reset_label: impl Into<String>) -> Self {
        Self {
            reset_label: reset_label.into(),
        }
    }

    pub fn reset_label(&self) -> &str {
        &self.reset_label
    }

    /// Map one confirmed label to a command.
    pub fn map(&self, label: &str) -> TurnCommand {
        if label == self.reset_label {
            return TurnCommand::Reset;
        }
        match label.parse::<u8>() {
            Ok(cell) if (1..=9).contains(&cell) => TurnCommand::Move(cell),
            _ => TurnCommand::Unmapped,
        }
    }
}

impl Default for TurnMapper {
    /// Both hands open ("10") is the stock reset gesture.
    fn default() -> Self {
        Self::new("10")
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_labels_map_to_cells() {
        let mapper = TurnMapper::default();
        for cell in 1..=9u8 {
            assert_eq!(mapper.map(&cell.to_string()), TurnCommand::Move(cell));
        }
    }

    #[test]
    fn reset_label_maps_to_reset() {
        let mapper = TurnMapper::default();
        assert_eq!(mapper.map("10"), TurnCommand::Reset);

        let custom = TurnMapper::new("0");
        assert_eq!(custom.map("0"), TurnCommand::Reset);
        assert_eq!(custom.map("10"), TurnCommand::Unmapped);
    }

    #[test]
    fn unknown_labels_are_unmapped() {
        let mapper = TurnMapper::default();
        assert_eq!(mapper.map("11"), TurnCommand::Unmapped);
        assert_eq!(mapper.map("fist"), TurnCommand::Unmapped);
        assert_eq!(mapper.map(""), TurnCommand::Unmapped);
    }

    #[test]
    fn reset_label_wins_over_cell_parse() {
        // A consumer may designate a cell digit as its reset gesture; the
        // reset meaning takes precedence.
        let mapper = TurnMapper::new("9");
        assert_eq!(mapper.map("9"), TurnCommand::Reset);
        assert_eq!(mapper.map("8"), TurnCommand::Move(8));
    }
}
