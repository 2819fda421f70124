//! Optional per-session configuration chosen at creation time.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::{instrument, warn};

/// Accepted range for the player-count cap.
pub const PLAYER_COUNT_RANGE: RangeInclusive<usize> = 2..=8;
/// Accepted range for the number of drawing rounds.
pub const ROUND_COUNT_RANGE: RangeInclusive<u32> = 1..=10;
/// Accepted range for the per-round drawing time, in seconds.
pub const DRAWING_TIME_RANGE: RangeInclusive<u32> = 30..=300;

/// Settings a creator may attach to a new session.
///
/// `round_count` and `drawing_time` only affect the drawing game;
/// `player_count` lowers the capacity of any kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    /// Maximum number of players the creator wants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_count: Option<usize>,
    /// Number of drawing rounds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_count: Option<u32>,
    /// Seconds per drawing round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing_time: Option<u32>,
}

impl GameSettings {
    /// Checks every present field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns a description of the first out-of-range field.
    #[instrument]
    pub fn validate(&self) -> Result<(), String> {
        if let Some(count) = self.player_count {
            if !PLAYER_COUNT_RANGE.contains(&count) {
                warn!(count, "Player count out of range");
                return Err(format!(
                    "playerCount must be between {} and {}",
                    PLAYER_COUNT_RANGE.start(),
                    PLAYER_COUNT_RANGE.end()
                ));
            }
        }
        if let Some(rounds) = self.round_count {
            if !ROUND_COUNT_RANGE.contains(&rounds) {
                warn!(rounds, "Round count out of range");
                return Err(format!(
                    "roundCount must be between {} and {}",
                    ROUND_COUNT_RANGE.start(),
                    ROUND_COUNT_RANGE.end()
                ));
            }
        }
        if let Some(seconds) = self.drawing_time {
            if !DRAWING_TIME_RANGE.contains(&seconds) {
                warn!(seconds, "Drawing time out of range");
                return Err(format!(
                    "drawingTime must be between {} and {}",
                    DRAWING_TIME_RANGE.start(),
                    DRAWING_TIME_RANGE.end()
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_settings_are_valid() {
        assert!(GameSettings::default().validate().is_ok());
    }

    #[test]
    fn test_out_of_range_fields_rejected() {
        let settings = GameSettings {
            player_count: Some(9),
            ..GameSettings::default()
        };
        assert!(settings.validate().is_err());

        let settings = GameSettings {
            drawing_time: Some(10),
            ..GameSettings::default()
        };
        assert!(settings.validate().unwrap_err().contains("drawingTime"));
    }

    #[test]
    fn test_settings_parse_camel_case() {
        let settings: GameSettings =
            serde_json::from_str(r#"{"roundCount": 2, "drawingTime": 60}"#).unwrap();
        assert_eq!(settings.round_count, Some(2));
        assert_eq!(settings.drawing_time, Some(60));
        assert_eq!(settings.player_count, None);
    }
}
