use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid session config: {0}")]
    Json(#[from] serde_json::Error),
}

/// Standard board presets plus the clamped custom size from the settings dialog.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
    Custom(GameConfig),
}

impl Difficulty {
    pub const CUSTOM_ROWS: (Coord, Coord) = (5, 30);
    pub const CUSTOM_COLS: (Coord, Coord) = (5, 50);

    /// Rows 5..=30, cols 5..=50, and at least one mine while leaving a 3x3 opening free.
    pub fn custom(rows: Coord, cols: Coord, mines: CellCount) -> Self {
        let rows = rows.clamp(Self::CUSTOM_ROWS.0, Self::CUSTOM_ROWS.1);
        let cols = cols.clamp(Self::CUSTOM_COLS.0, Self::CUSTOM_COLS.1);
        let mines = mines.clamp(1, mult(rows, cols) - 9);
        Self::Custom(GameConfig::new_unchecked((rows, cols), mines))
    }

    pub const fn config(self) -> GameConfig {
        match self {
            Self::Easy => GameConfig::new_unchecked((9, 9), 10),
            Self::Medium => GameConfig::new_unchecked((16, 16), 40),
            Self::Hard => GameConfig::new_unchecked((16, 30), 99),
            Self::Custom(config) => config,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum GameVariant {
    #[default]
    Classic,
    /// Energy spawns on revealed cells and can be spent to force hidden cells.
    Warp,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub flag_semantics: FlagSemantics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub difficulty: Difficulty,
    pub variant: GameVariant,
    pub analysis: AnalysisConfig,
    pub warp: WarpSchedule,
    /// Seeds mine placement, energy spawns and warp repair.
    pub seed: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            variant: GameVariant::default(),
            analysis: AnalysisConfig::default(),
            warp: WarpSchedule::default(),
            seed: 0,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config.sanitized())
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn game(&self) -> GameConfig {
        let config = self.difficulty.config();
        GameConfig::new(config.size, config.mines)
    }

    fn sanitized(mut self) -> Self {
        if let Difficulty::Custom(config) = self.difficulty {
            self.difficulty = Difficulty::custom(config.size.0, config.size.1, config.mines);
        }
        self.warp = self.warp.sanitized();
        self
    }
}

/// Limits for the sandbox editor.
pub struct SandboxLimits;

impl SandboxLimits {
    pub const ROWS: (Coord, Coord) = (2, 30);
    pub const COLS: (Coord, Coord) = (2, 50);

    pub fn clamp_size((rows, cols): Coord2) -> Coord2 {
        (
            rows.clamp(Self::ROWS.0, Self::ROWS.1),
            cols.clamp(Self::COLS.0, Self::COLS.1),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets() {
        assert_eq!(Difficulty::Easy.config(), GameConfig::new((9, 9), 10));
        assert_eq!(Difficulty::Medium.config().mines, 40);
        assert_eq!(Difficulty::Hard.config().size, (16, 30));
    }

    #[test]
    fn custom_is_clamped() {
        let small = Difficulty::custom(1, 100, 0).config();
        assert_eq!(small.size, (5, 50));
        assert_eq!(small.mines, 1);

        let crowded = Difficulty::custom(5, 5, 500).config();
        assert_eq!(crowded.mines, 16);
    }

    #[test]
    fn json_defaults_fill_missing_fields() {
        let config = SessionConfig::from_json(r#"{"variant": "Warp", "seed": 7}"#).unwrap();

        assert_eq!(config.variant, GameVariant::Warp);
        assert_eq!(config.seed, 7);
        assert_eq!(config.difficulty, Difficulty::Easy);
        assert_eq!(config.warp, WarpSchedule::default());
        assert_eq!(config.analysis.flag_semantics, FlagSemantics::Soft);
    }

    #[test]
    fn json_custom_size_is_clamped() {
        let json = r#"{"difficulty": {"Custom": {"size": [40, 3], "mines": 2000}}}"#;

        let config = SessionConfig::from_json(json).unwrap();

        assert_eq!(config.game(), GameConfig::new_unchecked((30, 5), 141));
    }

    #[test]
    fn json_round_trip_keeps_settings() {
        let mut config = SessionConfig::default();
        config.difficulty = Difficulty::Hard;
        config.analysis.flag_semantics = FlagSemantics::Strict;

        let parsed = SessionConfig::from_json(&config.to_json().unwrap()).unwrap();

        assert_eq!(parsed, config);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            SessionConfig::from_json("{"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn sandbox_limits() {
        assert_eq!(SandboxLimits::clamp_size((1, 80)), (2, 50));
    }
}
