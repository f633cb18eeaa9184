//! NBA game winner prediction
//!
//! Builds leak-free, point-in-time matchup features from a log of per-team
//! box scores and feeds them to a win/loss classifier.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;
pub mod training;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stable team identifier as issued by the stats provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Game identifier shared by both sides of a game.
///
/// The provider hands these out as fixed-width strings with leading zeros
/// (`0022400061`); they are kept numeric and padded back on display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameId(pub u64);

impl GameId {
    pub const WIDTH: usize = 10;

    /// Parse integer, zero-padded or float-rendered (`22400061.0`) text
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let trimmed = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        trimmed.parse().ok().map(GameId)
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = Self::WIDTH)
    }
}

/// Which side of the game a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Home,
    Away,
}

impl Role {
    /// Sentinel the scraper writes into the CITY column of the visiting side
    pub const AWAY_SENTINEL: &'static str = "OPPONENTS";

    pub fn from_city(city: &str) -> Self {
        if city.trim() == Self::AWAY_SENTINEL {
            Role::Away
        } else {
            Role::Home
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Home => "home",
            Role::Away => "away",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "home" => Some(Role::Home),
            "away" => Some(Role::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One team's box score for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamGameRecord {
    pub team_id: TeamId,
    pub game_id: GameId,
    pub season: String,
    pub game_date: NaiveDate,
    pub role: Role,
    pub team_name: Option<String>,
    /// 1.0 for a win, 0.0 otherwise
    pub wins: f64,
    pub losses: f64,
    pub home_wins: f64,
    pub home_losses: f64,
    pub road_wins: f64,
    pub road_losses: f64,
    pub fg_pct: f64,
    pub offensive_efficiency: f64,
    /// This team's points minus the opponent's
    pub scoring_margin: f64,
    pub points: Option<f64>,
}

impl TeamGameRecord {
    pub fn won(&self) -> bool {
        self.wins >= 0.5
    }
}

/// A scheduled or live game on today's slate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fixture {
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    /// Display names; left empty, they are filled from the game log
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    /// Scheduled tip-off or live clock text
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub home_score: u32,
    #[serde(default)]
    pub away_score: u32,
}

/// One entry of the prediction report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePrediction {
    pub home_team: String,
    pub away_team: String,
    pub time: String,
    pub home_score: u32,
    pub away_score: u32,
    /// Name of the predicted winner
    pub prediction: String,
    /// Winning-class probability in percent, two decimals
    pub confidence: f64,
    #[serde(skip)]
    pub home_win_prob: f32,
}

/// Derive the season label (`2024-25`) a date belongs to.
///
/// Seasons tip off in October, so October through December open a new label.
pub fn season_label(date: NaiveDate) -> String {
    let start = if date.month() >= 10 {
        date.year()
    } else {
        date.year() - 1
    };
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum HoopsError {
    #[error("{source_name} is missing required columns: {}", .columns.join(", "))]
    MissingColumns {
        source_name: String,
        columns: Vec<String>,
    },

    #[error("Feature table columns do not match: expected {expected:?}, found {found:?}")]
    ColumnMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Invalid record on line {line}: {message}")]
    InvalidRecord { line: u64, message: String },

    #[error("Duplicate record for game {game_id} and {team_id}")]
    DuplicateRecord { game_id: GameId, team_id: TeamId },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("No data: {0}")]
    Empty(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, HoopsError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub season: SeasonConfig,
    #[serde(default)]
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
    pub feature_table_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/hoops.db".to_string(),
            feature_table_path: "data/finalModelTraining.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeasonConfig {
    /// Overrides the label derived from the prediction date
    pub current: Option<String>,
}

impl SeasonConfig {
    pub fn label_for(&self, as_of: NaiveDate) -> String {
        self.current
            .clone()
            .unwrap_or_else(|| season_label(as_of))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub learning_rate: f64,
    pub test_ratio: f64,
    pub seed: u64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            epochs: 400,
            learning_rate: 0.1,
            test_ratio: 0.2,
            seed: 42,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            HoopsError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| HoopsError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| HoopsError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_id_parsing() {
        assert_eq!(GameId::parse("0022400061"), Some(GameId(22400061)));
        assert_eq!(GameId::parse("22400061"), Some(GameId(22400061)));
        assert_eq!(GameId::parse("22400061.0"), Some(GameId(22400061)));
        assert_eq!(GameId::parse("abc"), None);
        assert_eq!(GameId::parse(""), None);
        assert_eq!(GameId(22400061).to_string(), "0022400061");
    }

    #[test]
    fn test_role_from_city() {
        assert_eq!(Role::from_city("OPPONENTS"), Role::Away);
        assert_eq!(Role::from_city("Boston"), Role::Home);
        assert_eq!(Role::from_city(""), Role::Home);
    }

    #[test]
    fn test_season_label() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(season_label(d(2024, 10, 22)), "2024-25");
        assert_eq!(season_label(d(2025, 4, 13)), "2024-25");
        assert_eq!(season_label(d(2099, 11, 1)), "2099-00");
        assert_eq!(season_label(d(2009, 1, 5)), "2008-09");
    }

    #[test]
    fn test_config_roundtrip_defaults() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.training.seed, 42);
        assert_eq!(parsed.data.database_path, "data/hoops.db");
        assert!(parsed.season.current.is_none());
    }

    #[test]
    fn test_config_partial_file_uses_defaults() {
        let parsed: Config = toml::from_str("[season]\ncurrent = \"2023-24\"\n").unwrap();
        assert_eq!(parsed.season.current.as_deref(), Some("2023-24"));
        assert_eq!(parsed.training.epochs, 400);
    }
}
