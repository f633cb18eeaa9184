//! SQLite persistence for the game log and recorded predictions

use crate::data::store::GameLogStore;
use crate::{GameId, GamePrediction, HoopsError, Result, Role, TeamGameRecord, TeamId};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS team_games (
                game_id INTEGER NOT NULL,
                team_id INTEGER NOT NULL,
                season TEXT NOT NULL,
                game_date TEXT NOT NULL,
                role TEXT NOT NULL,
                team_name TEXT,
                wins REAL NOT NULL,
                losses REAL NOT NULL,
                home_wins REAL NOT NULL,
                home_losses REAL NOT NULL,
                road_wins REAL NOT NULL,
                road_losses REAL NOT NULL,
                fg_pct REAL NOT NULL,
                offensive_efficiency REAL NOT NULL,
                scoring_margin REAL NOT NULL,
                points REAL,
                PRIMARY KEY (game_id, team_id)
            );

            CREATE TABLE IF NOT EXISTS predictions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                game_date TEXT NOT NULL,
                season TEXT NOT NULL,
                home_team TEXT NOT NULL,
                away_team TEXT NOT NULL,
                home_win_prob REAL NOT NULL,
                predicted_winner TEXT NOT NULL,
                confidence REAL NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_team_games_date ON team_games(game_date);
            CREATE INDEX IF NOT EXISTS idx_team_games_team ON team_games(team_id, season);
            "#,
        )?;
        Ok(())
    }

    // ==================== Game Log ====================

    /// Append team-game rows; rows already present are left untouched.
    ///
    /// Returns the number of rows actually inserted.
    pub fn insert_team_games(&self, records: &[TeamGameRecord]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT OR IGNORE INTO team_games (
                    game_id, team_id, season, game_date, role, team_name,
                    wins, losses, home_wins, home_losses, road_wins, road_losses,
                    fg_pct, offensive_efficiency, scoring_margin, points
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
                "#,
            )?;
            for record in records {
                inserted += stmt.execute(params![
                    record.game_id.0 as i64,
                    record.team_id.0,
                    record.season,
                    record.game_date.format(DATE_FORMAT).to_string(),
                    record.role.as_str(),
                    record.team_name,
                    record.wins,
                    record.losses,
                    record.home_wins,
                    record.home_losses,
                    record.road_wins,
                    record.road_losses,
                    record.fg_pct,
                    record.offensive_efficiency,
                    record.scoring_margin,
                    record.points,
                ])?;
            }
        }
        tx.commit()?;
        Ok(inserted)
    }

    /// All stored rows in chronological order
    pub fn get_all_team_games(&self) -> Result<Vec<TeamGameRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, team_id, season, game_date, role, team_name,
                    wins, losses, home_wins, home_losses, road_wins, road_losses,
                    fg_pct, offensive_efficiency, scoring_margin, points
             FROM team_games
             ORDER BY game_date, game_id, role DESC",
        )?;

        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Build an indexed in-memory snapshot of the whole game log
    pub fn load_store(&self) -> Result<GameLogStore> {
        GameLogStore::new(self.get_all_team_games()?)
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<TeamGameRecord> {
        let date_str: String = row.get(3)?;
        let game_date = NaiveDate::parse_from_str(&date_str, DATE_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;

        let role_str: String = row.get(4)?;
        let role = Role::from_str_opt(&role_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                Type::Text,
                format!("unknown role {:?}", role_str).into(),
            )
        })?;

        let game_id: i64 = row.get(0)?;
        Ok(TeamGameRecord {
            game_id: GameId(game_id as u64),
            team_id: TeamId(row.get(1)?),
            season: row.get(2)?,
            game_date,
            role,
            team_name: row.get(5)?,
            wins: row.get(6)?,
            losses: row.get(7)?,
            home_wins: row.get(8)?,
            home_losses: row.get(9)?,
            road_wins: row.get(10)?,
            road_losses: row.get(11)?,
            fg_pct: row.get(12)?,
            offensive_efficiency: row.get(13)?,
            scoring_margin: row.get(14)?,
            points: row.get(15)?,
        })
    }

    // ==================== Predictions ====================

    /// Keep a served prediction for later comparison with the result
    pub fn record_prediction(
        &self,
        game_date: NaiveDate,
        season: &str,
        prediction: &GamePrediction,
    ) -> Result<()> {
        if !prediction.confidence.is_finite() {
            return Err(HoopsError::Model(format!(
                "refusing to record non-finite confidence for {} vs {}",
                prediction.home_team, prediction.away_team
            )));
        }
        self.conn.execute(
            "INSERT INTO predictions (game_date, season, home_team, away_team,
                                      home_win_prob, predicted_winner, confidence)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                game_date.format(DATE_FORMAT).to_string(),
                season,
                prediction.home_team,
                prediction.away_team,
                prediction.home_win_prob as f64,
                prediction.prediction,
                prediction.confidence,
            ],
        )?;
        Ok(())
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |sql: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as usize)
        };

        let min_date: Option<String> = self
            .conn
            .query_row("SELECT MIN(game_date) FROM team_games", [], |row| row.get(0))
            .optional()?
            .flatten();

        let max_date: Option<String> = self
            .conn
            .query_row("SELECT MAX(game_date) FROM team_games", [], |row| row.get(0))
            .optional()?
            .flatten();

        Ok(DatabaseStats {
            record_count: count("SELECT COUNT(*) FROM team_games")?,
            game_count: count("SELECT COUNT(DISTINCT game_id) FROM team_games")?,
            team_count: count("SELECT COUNT(DISTINCT team_id) FROM team_games")?,
            season_count: count("SELECT COUNT(DISTINCT season) FROM team_games")?,
            prediction_count: count("SELECT COUNT(*) FROM predictions")?,
            earliest_game: min_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            latest_game: max_date.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
        })
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub record_count: usize,
    pub game_count: usize,
    pub team_count: usize,
    pub season_count: usize,
    pub prediction_count: usize,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(game: u64, team: i64, role: Role, date: (i32, u32, u32)) -> TeamGameRecord {
        let won = role == Role::Home;
        TeamGameRecord {
            team_id: TeamId(team),
            game_id: GameId(game),
            season: "2024-25".to_string(),
            game_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            role,
            team_name: Some(format!("T{}", team)),
            wins: if won { 1.0 } else { 0.0 },
            losses: if won { 0.0 } else { 1.0 },
            home_wins: if won { 1.0 } else { 0.0 },
            home_losses: 0.0,
            road_wins: 0.0,
            road_losses: if won { 0.0 } else { 1.0 },
            fg_pct: 0.47,
            offensive_efficiency: 0.58,
            scoring_margin: if won { 7.0 } else { -7.0 },
            points: None,
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.record_count, 0);
        assert_eq!(stats.game_count, 0);
        assert!(stats.earliest_game.is_none());
    }

    #[test]
    fn test_insert_is_append_only() {
        let db = Database::in_memory().unwrap();
        let rows = vec![
            record(22400001, 1, Role::Home, (2024, 10, 22)),
            record(22400001, 2, Role::Away, (2024, 10, 22)),
        ];

        assert_eq!(db.insert_team_games(&rows).unwrap(), 2);
        assert_eq!(db.insert_team_games(&rows).unwrap(), 0);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.record_count, 2);
        assert_eq!(stats.game_count, 1);
        assert_eq!(stats.team_count, 2);
        assert_eq!(stats.season_count, 1);
    }

    #[test]
    fn test_records_round_trip_in_date_order() {
        let db = Database::in_memory().unwrap();
        let rows = vec![
            record(22400009, 2, Role::Away, (2024, 11, 2)),
            record(22400001, 1, Role::Home, (2024, 10, 22)),
            record(22400009, 1, Role::Home, (2024, 11, 2)),
        ];
        db.insert_team_games(&rows).unwrap();

        let loaded = db.get_all_team_games().unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], rows[1]);
        assert_eq!(loaded[1], rows[2]);
        assert_eq!(loaded[2], rows[0]);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.earliest_game, NaiveDate::from_ymd_opt(2024, 10, 22));
        assert_eq!(stats.latest_game, NaiveDate::from_ymd_opt(2024, 11, 2));
    }

    #[test]
    fn test_record_prediction() {
        let db = Database::in_memory().unwrap();
        let prediction = GamePrediction {
            home_team: "Celtics".to_string(),
            away_team: "Knicks".to_string(),
            time: "7:30 pm ET".to_string(),
            home_score: 0,
            away_score: 0,
            prediction: "Celtics".to_string(),
            confidence: 64.12,
            home_win_prob: 0.6412,
        };
        db.record_prediction(NaiveDate::from_ymd_opt(2024, 12, 1).unwrap(), "2024-25", &prediction)
            .unwrap();
        assert_eq!(db.get_stats().unwrap().prediction_count, 1);
    }
}
