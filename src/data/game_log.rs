//! CSV ingestion of the per-team game log written by the scraper
//!
//! The header is validated before any row is parsed: a file missing one of the
//! required columns is rejected outright instead of yielding half-filled rows.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{GameId, HoopsError, Result, Role, TeamGameRecord, TeamId};

/// Columns every game log row must carry
pub const REQUIRED_COLUMNS: [&str; 14] = [
    "TEAM_ID",
    "GAME_ID",
    "SEASON",
    "GAME_DATE",
    "CITY",
    "W",
    "L",
    "W_HOME",
    "L_HOME",
    "W_ROAD",
    "L_ROAD",
    "FG_PCT",
    "OFFENSIVE_EFFICIENCY",
    "SCORING_MARGIN",
];

/// Required columns, in [`REQUIRED_COLUMNS`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    TeamId,
    GameId,
    Season,
    GameDate,
    City,
    W,
    L,
    WHome,
    LHome,
    WRoad,
    LRoad,
    FgPct,
    OffensiveEfficiency,
    ScoringMargin,
}

impl Column {
    fn name(self) -> &'static str {
        REQUIRED_COLUMNS[self as usize]
    }
}

/// Positions of the known columns within a header row
#[derive(Debug, Clone)]
struct ColumnIndex {
    required: [usize; REQUIRED_COLUMNS.len()],
    nickname: Option<usize>,
    points: Option<usize>,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord, source_name: &str) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let mut required = [0usize; REQUIRED_COLUMNS.len()];
        let mut missing = Vec::new();
        for (slot, name) in REQUIRED_COLUMNS.iter().enumerate() {
            match position(name) {
                Some(idx) => required[slot] = idx,
                None => missing.push(name.to_string()),
            }
        }

        if !missing.is_empty() {
            return Err(HoopsError::MissingColumns {
                source_name: source_name.to_string(),
                columns: missing,
            });
        }

        Ok(ColumnIndex {
            required,
            nickname: position("NICKNAME"),
            points: position("PTS"),
        })
    }

    fn field<'r>(&self, row: &'r StringRecord, column: Column) -> &'r str {
        row.get(self.required[column as usize]).unwrap_or("")
    }

    fn parse_row(&self, row: &StringRecord, line: u64) -> Result<TeamGameRecord> {
        let invalid = |message: String| HoopsError::InvalidRecord { line, message };

        let team_raw = self.field(row, Column::TeamId);
        let team_id = parse_team_id(team_raw)
            .ok_or_else(|| invalid(format!("TEAM_ID {:?} is not an integer", team_raw)))?;

        let game_raw = self.field(row, Column::GameId);
        let game_id = GameId::parse(game_raw)
            .ok_or_else(|| invalid(format!("GAME_ID {:?} is not an integer", game_raw)))?;

        let season = self.field(row, Column::Season).to_string();
        if season.is_empty() {
            return Err(invalid("SEASON is empty".to_string()));
        }

        let date_raw = self.field(row, Column::GameDate);
        let game_date = parse_game_date(date_raw)
            .ok_or_else(|| invalid(format!("GAME_DATE {:?} is not YYYY-MM-DD", date_raw)))?;

        let number = |column: Column| -> Result<f64> {
            let raw = self.field(row, column);
            parse_number(raw)
                .ok_or_else(|| invalid(format!("{} {:?} is not a number", column.name(), raw)))
        };

        let team_name = self
            .nickname
            .and_then(|idx| row.get(idx))
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let points = self
            .points
            .and_then(|idx| row.get(idx))
            .and_then(parse_number);

        Ok(TeamGameRecord {
            team_id,
            game_id,
            season,
            game_date,
            role: Role::from_city(self.field(row, Column::City)),
            team_name,
            wins: number(Column::W)?,
            losses: number(Column::L)?,
            home_wins: number(Column::WHome)?,
            home_losses: number(Column::LHome)?,
            road_wins: number(Column::WRoad)?,
            road_losses: number(Column::LRoad)?,
            fg_pct: number(Column::FgPct)?,
            offensive_efficiency: number(Column::OffensiveEfficiency)?,
            scoring_margin: number(Column::ScoringMargin)?,
            points,
        })
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_team_id(raw: &str) -> Option<TeamId> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Some(TeamId(id));
    }
    // pandas writes integer columns holding NaNs as floats
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value.fract() == 0.0 {
        Some(TeamId(value as i64))
    } else {
        None
    }
}

/// Accepts `2024-10-22`, `2024-10-22 00:00:00` and `2024-10-22T19:30:00`
fn parse_game_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let day = raw.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Read a game log CSV from disk
pub fn read_game_log<P: AsRef<Path>>(path: P) -> Result<Vec<TeamGameRecord>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    read_game_log_from(file, &path.display().to_string())
}

/// Read a game log CSV from any reader
pub fn read_game_log_from<R: Read>(reader: R, source_name: &str) -> Result<Vec<TeamGameRecord>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::resolve(&headers, source_name)?;

    let mut records = Vec::new();
    let mut seen = HashSet::new();
    for (idx, row) in reader.records().enumerate() {
        let row = row?;
        let line = row
            .position()
            .map(|p| p.line())
            .unwrap_or(idx as u64 + 2);
        let record = columns.parse_row(&row, line)?;
        if !seen.insert((record.game_id, record.team_id)) {
            return Err(HoopsError::DuplicateRecord {
                game_id: record.game_id,
                team_id: record.team_id,
            });
        }
        records.push(record);
    }

    let seasons: BTreeSet<&str> = records.iter().map(|r| r.season.as_str()).collect();
    let games: HashSet<GameId> = records.iter().map(|r| r.game_id).collect();
    log::info!(
        "Read {} team-game rows ({} games, {} seasons) from {}",
        records.len(),
        games.len(),
        seasons.len(),
        source_name
    );

    Ok(records)
}
