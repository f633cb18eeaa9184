//! In-memory, indexed snapshot of the game log
//!
//! Feature builders only ever read from a [`GameLogStore`]. A refresh builds a
//! new store and swaps it into the [`StoreHandle`] in one step, so a reader
//! holding the previous snapshot never observes a half-written log.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::features::head_to_head::HeadToHeadIndex;
use crate::{GameId, HoopsError, Result, Role, TeamGameRecord, TeamId};

/// Data-quality findings from loading a game log.
///
/// These are logged rather than treated as fatal: the bulk join drops
/// incomplete games on its own.
#[derive(Debug, Clone, Default)]
pub struct IntegrityReport {
    pub game_count: usize,
    /// Games with only one side present
    pub incomplete_games: Vec<GameId>,
    /// Games whose two rows do not carry one home and one away side
    pub role_conflicts: Vec<GameId>,
    /// Games whose two scoring margins do not cancel out
    pub margin_mismatches: Vec<GameId>,
}

impl IntegrityReport {
    fn check(records: &[TeamGameRecord]) -> Self {
        let mut by_game: HashMap<GameId, Vec<&TeamGameRecord>> = HashMap::new();
        for record in records {
            by_game.entry(record.game_id).or_default().push(record);
        }

        let mut report = IntegrityReport {
            game_count: by_game.len(),
            ..Default::default()
        };

        for (game_id, sides) in &by_game {
            if sides.len() != 2 {
                report.incomplete_games.push(*game_id);
                continue;
            }
            let (a, b) = (sides[0], sides[1]);
            if a.role == b.role {
                report.role_conflicts.push(*game_id);
            }
            if (a.scoring_margin + b.scoring_margin).abs() > 1e-6 {
                report.margin_mismatches.push(*game_id);
            }
        }

        report.incomplete_games.sort();
        report.role_conflicts.sort();
        report.margin_mismatches.sort();
        report
    }

    pub fn is_clean(&self) -> bool {
        self.incomplete_games.is_empty()
            && self.role_conflicts.is_empty()
            && self.margin_mismatches.is_empty()
    }

    fn log(&self) {
        if !self.incomplete_games.is_empty() {
            log::warn!(
                "{} of {} games have only one side in the log",
                self.incomplete_games.len(),
                self.game_count
            );
        }
        if !self.role_conflicts.is_empty() {
            log::warn!(
                "{} games do not have exactly one home and one away side",
                self.role_conflicts.len()
            );
        }
        if !self.margin_mismatches.is_empty() {
            log::warn!(
                "{} games have scoring margins that do not cancel out",
                self.margin_mismatches.len()
            );
        }
    }
}

/// Immutable, indexed view over every team-game row
#[derive(Debug)]
pub struct GameLogStore {
    /// Sorted by (date, game id), home side first
    records: Vec<TeamGameRecord>,
    /// Positions into `records`, per team, chronological
    by_team: HashMap<TeamId, Vec<usize>>,
    head_to_head: HeadToHeadIndex,
    integrity: IntegrityReport,
}

impl GameLogStore {
    /// Index a set of rows. Two rows for the same (game, team) are rejected.
    pub fn new(mut records: Vec<TeamGameRecord>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(records.len());
        for record in &records {
            if !seen.insert((record.game_id, record.team_id)) {
                return Err(HoopsError::DuplicateRecord {
                    game_id: record.game_id,
                    team_id: record.team_id,
                });
            }
        }

        records.sort_by(|a, b| {
            (a.game_date, a.game_id, a.role == Role::Away).cmp(&(
                b.game_date,
                b.game_id,
                b.role == Role::Away,
            ))
        });

        let mut by_team: HashMap<TeamId, Vec<usize>> = HashMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_team.entry(record.team_id).or_default().push(idx);
        }

        let integrity = IntegrityReport::check(&records);
        integrity.log();

        let head_to_head = HeadToHeadIndex::build(&records);

        log::debug!(
            "Indexed {} rows for {} teams, {} head-to-head pairings",
            records.len(),
            by_team.len(),
            head_to_head.pair_count()
        );

        Ok(GameLogStore {
            records,
            by_team,
            head_to_head,
            integrity,
        })
    }

    pub fn empty() -> Self {
        GameLogStore {
            records: Vec::new(),
            by_team: HashMap::new(),
            head_to_head: HeadToHeadIndex::default(),
            integrity: IntegrityReport::default(),
        }
    }

    pub fn records(&self) -> &[TeamGameRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn integrity(&self) -> &IntegrityReport {
        &self.integrity
    }

    pub fn head_to_head(&self) -> &HeadToHeadIndex {
        &self.head_to_head
    }

    /// Every game a team has played, chronological
    pub fn team_games(&self, team: TeamId) -> impl Iterator<Item = &TeamGameRecord> + '_ {
        self.by_team
            .get(&team)
            .map(|idx| idx.as_slice())
            .unwrap_or_default()
            .iter()
            .map(move |&i| &self.records[i])
    }

    /// A team's games in one season dated strictly before `before`, chronological
    pub fn team_season_games_before(
        &self,
        team: TeamId,
        season: &str,
        before: NaiveDate,
    ) -> Vec<&TeamGameRecord> {
        self.team_games(team)
            .take_while(|r| r.game_date < before)
            .filter(|r| r.season == season)
            .collect()
    }

    /// Name the team most recently played under, if the log carries one
    pub fn team_name(&self, team: TeamId) -> Option<&str> {
        self.team_games(team)
            .filter_map(|r| r.team_name.as_deref())
            .last()
    }
}

/// Shared, swappable reference to the current store
#[derive(Debug)]
pub struct StoreHandle {
    current: RwLock<Arc<GameLogStore>>,
}

impl StoreHandle {
    pub fn new(store: GameLogStore) -> Self {
        StoreHandle {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// The store as of now; later swaps do not affect the returned snapshot
    pub fn snapshot(&self) -> Arc<GameLogStore> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install a freshly loaded store, returning the one it replaces
    pub fn replace(&self, store: GameLogStore) -> Arc<GameLogStore> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::{game, GameSpec};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_store_sorts_and_indexes_by_team() {
        let mut rows = Vec::new();
        rows.extend(game(GameSpec::new(2, 1, 10, (2024, 11, 3), 5.0)));
        rows.extend(game(GameSpec::new(1, 1, 20, (2024, 10, 25), -3.0)));
        let store = GameLogStore::new(rows).unwrap();

        let dates: Vec<_> = store.team_games(TeamId(1)).map(|r| r.game_date).collect();
        assert_eq!(dates, vec![date(2024, 10, 25), date(2024, 11, 3)]);
        assert_eq!(store.records()[0].role, Role::Home);
        assert!(store.integrity().is_clean());
        assert_eq!(store.team_games(TeamId(99)).count(), 0);
    }

    #[test]
    fn test_duplicate_rows_are_rejected() {
        let mut rows = game(GameSpec::new(1, 1, 2, (2024, 10, 25), 4.0));
        rows.push(rows[0].clone());
        assert!(matches!(
            GameLogStore::new(rows),
            Err(HoopsError::DuplicateRecord { .. })
        ));
    }

    #[test]
    fn test_integrity_findings() {
        let mut rows = game(GameSpec::new(1, 1, 2, (2024, 10, 25), 4.0));
        rows[1].scoring_margin = -3.0;
        let mut lonely = game(GameSpec::new(2, 1, 3, (2024, 10, 27), 2.0));
        lonely.truncate(1);
        rows.extend(lonely);

        let store = GameLogStore::new(rows).unwrap();
        let report = store.integrity();
        assert_eq!(report.game_count, 2);
        assert_eq!(report.incomplete_games, vec![GameId(2)]);
        assert_eq!(report.margin_mismatches, vec![GameId(1)]);
        assert!(!report.is_clean());
    }

    #[test]
    fn test_season_games_before_is_strict() {
        let mut rows = Vec::new();
        rows.extend(game(GameSpec::new(1, 1, 2, (2024, 10, 25), 4.0)));
        rows.extend(game(GameSpec::new(2, 3, 1, (2024, 10, 27), 2.0)));
        let mut other = game(GameSpec::new(3, 1, 2, (2024, 4, 1), 1.0));
        for r in &mut other {
            r.season = "2023-24".to_string();
        }
        rows.extend(other);
        let store = GameLogStore::new(rows).unwrap();

        let prior = store.team_season_games_before(TeamId(1), "2024-25", date(2024, 10, 27));
        assert_eq!(prior.len(), 1);
        assert_eq!(prior[0].game_id, GameId(1));
    }

    #[test]
    fn test_snapshot_survives_replace() {
        let handle = StoreHandle::new(GameLogStore::empty());
        let before = handle.snapshot();

        let store = GameLogStore::new(game(GameSpec::new(1, 1, 2, (2024, 10, 25), 4.0))).unwrap();
        let previous = handle.replace(store);

        assert!(before.is_empty());
        assert!(previous.is_empty());
        assert_eq!(handle.snapshot().len(), 2);
    }
}
