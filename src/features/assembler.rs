//! Matchup assembly
//!
//! Bulk mode turns every complete game of the log into a labelled training
//! row. Live mode builds unlabelled rows for upcoming games as of a date.

use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};

use crate::data::store::GameLogStore;
use crate::features::matchup::{MatchupFeatureRow, MatchupFeatures};
use crate::features::rolling::{FormTable, TeamForm};
use crate::{GameId, Role, TeamGameRecord, TeamId};

/// Prior games in the current season each side needs before live rows use
/// real form instead of neutral defaults
pub const MIN_LIVE_HISTORY: usize = 5;

/// Game ids listed when reporting dropped games
const DROPPED_PREVIEW: usize = 10;

/// Output of a bulk build
#[derive(Debug, Clone, Default)]
pub struct TrainingTable {
    /// One row per complete game, chronological
    pub rows: Vec<MatchupFeatureRow>,
    /// Games with only one side present
    pub dropped_games: Vec<GameId>,
}

impl TrainingTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Share of rows the home side won
    pub fn home_win_rate(&self) -> f64 {
        let labelled: Vec<bool> = self.rows.iter().filter_map(|r| r.home_win).collect();
        if labelled.is_empty() {
            return 0.0;
        }
        labelled.iter().filter(|w| **w).count() as f64 / labelled.len() as f64
    }
}

/// Build one labelled row per game that has both a home and an away side
pub fn build_training_table(store: &GameLogStore) -> TrainingTable {
    let forms = FormTable::build(store);

    let mut away_sides: HashMap<(GameId, &str), &TeamGameRecord> = HashMap::new();
    for record in store.records().iter().filter(|r| r.role == Role::Away) {
        away_sides
            .entry((record.game_id, record.season.as_str()))
            .or_insert(record);
    }

    let mut rows = Vec::new();
    let mut joined: HashSet<(GameId, &str)> = HashSet::new();
    let mut dropped: HashSet<GameId> = HashSet::new();

    // Store order is chronological, so rows come out chronological too
    for home in store.records().iter().filter(|r| r.role == Role::Home) {
        let key = (home.game_id, home.season.as_str());
        let Some(away) = away_sides.get(&key) else {
            dropped.insert(home.game_id);
            continue;
        };
        if !joined.insert(key) {
            continue;
        }

        let home_form = forms
            .get(home.game_id, home.team_id)
            .copied()
            .unwrap_or_else(TeamForm::neutral);
        let away_form = forms
            .get(away.game_id, away.team_id)
            .copied()
            .unwrap_or_else(TeamForm::neutral);
        let head_to_head = store
            .head_to_head()
            .resolve(home.team_id, away.team_id, home.game_date);

        rows.push(MatchupFeatureRow {
            game_id: Some(home.game_id),
            season: home.season.clone(),
            game_date: home.game_date,
            home_team_id: home.team_id,
            away_team_id: away.team_id,
            features: MatchupFeatures::new(home_form, away_form, head_to_head),
            home_win: Some(home.won()),
        });
    }

    for key in away_sides.keys() {
        if !joined.contains(key) {
            dropped.insert(key.0);
        }
    }

    let mut dropped_games: Vec<GameId> = dropped.into_iter().collect();
    dropped_games.sort();

    if !dropped_games.is_empty() {
        log::warn!(
            "Dropped {} games with only one side in the log",
            dropped_games.len()
        );
        log::debug!(
            "First dropped games: {:?}",
            dropped_games
                .iter()
                .take(DROPPED_PREVIEW)
                .map(|g| g.to_string())
                .collect::<Vec<_>>()
        );
    }
    log::info!("Assembled {} training rows", rows.len());

    TrainingTable {
        rows,
        dropped_games,
    }
}

/// Build an unlabelled row for each (home, away) pair as of `as_of`.
///
/// Form is computed from `season` games dated strictly before `as_of`;
/// head-to-head uses every season. When either side has fewer than
/// [`MIN_LIVE_HISTORY`] such games, both sides fall back to neutral form;
/// head-to-head is still resolved from history in that case.
pub fn build_live_rows(
    store: &GameLogStore,
    matchups: &[(TeamId, TeamId)],
    as_of: NaiveDate,
    season: &str,
) -> Vec<MatchupFeatureRow> {
    matchups
        .iter()
        .map(|&(home, away)| build_live_row(store, home, away, as_of, season))
        .collect()
}

pub fn build_live_row(
    store: &GameLogStore,
    home: TeamId,
    away: TeamId,
    as_of: NaiveDate,
    season: &str,
) -> MatchupFeatureRow {
    let home_prior = store.team_season_games_before(home, season, as_of);
    let away_prior = store.team_season_games_before(away, season, as_of);

    let (home_form, away_form) =
        if home_prior.len() < MIN_LIVE_HISTORY || away_prior.len() < MIN_LIVE_HISTORY {
            log::warn!(
                "Neutral form for {} vs {} in {}: {} and {} prior games",
                home,
                away,
                season,
                home_prior.len(),
                away_prior.len()
            );
            (TeamForm::neutral(), TeamForm::neutral())
        } else {
            (
                TeamForm::from_prior(&home_prior, as_of),
                TeamForm::from_prior(&away_prior, as_of),
            )
        };

    let head_to_head = store.head_to_head().resolve(home, away, as_of);

    MatchupFeatureRow {
        game_id: None,
        season: season.to_string(),
        game_date: as_of,
        home_team_id: home,
        away_team_id: away,
        features: MatchupFeatures::new(home_form, away_form, head_to_head),
        home_win: None,
    }
}
