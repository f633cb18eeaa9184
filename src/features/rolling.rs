//! Rolling team form
//!
//! Every statistic here is a "before" statistic: the value attached to a
//! team's game `i` is aggregated over that team's games `0..i` of the same
//! season and never looks at game `i` itself.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::data::store::GameLogStore;
use crate::{GameId, TeamGameRecord, TeamId};

/// Trailing games averaged for offensive efficiency, margin and FG%
pub const ROLLING_WINDOW: usize = 5;
/// Trailing games summed for recent form
pub const FORM_WINDOW: usize = 3;
/// Rest days are capped here
pub const MAX_REST_DAYS: i64 = 30;

pub const NEUTRAL_WIN_PCT: f64 = 0.5;
pub const NEUTRAL_ROLLING_OE: f64 = 0.5;
pub const NEUTRAL_ROLLING_MARGIN: f64 = 0.0;
pub const NEUTRAL_ROLLING_FG_PCT: f64 = 0.45;
pub const NEUTRAL_LAST_3_WINS: f64 = 1.0;
pub const NEUTRAL_REST_DAYS: i64 = 7;

/// A team's form going into a game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamForm {
    pub home_win_pct: f64,
    pub away_win_pct: f64,
    pub total_win_pct: f64,
    pub rest_days: i64,
    pub is_back_to_back: bool,
    pub rolling_oe: f64,
    pub rolling_scoring_margin: f64,
    pub rolling_fg_pct: f64,
    pub last_3_wins: f64,
}

impl TeamForm {
    pub const DIM: usize = 9;

    /// Column names, without the HOME_/AWAY_ side prefix
    pub const COLUMNS: [&'static str; Self::DIM] = [
        "LAST_GAME_HOME_WIN_PCTG",
        "LAST_GAME_AWAY_WIN_PCTG",
        "LAST_GAME_TOTAL_WIN_PCTG",
        "NUM_REST_DAYS",
        "IS_BACK_TO_BACK",
        "LAST_GAME_ROLLING_OE",
        "LAST_GAME_ROLLING_SCORING_MARGIN",
        "LAST_GAME_ROLLING_FG_PCT",
        "LAST_GAME_LAST_3_WINS",
    ];

    /// Form of a team with no usable history
    pub fn neutral() -> Self {
        TeamForm {
            home_win_pct: NEUTRAL_WIN_PCT,
            away_win_pct: NEUTRAL_WIN_PCT,
            total_win_pct: NEUTRAL_WIN_PCT,
            rest_days: NEUTRAL_REST_DAYS,
            is_back_to_back: false,
            rolling_oe: NEUTRAL_ROLLING_OE,
            rolling_scoring_margin: NEUTRAL_ROLLING_MARGIN,
            rolling_fg_pct: NEUTRAL_ROLLING_FG_PCT,
            last_3_wins: NEUTRAL_LAST_3_WINS,
        }
    }

    /// Form going into a game on `date`, given the team's earlier games of the
    /// season in chronological order
    pub fn from_prior(prior: &[&TeamGameRecord], date: NaiveDate) -> Self {
        let rest_days = rest_days(prior.last().map(|r| r.game_date), date);
        TeamForm {
            home_win_pct: home_win_pct(prior),
            away_win_pct: away_win_pct(prior),
            total_win_pct: total_win_pct(prior),
            rest_days,
            is_back_to_back: rest_days == 1,
            rolling_oe: rolling_mean(prior, Metric::OffensiveEfficiency, ROLLING_WINDOW),
            rolling_scoring_margin: rolling_mean(prior, Metric::ScoringMargin, ROLLING_WINDOW),
            rolling_fg_pct: rolling_mean(prior, Metric::FieldGoalPct, ROLLING_WINDOW),
            last_3_wins: last_n_wins(prior, FORM_WINDOW),
        }
    }

    /// Values in [`TeamForm::COLUMNS`] order
    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.home_win_pct,
            self.away_win_pct,
            self.total_win_pct,
            self.rest_days as f64,
            if self.is_back_to_back { 1.0 } else { 0.0 },
            self.rolling_oe,
            self.rolling_scoring_margin,
            self.rolling_fg_pct,
            self.last_3_wins,
        ]
    }

    pub fn from_vec(v: &[f64]) -> Option<Self> {
        if v.len() != Self::DIM {
            return None;
        }
        Some(TeamForm {
            home_win_pct: v[0],
            away_win_pct: v[1],
            total_win_pct: v[2],
            rest_days: v[3].round() as i64,
            is_back_to_back: v[4] >= 0.5,
            rolling_oe: v[5],
            rolling_scoring_margin: v[6],
            rolling_fg_pct: v[7],
            last_3_wins: v[8],
        })
    }

    /// Replace non-finite values with 0
    pub fn sanitized(self) -> Self {
        TeamForm {
            home_win_pct: finite_or_zero(self.home_win_pct),
            away_win_pct: finite_or_zero(self.away_win_pct),
            total_win_pct: finite_or_zero(self.total_win_pct),
            rolling_oe: finite_or_zero(self.rolling_oe),
            rolling_scoring_margin: finite_or_zero(self.rolling_scoring_margin),
            rolling_fg_pct: finite_or_zero(self.rolling_fg_pct),
            last_3_wins: finite_or_zero(self.last_3_wins),
            ..self
        }
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Box-score metrics averaged over the rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    OffensiveEfficiency,
    ScoringMargin,
    FieldGoalPct,
}

impl Metric {
    pub fn value(&self, record: &TeamGameRecord) -> f64 {
        match self {
            Metric::OffensiveEfficiency => record.offensive_efficiency,
            Metric::ScoringMargin => record.scoring_margin,
            Metric::FieldGoalPct => record.fg_pct,
        }
    }

    pub fn neutral(&self) -> f64 {
        match self {
            Metric::OffensiveEfficiency => NEUTRAL_ROLLING_OE,
            Metric::ScoringMargin => NEUTRAL_ROLLING_MARGIN,
            Metric::FieldGoalPct => NEUTRAL_ROLLING_FG_PCT,
        }
    }
}

/// Ratio whose empty denominator counts as 1
fn guarded_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        numerator
    } else {
        numerator / denominator
    }
}

/// Season win percentage over the given games
pub fn total_win_pct(prior: &[&TeamGameRecord]) -> f64 {
    if prior.is_empty() {
        return NEUTRAL_WIN_PCT;
    }
    let wins: f64 = prior.iter().map(|r| r.wins).sum();
    guarded_ratio(wins, prior.len() as f64)
}

/// Win percentage in home games, from the per-game home counters
pub fn home_win_pct(prior: &[&TeamGameRecord]) -> f64 {
    if prior.is_empty() {
        return NEUTRAL_WIN_PCT;
    }
    let wins: f64 = prior.iter().map(|r| r.home_wins).sum();
    let losses: f64 = prior.iter().map(|r| r.home_losses).sum();
    guarded_ratio(wins, wins + losses)
}

/// Win percentage in road games, from the per-game road counters
pub fn away_win_pct(prior: &[&TeamGameRecord]) -> f64 {
    if prior.is_empty() {
        return NEUTRAL_WIN_PCT;
    }
    let wins: f64 = prior.iter().map(|r| r.road_wins).sum();
    let losses: f64 = prior.iter().map(|r| r.road_losses).sum();
    guarded_ratio(wins, wins + losses)
}

/// Mean of `metric` over the last `window` games (all of them if fewer)
pub fn rolling_mean(prior: &[&TeamGameRecord], metric: Metric, window: usize) -> f64 {
    let start = prior.len().saturating_sub(window);
    let recent = &prior[start..];
    if recent.is_empty() {
        return metric.neutral();
    }
    recent.iter().map(|r| metric.value(r)).sum::<f64>() / recent.len() as f64
}

/// Wins over the last `n` games
pub fn last_n_wins(prior: &[&TeamGameRecord], n: usize) -> f64 {
    if prior.is_empty() {
        return NEUTRAL_LAST_3_WINS;
    }
    let start = prior.len().saturating_sub(n);
    prior[start..].iter().map(|r| r.wins).sum()
}

/// Days since the previous game, capped at [`MAX_REST_DAYS`]
pub fn rest_days(previous: Option<NaiveDate>, date: NaiveDate) -> i64 {
    match previous {
        Some(prev) => (date - prev).num_days().min(MAX_REST_DAYS),
        None => NEUTRAL_REST_DAYS,
    }
}

/// Form going into each game of one team's season.
///
/// `games` must be that team-season's games in chronological order; entry `i`
/// of the result belongs to `games[i]`.
pub fn form_series(games: &[&TeamGameRecord]) -> Vec<TeamForm> {
    (0..games.len())
        .map(|i| TeamForm::from_prior(&games[..i], games[i].game_date))
        .collect()
}

/// Pre-game form for every team-game row of a store
#[derive(Debug, Default)]
pub struct FormTable {
    forms: HashMap<(GameId, TeamId), TeamForm>,
}

impl FormTable {
    pub fn build(store: &GameLogStore) -> Self {
        // Store rows are already chronological, so each group is too
        let mut seasons: HashMap<(TeamId, &str), Vec<&TeamGameRecord>> = HashMap::new();
        for record in store.records() {
            seasons
                .entry((record.team_id, record.season.as_str()))
                .or_default()
                .push(record);
        }

        let mut forms = HashMap::with_capacity(store.len());
        for games in seasons.values() {
            for (record, form) in games.iter().zip(form_series(games)) {
                forms.insert((record.game_id, record.team_id), form);
            }
        }

        log::debug!(
            "Computed pre-game form for {} rows across {} team-seasons",
            forms.len(),
            seasons.len()
        );

        FormTable { forms }
    }

    pub fn get(&self, game_id: GameId, team_id: TeamId) -> Option<&TeamForm> {
        self.forms.get(&(game_id, team_id))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}
