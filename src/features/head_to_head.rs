//! Head-to-head history between two specific teams
//!
//! Only meetings where the first team hosted the second count: a rematch with
//! the roles reversed belongs to the other ordering of the pair. History spans
//! every season.

use chrono::NaiveDate;
use std::collections::HashMap;

use crate::features::rolling::finite_or_zero;
use crate::{GameId, Role, TeamGameRecord, TeamId};

/// Fewer qualifying meetings than this resolve to [`HeadToHead::NEUTRAL`]
pub const MIN_MEETINGS: usize = 2;
/// Most recent meetings summarised
pub const MAX_MEETINGS: usize = 5;
/// Added to the win fraction denominator
pub const WIN_PCT_EPSILON: f64 = 0.001;

/// Host's record against the visitor over recent meetings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadToHead {
    pub home_win_pct: f64,
    pub home_avg_margin: f64,
}

impl HeadToHead {
    pub const DIM: usize = 2;
    pub const COLUMNS: [&'static str; Self::DIM] = ["H2H_HOME_WIN_PCT", "H2H_HOME_AVG_MARGIN"];
    pub const NEUTRAL: HeadToHead = HeadToHead {
        home_win_pct: 0.5,
        home_avg_margin: 0.0,
    };

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.home_win_pct, self.home_avg_margin]
    }

    /// Summarise meetings from the host's side, oldest first
    fn summarise(meetings: &[&Meeting]) -> Self {
        if meetings.len() < MIN_MEETINGS {
            return Self::NEUTRAL;
        }
        let recent = &meetings[meetings.len().saturating_sub(MAX_MEETINGS)..];
        let n = recent.len() as f64;
        let wins: f64 = recent.iter().map(|m| m.host_wins).sum();
        let margin: f64 = recent.iter().map(|m| m.host_margin).sum();
        HeadToHead {
            home_win_pct: wins / (n + WIN_PCT_EPSILON),
            home_avg_margin: margin / n,
        }
    }

    pub fn sanitized(self) -> Self {
        HeadToHead {
            home_win_pct: finite_or_zero(self.home_win_pct),
            home_avg_margin: finite_or_zero(self.home_avg_margin),
        }
    }
}

/// One completed game between a pair, from the host's side
#[derive(Debug, Clone)]
struct Meeting {
    /// Later of the two sides' dates
    date: NaiveDate,
    game_id: GameId,
    host: TeamId,
    visitor: TeamId,
    host_wins: f64,
    host_margin: f64,
}

/// Unordered pair key, smaller id first
fn pair_key(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// Meetings per unordered team pair, sorted by date
#[derive(Debug, Clone, Default)]
pub struct HeadToHeadIndex {
    meetings: HashMap<(TeamId, TeamId), Vec<Meeting>>,
}

impl HeadToHeadIndex {
    /// Index every game that has a home row and an away row
    pub fn build(records: &[TeamGameRecord]) -> Self {
        let mut sides: HashMap<GameId, (Option<&TeamGameRecord>, Option<&TeamGameRecord>)> =
            HashMap::new();
        for record in records {
            let entry = sides.entry(record.game_id).or_default();
            match record.role {
                Role::Home => {
                    entry.0.get_or_insert(record);
                }
                Role::Away => {
                    entry.1.get_or_insert(record);
                }
            }
        }

        let mut meetings: HashMap<(TeamId, TeamId), Vec<Meeting>> = HashMap::new();
        for (game_id, pair) in sides {
            let (Some(home), Some(away)) = pair else {
                continue;
            };
            meetings
                .entry(pair_key(home.team_id, away.team_id))
                .or_default()
                .push(Meeting {
                    date: home.game_date.max(away.game_date),
                    game_id,
                    host: home.team_id,
                    visitor: away.team_id,
                    host_wins: home.wins,
                    host_margin: home.scoring_margin,
                });
        }

        for list in meetings.values_mut() {
            list.sort_by_key(|m| (m.date, m.game_id));
        }

        HeadToHeadIndex { meetings }
    }

    pub fn pair_count(&self) -> usize {
        self.meetings.len()
    }

    /// History of `host` receiving `visitor` strictly before `cutoff`
    pub fn resolve(&self, host: TeamId, visitor: TeamId, cutoff: NaiveDate) -> HeadToHead {
        let Some(list) = self.meetings.get(&pair_key(host, visitor)) else {
            return HeadToHead::NEUTRAL;
        };
        let end = list.partition_point(|m| m.date < cutoff);
        let qualifying: Vec<&Meeting> = list[..end]
            .iter()
            .filter(|m| m.host == host && m.visitor == visitor)
            .collect();
        HeadToHead::summarise(&qualifying)
    }
}
