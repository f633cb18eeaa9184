//! Feature extraction
//!
//! Converts the game log into point-in-time matchup features: every value
//! attached to a game is computed from games dated strictly before it.

pub mod assembler;
pub mod head_to_head;
pub mod matchup;
pub mod rolling;

pub use assembler::{build_live_rows, build_training_table, TrainingTable};
pub use head_to_head::{HeadToHead, HeadToHeadIndex};
pub use matchup::{Differentials, MatchupFeatureRow, MatchupFeatures};
pub use rolling::{FormTable, TeamForm};

#[cfg(test)]
pub(crate) mod test_support {
    //! Synthetic game builders shared by the unit tests

    use crate::{GameId, Role, TeamGameRecord, TeamId};
    use chrono::NaiveDate;

    #[derive(Debug, Clone)]
    pub struct GameSpec {
        pub game_id: u64,
        pub home: i64,
        pub away: i64,
        pub date: NaiveDate,
        /// Home points minus away points
        pub home_margin: f64,
        pub season: String,
        pub oe: (f64, f64),
        pub fg: (f64, f64),
    }

    impl GameSpec {
        pub fn new(game_id: u64, home: i64, away: i64, date: (i32, u32, u32), home_margin: f64) -> Self {
            GameSpec {
                game_id,
                home,
                away,
                date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
                home_margin,
                season: "2024-25".to_string(),
                oe: (0.55, 0.52),
                fg: (0.47, 0.44),
            }
        }

        pub fn season(mut self, season: &str) -> Self {
            self.season = season.to_string();
            self
        }

        pub fn oe(mut self, home: f64, away: f64) -> Self {
            self.oe = (home, away);
            self
        }

        pub fn fg(mut self, home: f64, away: f64) -> Self {
            self.fg = (home, away);
            self
        }
    }

    fn side(g: &GameSpec, role: Role) -> TeamGameRecord {
        let is_home = role == Role::Home;
        let margin = if is_home { g.home_margin } else { -g.home_margin };
        let win = if margin > 0.0 { 1.0 } else { 0.0 };
        let loss = 1.0 - win;
        TeamGameRecord {
            team_id: TeamId(if is_home { g.home } else { g.away }),
            game_id: GameId(g.game_id),
            season: g.season.clone(),
            game_date: g.date,
            role,
            team_name: Some(format!("Team {}", if is_home { g.home } else { g.away })),
            wins: win,
            losses: loss,
            home_wins: if is_home { win } else { 0.0 },
            home_losses: if is_home { loss } else { 0.0 },
            road_wins: if is_home { 0.0 } else { win },
            road_losses: if is_home { 0.0 } else { loss },
            fg_pct: if is_home { g.fg.0 } else { g.fg.1 },
            offensive_efficiency: if is_home { g.oe.0 } else { g.oe.1 },
            scoring_margin: margin,
            points: None,
        }
    }

    /// Both sides of one game, home row first
    pub fn game(g: GameSpec) -> Vec<TeamGameRecord> {
        vec![side(&g, Role::Home), side(&g, Role::Away)]
    }

    /// Both sides of every game
    pub fn games(specs: impl IntoIterator<Item = GameSpec>) -> Vec<TeamGameRecord> {
        specs.into_iter().flat_map(game).collect()
    }
}
