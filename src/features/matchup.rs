//! Matchup feature vectors and the feature table column contract
//!
//! The model consumes features positionally, so the column order here is
//! fixed: home block, away block, head-to-head pair, differentials.

use chrono::NaiveDate;
use csv::StringRecord;

use crate::features::head_to_head::HeadToHead;
use crate::features::rolling::{finite_or_zero, TeamForm};
use crate::{GameId, HoopsError, Result, TeamId};

/// Home-minus-away contrasts of the two form blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Differentials {
    pub win_pctg_diff: f64,
    pub oe_diff: f64,
    pub scoring_margin_diff: f64,
    pub rest_diff: f64,
    /// Home side's home record against its own road record
    pub home_advantage: f64,
    pub fg_pct_diff: f64,
    pub form_diff: f64,
}

impl Differentials {
    pub const DIM: usize = 7;
    pub const COLUMNS: [&'static str; Self::DIM] = [
        "WIN_PCTG_DIFF",
        "OE_DIFF",
        "SCORING_MARGIN_DIFF",
        "REST_DIFF",
        "HOME_ADVANTAGE",
        "FG_PCT_DIFF",
        "FORM_DIFF",
    ];

    pub fn between(home: &TeamForm, away: &TeamForm) -> Self {
        Differentials {
            win_pctg_diff: home.total_win_pct - away.total_win_pct,
            oe_diff: home.rolling_oe - away.rolling_oe,
            scoring_margin_diff: home.rolling_scoring_margin - away.rolling_scoring_margin,
            rest_diff: (home.rest_days - away.rest_days) as f64,
            home_advantage: home.home_win_pct - home.away_win_pct,
            fg_pct_diff: home.rolling_fg_pct - away.rolling_fg_pct,
            form_diff: home.last_3_wins - away.last_3_wins,
        }
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![
            self.win_pctg_diff,
            self.oe_diff,
            self.scoring_margin_diff,
            self.rest_diff,
            self.home_advantage,
            self.fg_pct_diff,
            self.form_diff,
        ]
    }

    fn from_vec(v: &[f64]) -> Option<Self> {
        if v.len() != Self::DIM {
            return None;
        }
        Some(Differentials {
            win_pctg_diff: v[0],
            oe_diff: v[1],
            scoring_margin_diff: v[2],
            rest_diff: v[3],
            home_advantage: v[4],
            fg_pct_diff: v[5],
            form_diff: v[6],
        })
    }
}

/// Complete model input for one game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchupFeatures {
    pub home: TeamForm,
    pub away: TeamForm,
    pub head_to_head: HeadToHead,
    pub differentials: Differentials,
}

impl MatchupFeatures {
    pub const DIM: usize = 2 * TeamForm::DIM + HeadToHead::DIM + Differentials::DIM;

    /// Non-finite inputs are zeroed before the differentials are taken, so the
    /// differential identities hold on the stored values.
    pub fn new(home: TeamForm, away: TeamForm, head_to_head: HeadToHead) -> Self {
        let home = home.sanitized();
        let away = away.sanitized();
        let differentials = Differentials::between(&home, &away);
        MatchupFeatures {
            home,
            away,
            head_to_head: head_to_head.sanitized(),
            differentials,
        }
    }

    /// Both sides neutral, no head-to-head history
    pub fn neutral() -> Self {
        Self::new(TeamForm::neutral(), TeamForm::neutral(), HeadToHead::NEUTRAL)
    }

    /// Model column names in positional order
    pub fn columns() -> Vec<String> {
        let side = |prefix: &str| {
            TeamForm::COLUMNS
                .iter()
                .map(move |c| format!("{}_{}", prefix, c))
                .collect::<Vec<_>>()
        };
        let mut columns = side("HOME");
        columns.extend(side("AWAY"));
        columns.extend(HeadToHead::COLUMNS.iter().map(|c| c.to_string()));
        columns.extend(Differentials::COLUMNS.iter().map(|c| c.to_string()));
        columns
    }

    pub fn to_vec(&self) -> Vec<f64> {
        let mut v = Vec::with_capacity(Self::DIM);
        v.extend(self.home.to_vec());
        v.extend(self.away.to_vec());
        v.extend(self.head_to_head.to_vec());
        v.extend(self.differentials.to_vec());
        v
    }

    /// Model input row
    pub fn to_f32_vec(&self) -> Vec<f32> {
        self.to_vec().into_iter().map(|v| v as f32).collect()
    }

    /// Rebuild from stored values, keeping the stored differentials
    pub fn from_vec(v: &[f64]) -> Option<Self> {
        if v.len() != Self::DIM {
            return None;
        }
        let (home, rest) = v.split_at(TeamForm::DIM);
        let (away, rest) = rest.split_at(TeamForm::DIM);
        let (h2h, diffs) = rest.split_at(HeadToHead::DIM);
        Some(MatchupFeatures {
            home: TeamForm::from_vec(home)?,
            away: TeamForm::from_vec(away)?,
            head_to_head: HeadToHead {
                home_win_pct: h2h[0],
                home_avg_margin: h2h[1],
            },
            differentials: Differentials::from_vec(diffs)?,
        })
    }
}

/// One row of the feature table: a played game with its label, or an upcoming
/// game without one
#[derive(Debug, Clone, PartialEq)]
pub struct MatchupFeatureRow {
    /// Absent for games that have not been played
    pub game_id: Option<GameId>,
    pub season: String,
    pub game_date: NaiveDate,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub features: MatchupFeatures,
    /// Whether the home side won; training rows only
    pub home_win: Option<bool>,
}

impl MatchupFeatureRow {
    pub const KEY_COLUMNS: [&'static str; 5] =
        ["GAME_ID", "SEASON", "GAME_DATE", "HOME_TEAM_ID", "AWAY_TEAM_ID"];
    pub const LABEL_COLUMN: &'static str = "HOME_W";

    /// Full header; `labelled` appends the label column
    pub fn columns(labelled: bool) -> Vec<String> {
        let mut columns: Vec<String> = Self::KEY_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend(MatchupFeatures::columns());
        if labelled {
            columns.push(Self::LABEL_COLUMN.to_string());
        }
        columns
    }

    pub fn is_labelled(&self) -> bool {
        self.home_win.is_some()
    }

    /// Field values matching [`MatchupFeatureRow::columns`]
    pub fn to_record(&self, labelled: bool) -> Vec<String> {
        let mut fields = vec![
            self.game_id.map(|g| g.to_string()).unwrap_or_default(),
            self.season.clone(),
            self.game_date.format("%Y-%m-%d").to_string(),
            self.home_team_id.0.to_string(),
            self.away_team_id.0.to_string(),
        ];
        fields.extend(self.features.to_vec().iter().map(|v| v.to_string()));
        if labelled {
            let label = match self.home_win {
                Some(true) => "1",
                Some(false) => "0",
                None => "",
            };
            fields.push(label.to_string());
        }
        fields
    }

    /// Parse a record laid out as [`MatchupFeatureRow::columns`]
    pub fn from_record(record: &StringRecord, labelled: bool, line: u64) -> Result<Self> {
        let invalid = |message: String| HoopsError::InvalidRecord { line, message };
        let expected = Self::KEY_COLUMNS.len() + MatchupFeatures::DIM + usize::from(labelled);
        if record.len() != expected {
            return Err(invalid(format!(
                "expected {} fields, found {}",
                expected,
                record.len()
            )));
        }
        let field = |i: usize| record.get(i).unwrap_or("");

        let game_id = match field(0) {
            "" => None,
            raw => Some(
                GameId::parse(raw).ok_or_else(|| invalid(format!("bad GAME_ID {:?}", raw)))?,
            ),
        };
        let game_date = NaiveDate::parse_from_str(field(2), "%Y-%m-%d")
            .map_err(|e| invalid(format!("bad GAME_DATE {:?}: {}", field(2), e)))?;
        let team = |i: usize| -> Result<TeamId> {
            field(i)
                .parse::<i64>()
                .map(TeamId)
                .map_err(|e| invalid(format!("bad team id {:?}: {}", field(i), e)))
        };

        let offset = Self::KEY_COLUMNS.len();
        let values = (offset..offset + MatchupFeatures::DIM)
            .map(|i| {
                field(i)
                    .parse::<f64>()
                    .map_err(|e| invalid(format!("bad value {:?} in field {}: {}", field(i), i, e)))
            })
            .collect::<Result<Vec<f64>>>()?;
        let features = MatchupFeatures::from_vec(&values)
            .ok_or_else(|| invalid("wrong number of feature values".to_string()))?;

        let home_win = if labelled {
            match field(expected - 1) {
                "1" | "1.0" | "true" => Some(true),
                "0" | "0.0" | "false" => Some(false),
                "" => None,
                other => return Err(invalid(format!("bad HOME_W {:?}", other))),
            }
        } else {
            None
        };

        Ok(MatchupFeatureRow {
            game_id,
            season: field(1).to_string(),
            game_date,
            home_team_id: team(3)?,
            away_team_id: team(4)?,
            features,
            home_win,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_form(total: f64, rest: i64) -> TeamForm {
        TeamForm {
            home_win_pct: 0.75,
            away_win_pct: 0.4,
            total_win_pct: total,
            rest_days: rest,
            is_back_to_back: rest == 1,
            rolling_oe: 0.56,
            rolling_scoring_margin: 3.2,
            rolling_fg_pct: 0.471,
            last_3_wins: 2.0,
        }
    }

    #[test]
    fn test_column_layout() {
        let columns = MatchupFeatures::columns();
        assert_eq!(columns.len(), MatchupFeatures::DIM);
        assert_eq!(MatchupFeatures::DIM, 27);
        assert_eq!(columns[0], "HOME_LAST_GAME_HOME_WIN_PCTG");
        assert_eq!(columns[9], "AWAY_LAST_GAME_HOME_WIN_PCTG");
        assert_eq!(columns[17], "AWAY_LAST_GAME_LAST_3_WINS");
        assert_eq!(columns[18], "H2H_HOME_WIN_PCT");
        assert_eq!(columns[20], "WIN_PCTG_DIFF");
        assert_eq!(columns[26], "FORM_DIFF");

        let labelled = MatchupFeatureRow::columns(true);
        let unlabelled = MatchupFeatureRow::columns(false);
        assert_eq!(labelled.last().map(String::as_str), Some("HOME_W"));
        assert_eq!(&labelled[..labelled.len() - 1], unlabelled.as_slice());
    }

    #[test]
    fn test_differentials_are_exact() {
        let home = sample_form(0.6, 2);
        let away = TeamForm {
            rolling_oe: 0.51,
            rolling_scoring_margin: -1.7,
            rolling_fg_pct: 0.452,
            last_3_wins: 0.0,
            ..sample_form(0.35, 1)
        };
        let f = MatchupFeatures::new(home, away, HeadToHead::NEUTRAL);
        let d = f.differentials;

        assert_eq!(d.win_pctg_diff, home.total_win_pct - away.total_win_pct);
        assert_eq!(d.oe_diff, home.rolling_oe - away.rolling_oe);
        assert_eq!(d.scoring_margin_diff, home.rolling_scoring_margin - away.rolling_scoring_margin);
        assert_eq!(d.rest_diff, 1.0);
        assert_eq!(d.home_advantage, home.home_win_pct - home.away_win_pct);
        assert_eq!(d.fg_pct_diff, home.rolling_fg_pct - away.rolling_fg_pct);
        assert_eq!(d.form_diff, 2.0);
    }

    #[test]
    fn test_non_finite_values_become_zero() {
        let home = TeamForm {
            rolling_oe: f64::NAN,
            ..sample_form(0.6, 2)
        };
        let h2h = HeadToHead {
            home_win_pct: f64::INFINITY,
            home_avg_margin: 2.0,
        };
        let f = MatchupFeatures::new(home, sample_form(0.5, 3), h2h);

        assert_eq!(f.home.rolling_oe, 0.0);
        assert_eq!(f.head_to_head.home_win_pct, 0.0);
        assert_eq!(f.differentials.oe_diff, -0.56);
        assert!(f.to_vec().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_record_parses_back() {
        let row = MatchupFeatureRow {
            game_id: Some(GameId(22400061)),
            season: "2024-25".to_string(),
            game_date: NaiveDate::from_ymd_opt(2024, 10, 22).unwrap(),
            home_team_id: TeamId(1610612738),
            away_team_id: TeamId(1610612752),
            features: MatchupFeatures::new(sample_form(0.6, 2), sample_form(0.3, 30), HeadToHead::NEUTRAL),
            home_win: Some(true),
        };
        let record = StringRecord::from(row.to_record(true));
        assert_eq!(record.get(0), Some("0022400061"));
        assert_eq!(MatchupFeatureRow::from_record(&record, true, 2).unwrap(), row);

        let short = StringRecord::from(row.to_record(false));
        assert!(MatchupFeatureRow::from_record(&short, true, 2).is_err());
    }
}
