//! Predictions for a slate of upcoming games

use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

use crate::data::store::{GameLogStore, StoreHandle};
use crate::features::assembler::build_live_rows;
use crate::features::matchup::MatchupFeatureRow;
use crate::model::WinModel;
use crate::{Fixture, GamePrediction, HoopsError, Result, TeamId};

/// Serves predictions from a fitted model over the current game log
pub struct Predictor<M: WinModel> {
    store: Arc<StoreHandle>,
    model: M,
}

impl<M: WinModel> Predictor<M> {
    /// `model` must already be fitted
    pub fn new(store: Arc<StoreHandle>, model: M) -> Self {
        Predictor { store, model }
    }

    pub fn store(&self) -> &StoreHandle {
        &self.store
    }

    /// Predict every fixture of the slate
    pub fn predict_slate(
        &self,
        fixtures: &[Fixture],
        as_of: NaiveDate,
        season: &str,
    ) -> Result<Vec<GamePrediction>> {
        if fixtures.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.store.snapshot();
        let rows = live_rows(&snapshot, fixtures, as_of, season);
        let x: Vec<Vec<f32>> = rows.iter().map(|r| r.features.to_f32_vec()).collect();
        let probs = self.model.predict_proba(&x)?;
        if probs.len() != fixtures.len() {
            return Err(HoopsError::Model(format!(
                "model returned {} probabilities for {} games",
                probs.len(),
                fixtures.len()
            )));
        }

        let predictions: Vec<GamePrediction> = fixtures
            .iter()
            .zip(probs)
            .map(|(fixture, home_win_prob)| {
                let home_team = display_name(&snapshot, &fixture.home_team, fixture.home_team_id);
                let away_team = display_name(&snapshot, &fixture.away_team, fixture.away_team_id);
                let winner = if home_win_prob >= 0.5 {
                    home_team.clone()
                } else {
                    away_team.clone()
                };
                GamePrediction {
                    home_team,
                    away_team,
                    time: fixture.status.clone(),
                    home_score: fixture.home_score,
                    away_score: fixture.away_score,
                    prediction: winner,
                    confidence: confidence_pct(home_win_prob.max(1.0 - home_win_prob)),
                    home_win_prob,
                }
            })
            .collect();

        log::info!("Predicted {} games as of {}", predictions.len(), as_of);
        Ok(predictions)
    }
}

fn live_rows(
    store: &GameLogStore,
    fixtures: &[Fixture],
    as_of: NaiveDate,
    season: &str,
) -> Vec<MatchupFeatureRow> {
    let matchups: Vec<(TeamId, TeamId)> = fixtures
        .iter()
        .map(|f| (f.home_team_id, f.away_team_id))
        .collect();
    build_live_rows(store, &matchups, as_of, season)
}

/// Fixture name, else the name the log last carried, else the team id
fn display_name(store: &GameLogStore, given: &str, team: TeamId) -> String {
    if !given.is_empty() {
        return given.to_string();
    }
    store
        .team_name(team)
        .map(str::to_string)
        .unwrap_or_else(|| team.to_string())
}

/// Probability as a percentage rounded to two decimals
pub fn confidence_pct(prob: f32) -> f64 {
    (prob as f64 * 10_000.0).round() / 100.0
}

/// Report body: `{"games": [...]}`
pub fn prediction_report(predictions: &[GamePrediction]) -> serde_json::Value {
    json!({ "games": predictions })
}

/// Format a prediction for display
pub fn format_prediction(pred: &GamePrediction) -> String {
    let status = if pred.time.is_empty() {
        "scheduled"
    } else {
        pred.time.as_str()
    };
    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}  ({})
├─────────────────────────────────────────────────┤
│  Score:            {} - {}
│  Predicted winner: {}
│  Confidence:       {:.2}%
└─────────────────────────────────────────────────┘
"#,
        pred.home_team,
        pred.away_team,
        status,
        pred.home_score,
        pred.away_score,
        pred.prediction,
        pred.confidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::test_support::{games, GameSpec};

    /// Maps the season win percentage gap straight to a probability
    struct RecordModel;

    impl WinModel for RecordModel {
        fn fit(&mut self, _: &[Vec<f32>], _: &[bool]) -> Result<()> {
            Ok(())
        }

        fn predict_proba(&self, features: &[Vec<f32>]) -> Result<Vec<f32>> {
            Ok(features.iter().map(|r| 0.5 + r[20] / 2.0).collect())
        }
    }

    fn fixture(home: i64, away: i64) -> Fixture {
        Fixture {
            home_team_id: TeamId(home),
            away_team_id: TeamId(away),
            home_team: format!("Home{}", home),
            away_team: format!("Away{}", away),
            status: "7:30 pm ET".to_string(),
            home_score: 0,
            away_score: 0,
        }
    }

    /// Team 1 wins all six games against team 2
    fn lopsided_store() -> GameLogStore {
        let specs = (0..6u32).map(|i| {
            if i % 2 == 0 {
                GameSpec::new(i as u64 + 1, 1, 2, (2024, 11, 1 + i * 2), 9.0)
            } else {
                GameSpec::new(i as u64 + 1, 2, 1, (2024, 11, 1 + i * 2), -9.0)
            }
        });
        GameLogStore::new(games(specs)).unwrap()
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
    }

    #[test]
    fn test_predicts_stronger_side() {
        let predictor = Predictor::new(Arc::new(StoreHandle::new(lopsided_store())), RecordModel);
        let predictions = predictor
            .predict_slate(&[fixture(1, 2), fixture(2, 1)], as_of(), "2024-25")
            .unwrap();

        assert_eq!(predictions[0].prediction, "Home1");
        assert_eq!(predictions[0].confidence, 100.0);
        assert_eq!(predictions[1].prediction, "Away1");
        assert_eq!(predictions[1].confidence, 100.0);
        assert_eq!(predictions[1].time, "7:30 pm ET");
    }

    #[test]
    fn test_swapped_store_is_used_for_later_requests() {
        let predictor = Predictor::new(Arc::new(StoreHandle::new(lopsided_store())), RecordModel);
        predictor.store().replace(GameLogStore::empty());

        let predictions = predictor
            .predict_slate(&[fixture(1, 2)], as_of(), "2024-25")
            .unwrap();
        assert_eq!(predictions[0].home_win_prob, 0.5);
        assert_eq!(predictions[0].confidence, 50.0);
    }

    #[test]
    fn test_missing_names_come_from_the_log() {
        let predictor = Predictor::new(Arc::new(StoreHandle::new(lopsided_store())), RecordModel);
        let mut unnamed = fixture(1, 2);
        unnamed.home_team.clear();
        unnamed.away_team.clear();
        let mut unknown = fixture(1, 42);
        unknown.away_team.clear();

        let predictions = predictor
            .predict_slate(&[unnamed, unknown], as_of(), "2024-25")
            .unwrap();
        assert_eq!(predictions[0].home_team, "Team 1");
        assert_eq!(predictions[0].away_team, "Team 2");
        assert_eq!(predictions[0].prediction, "Team 1");
        assert_eq!(predictions[1].home_team, "Home1");
        assert_eq!(predictions[1].away_team, "Team(42)");
    }

    #[test]
    fn test_empty_slate() {
        let predictor = Predictor::new(Arc::new(StoreHandle::new(GameLogStore::empty())), RecordModel);
        assert!(predictor.predict_slate(&[], as_of(), "2024-25").unwrap().is_empty());
    }

    #[test]
    fn test_report_shape() {
        let predictor = Predictor::new(Arc::new(StoreHandle::new(lopsided_store())), RecordModel);
        let predictions = predictor
            .predict_slate(&[fixture(1, 2)], as_of(), "2024-25")
            .unwrap();
        let report = prediction_report(&predictions);

        let game = &report["games"][0];
        assert_eq!(game["home_team"], "Home1");
        assert_eq!(game["prediction"], "Home1");
        assert_eq!(game["confidence"], 100.0);
        assert!(game.get("home_win_prob").is_none());
        assert!(format_prediction(&predictions[0]).contains("Predicted winner: Home1"));
    }

    #[test]
    fn test_confidence_rounding() {
        assert_eq!(confidence_pct(0.6412), 64.12);
        assert_eq!(confidence_pct(0.5), 50.0);
        assert_eq!(confidence_pct(0.99999), 100.0);
    }
}
