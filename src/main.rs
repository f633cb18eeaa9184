//! NBA winner prediction CLI
//!
//! Imports the per-team game log, builds point-in-time matchup features,
//! trains a baseline classifier and predicts upcoming games.

use clap::{Parser, Subcommand};
use hoops::{Config, Result};

#[derive(Parser)]
#[command(name = "hoops")]
#[command(about = "NBA game winner prediction from point-in-time team form", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Feature table commands
    Features {
        #[command(subcommand)]
        action: FeatureCommands,
    },
    /// Fit the baseline model on a train split and report test metrics
    Train,
    /// Predict a slate of upcoming games
    Predict {
        /// Fixture file (JSON array of games)
        #[arg(long)]
        fixture: String,
        /// Prediction date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        as_of: Option<String>,
        /// Season label, defaults to config or the as-of date
        #[arg(long)]
        season: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
        /// Store the predictions in the database
        #[arg(long)]
        record: bool,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Append a scraped game log CSV to the database
    Import {
        /// CSV file with one row per team per game
        path: String,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum FeatureCommands {
    /// Build the training feature table from the stored game log
    Build {
        /// Output path, defaults to the configured feature table
        #[arg(long)]
        out: Option<String>,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Import { path } => commands::data_import(&config, &path),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Features { action } => match action {
            FeatureCommands::Build { out } => commands::features_build(&config, out),
        },
        Commands::Train => commands::train(&config),
        Commands::Predict {
            fixture,
            as_of,
            season,
            format,
            record,
        } => commands::predict(&config, &fixture, as_of, season, format, record),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use chrono::NaiveDate;
    use hoops::data::feature_table::{read_feature_table, write_feature_table};
    use hoops::data::game_log::read_game_log;
    use hoops::data::{Database, GameLogStore, StoreHandle};
    use hoops::features::{build_training_table, MatchupFeatureRow};
    use hoops::model::{LogisticConfig, LogisticModel};
    use hoops::predict::{format_prediction, prediction_report, Predictor};
    use hoops::training::Trainer;
    use hoops::{Fixture, HoopsError};
    use std::sync::Arc;

    type MyBackend = Autodiff<NdArray<f32>>;

    fn new_model(config: &Config) -> LogisticModel<MyBackend> {
        LogisticModel::new(Default::default(), LogisticConfig::from(&config.training))
    }

    fn load_store(config: &Config) -> Result<GameLogStore> {
        let db = Database::open(&config.data.database_path)?;
        let store = db.load_store()?;
        if store.is_empty() {
            return Err(HoopsError::Empty(
                "No games in database. Run 'hoops data import <CSV>' first.".to_string(),
            ));
        }
        Ok(store)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'hoops data import <CSV>' to load the game log");
        println!("  3. Run 'hoops features build' to write the feature table");
        println!("  4. Run 'hoops train' to evaluate the model");
        println!("  5. Run 'hoops predict --fixture games.json' to predict a slate");

        Ok(())
    }

    pub fn data_import(config: &Config, path: &str) -> Result<()> {
        let records = read_game_log(path)?;

        // Indexing logs any integrity problems before anything is stored
        let store = GameLogStore::new(records)?;
        let db = Database::open(&config.data.database_path)?;
        let inserted = db.insert_team_games(store.records())?;

        println!(
            "Imported {} new rows ({} already present)",
            inserted,
            store.len() - inserted
        );
        let report = store.integrity();
        if !report.is_clean() {
            println!(
                "  Incomplete games: {}, role conflicts: {}, margin mismatches: {}",
                report.incomplete_games.len(),
                report.role_conflicts.len(),
                report.margin_mismatches.len()
            );
        }
        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:        {}", config.data.database_path);
        println!("  Rows:        {}", stats.record_count);
        println!("  Games:       {}", stats.game_count);
        println!("  Teams:       {}", stats.team_count);
        println!("  Seasons:     {}", stats.season_count);
        println!("  Predictions: {}", stats.prediction_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:       {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn features_build(config: &Config, out: Option<String>) -> Result<()> {
        let store = load_store(config)?;
        let table = build_training_table(&store);
        let path = out.unwrap_or_else(|| config.data.feature_table_path.clone());
        write_feature_table(&path, &table.rows)?;

        println!("Feature table written to {}", path);
        println!("  Rows:          {}", table.len());
        println!("  Dropped games: {}", table.dropped_games.len());
        println!("  Home win rate: {:.1}%", table.home_win_rate() * 100.0);
        Ok(())
    }

    /// Stored feature table when present, otherwise built from the database
    fn training_rows(config: &Config) -> Result<Vec<MatchupFeatureRow>> {
        let path = &config.data.feature_table_path;
        if std::path::Path::new(path).exists() {
            log::info!("Reading feature table from {}", path);
            read_feature_table(path)
        } else {
            Ok(build_training_table(&load_store(config)?).rows)
        }
    }

    pub fn train(config: &Config) -> Result<()> {
        let rows = training_rows(config)?;
        let trainer = Trainer::new(config.training.clone());
        let mut model = new_model(config);

        println!("Training on {} games...", rows.len());
        let report = trainer.train_and_evaluate(&mut model, &rows)?;

        println!("\nTrain: {} games, test: {} games", report.train_size, report.test_size);
        println!("\nTest set");
        println!("───────────────────────────────");
        println!("{}", report.test_metrics);
        Ok(())
    }

    fn parse_date(raw: &str) -> Result<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|e| HoopsError::Parse(format!("Invalid date {:?}: {}", raw, e)))
    }

    fn read_fixtures(path: &str) -> Result<Vec<Fixture>> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| HoopsError::Parse(format!("Invalid fixture file {}: {}", path, e)))
    }

    pub fn predict(
        config: &Config,
        fixture_path: &str,
        as_of: Option<String>,
        season: Option<String>,
        format: OutputFormat,
        record: bool,
    ) -> Result<()> {
        let fixtures = read_fixtures(fixture_path)?;
        let as_of = match as_of {
            Some(raw) => parse_date(&raw)?,
            None => chrono::Local::now().date_naive(),
        };
        let season = season.unwrap_or_else(|| config.season.label_for(as_of));

        let store = load_store(config)?;
        let rows = build_training_table(&store).rows;

        // The model is fitted once here and handed to the predictor
        let mut model = new_model(config);
        Trainer::new(config.training.clone()).fit_all(&mut model, &rows)?;

        let predictor = Predictor::new(Arc::new(StoreHandle::new(store)), model);
        let predictions = predictor.predict_slate(&fixtures, as_of, &season)?;

        match format {
            OutputFormat::Table => {
                println!("Predictions for {} ({})", as_of, season);
                for prediction in &predictions {
                    print!("{}", format_prediction(prediction));
                }
            }
            OutputFormat::Json => {
                let report = prediction_report(&predictions);
                let text = serde_json::to_string_pretty(&report)
                    .map_err(|e| HoopsError::Parse(e.to_string()))?;
                println!("{}", text);
            }
        }

        if record {
            let db = Database::open(&config.data.database_path)?;
            for prediction in &predictions {
                db.record_prediction(as_of, &season, prediction)?;
            }
            log::info!("Recorded {} predictions", predictions.len());
        }

        Ok(())
    }
}
