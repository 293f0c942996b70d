//! Cricket analytics pipeline CLI
//!
//! Batch pipeline from raw match records to descriptive views, trained
//! models, and a star-schema export.

use clap::{Parser, Subcommand};
use cricstats::{Config, Result, TossDecision};

#[derive(Parser)]
#[command(name = "cricstats")]
#[command(about = "Cricket match analytics and prediction pipeline", long_about = None)]
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
    /// Initialize a new project with default config
    Init,
    /// Ingest match records into the raw tables
    Ingest {
        /// Generate a synthetic season instead of reading a live source
        #[arg(long)]
        mock: bool,
        /// Seed for the synthetic season
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Number of matches to generate
        #[arg(long, default_value = "60")]
        matches: usize,
    },
    /// Validate and de-duplicate the raw tables
    Clean,
    /// Compute the as-of feature table from the clean tables
    Transform,
    /// Descriptive views over the clean tables
    Analyze {
        #[command(subcommand)]
        view: AnalyzeCommands,
    },
    /// Train models on the feature table
    Train {
        /// Train only one model (win, innings-score, player-performance)
        #[arg(long)]
        model: Option<String>,
    },
    /// Score trained models on their held-out validation window
    Evaluate {
        /// Evaluate only one model
        #[arg(long)]
        model: Option<String>,
        /// Decision threshold for classifiers
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Predict a hypothetical future outcome
    Predict {
        #[command(subcommand)]
        target: PredictCommands,
    },
    /// Export the clean tables as star-schema CSV files
    Export {
        /// Output directory (overrides the configured export_dir)
        #[arg(long)]
        out: Option<String>,
    },
    /// Show which pipeline stages have run
    Status,
}

#[derive(Subcommand)]
enum AnalyzeCommands {
    /// Highest run scorers
    TopScorers {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Most wickets taken (run outs excluded)
    TopWicketTakers {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
    /// Mean innings total per venue
    VenueAverages,
    /// Toss winner's win rate by election
    TossImpact,
}

#[derive(Subcommand)]
enum PredictCommands {
    /// Probability that team1 beats team2
    Win {
        team1: String,
        team2: String,
        /// Which team won the toss
        #[arg(long)]
        toss_winner: String,
        /// What the toss winner elected (bat or field)
        #[arg(long, default_value = "bat")]
        elected: String,
    },
    /// Expected innings total for a team at a venue
    Score {
        team: String,
        venue: String,
        #[arg(long, default_value = "1")]
        innings: i64,
    },
    /// Expected runs for a batter in their next match
    Player { name: String },
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

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
        Commands::Init => commands::init(&cli.config),
        Commands::Ingest {
            mock,
            seed,
            matches,
        } => commands::ingest(&config, mock, seed, matches),
        Commands::Clean => commands::clean(&config),
        Commands::Transform => commands::transform(&config),
        Commands::Analyze { view } => commands::analyze(&config, view),
        Commands::Train { model } => commands::train(&config, model),
        Commands::Evaluate { model, threshold } => commands::evaluate(&config, model, threshold),
        Commands::Predict { target } => commands::predict(&config, target),
        Commands::Export { out } => commands::export(&config, out),
        Commands::Status => commands::status(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn parse_model(s: &str) -> Result<cricstats::model::ModelKind> {
    cricstats::model::ModelKind::parse(s).ok_or_else(|| {
        cricstats::CricError::Validation(format!(
            "unknown model '{}'. Use win, innings-score, or player-performance.",
            s
        ))
    })
}

mod commands {
    use super::*;
    use cricstats::analyze;
    use cricstats::clean::{clean_all, CleaningReport};
    use cricstats::data::{ingest as run_ingest, MockSource, Store};
    use cricstats::features::transform as run_transform;
    use cricstats::model::ModelKind;
    use cricstats::predict::Predictor;
    use cricstats::training::{self, EvaluationReport};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all(&config.data.models_dir)?;
        Store::open(&config.data.database_path)?;
        println!("Initialized database at {}", config.data.database_path);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'cricstats ingest --mock' to load a season");
        println!("  3. Run 'cricstats clean' then 'cricstats transform'");
        println!("  4. Run 'cricstats train' and 'cricstats predict win \"IND\" \"AUS\" --toss-winner IND'");
        Ok(())
    }

    pub fn ingest(config: &Config, mock: bool, seed: u64, matches: usize) -> Result<()> {
        if !mock {
            return Err(cricstats::CricError::Config(
                "no live source is configured; run with --mock".to_string(),
            ));
        }
        let store = Store::open(&config.data.database_path)?;
        let mut source = MockSource::new(seed, matches);
        let counts = run_ingest(&store, &mut source)?;
        println!(
            "Ingested {} matches, {} deliveries, {} players, {} venues",
            counts.matches, counts.deliveries, counts.players, counts.venues
        );
        Ok(())
    }

    fn print_report(report: &CleaningReport) {
        println!(
            "  {}: {} -> {} rows ({} removed: {} duplicate, {} null, {} unmapped names, {} foreign winners)",
            report.entity,
            report.rows_before,
            report.rows_after,
            report.rows_removed,
            report.reasons.duplicate,
            report.reasons.null_required,
            report.reasons.unmapped_name,
            report.reasons.foreign_winner
        );
    }

    pub fn clean(config: &Config) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let summary = clean_all(&store, config)?;
        println!("Cleaning complete:");
        print_report(&summary.matches);
        print_report(&summary.players);
        print_report(&summary.deliveries);
        Ok(())
    }

    pub fn transform(config: &Config) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let rows = run_transform(&store, config)?;
        println!("Wrote {} feature rows", rows);
        Ok(())
    }

    pub fn analyze(config: &Config, view: AnalyzeCommands) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let matches = store.read_clean_matches()?;
        let deliveries = store.read_clean_deliveries()?;
        let players = store.read_clean_players()?;

        match view {
            AnalyzeCommands::TopScorers { limit } => {
                println!("{:<6} {:<24} {:>6} {:>6}", "Rank", "Player", "Runs", "Balls");
                for (i, row) in analyze::top_scorers(&deliveries, &players, limit)?
                    .iter()
                    .enumerate()
                {
                    println!(
                        "{:<6} {:<24} {:>6} {:>6}",
                        i + 1,
                        row.name,
                        row.total_runs,
                        row.balls_faced
                    );
                }
            }
            AnalyzeCommands::TopWicketTakers { limit } => {
                println!("{:<6} {:<24} {:>7}", "Rank", "Player", "Wickets");
                for (i, row) in analyze::top_wicket_takers(&deliveries, &players, limit)?
                    .iter()
                    .enumerate()
                {
                    println!("{:<6} {:<24} {:>7}", i + 1, row.name, row.wickets);
                }
            }
            AnalyzeCommands::VenueAverages => {
                let venues = store.read_venues()?;
                println!("{:<28} {:>8} {:>10}", "Venue", "Innings", "Avg total");
                for row in analyze::venue_averages(&matches, &deliveries, &venues)? {
                    println!(
                        "{:<28} {:>8} {:>10.1}",
                        row.name, row.innings_count, row.avg_innings_total
                    );
                }
            }
            AnalyzeCommands::TossImpact => {
                println!("{:<10} {:>8} {:>8} {:>9}", "Elected", "Matches", "Won", "Win rate");
                for row in analyze::toss_impact(&matches)? {
                    println!(
                        "{:<10} {:>8} {:>8} {:>8.1}%",
                        row.decision.as_str(),
                        row.matches,
                        row.toss_winner_won,
                        row.win_rate * 100.0
                    );
                }
            }
        }
        Ok(())
    }

    pub fn train(config: &Config, model: Option<String>) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let trained = match model {
            Some(name) => vec![training::train(&store, parse_model(&name)?, config)?],
            None => training::train_all(&store, config)?,
        };
        for t in &trained {
            println!(
                "Trained {} on {} examples ({} held out), final loss {:.4} -> {}",
                t.artifact.kind,
                t.artifact.train_rows,
                t.artifact.validation_rows,
                t.final_loss,
                t.artifact_path.display()
            );
        }
        Ok(())
    }

    fn print_evaluation(report: &EvaluationReport) {
        match report {
            EvaluationReport::Classification {
                kind,
                split_cutoff,
                threshold,
                metrics,
            } => {
                println!("{} (validation after {}):", kind, split_cutoff);
                println!(
                    "  accuracy {:.3}  precision {:.3}  recall {:.3}  f1 {:.3}  ({} samples, threshold {})",
                    metrics.accuracy,
                    metrics.precision,
                    metrics.recall,
                    metrics.f1,
                    metrics.samples,
                    threshold
                );
                println!("  calibration:");
                for bucket in metrics.calibration.iter().filter(|b| b.count > 0) {
                    println!(
                        "    [{:.1}, {:.1}): predicted {:.3}, observed {:.3} ({} samples)",
                        bucket.lo, bucket.hi, bucket.mean_predicted, bucket.observed_rate, bucket.count
                    );
                }
            }
            EvaluationReport::Regression {
                kind,
                split_cutoff,
                metrics,
            } => {
                println!("{} (validation after {}):", kind, split_cutoff);
                println!(
                    "  MAE {:.2}  RMSE {:.2}  R2 {:.3}  ({} samples)",
                    metrics.mae, metrics.rmse, metrics.r2, metrics.samples
                );
            }
        }
    }

    pub fn evaluate(config: &Config, model: Option<String>, threshold: Option<f64>) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let kinds: Vec<ModelKind> = match model {
            Some(name) => vec![parse_model(&name)?],
            None => ModelKind::ALL.to_vec(),
        };
        for kind in kinds {
            let report = training::evaluate(&store, kind, config, threshold)?;
            print_evaluation(&report);
        }
        Ok(())
    }

    pub fn predict(config: &Config, target: PredictCommands) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let predictor = Predictor::new(&store, config);
        match target {
            PredictCommands::Win {
                team1,
                team2,
                toss_winner,
                elected,
            } => {
                let decision = TossDecision::parse(&elected).ok_or_else(|| {
                    cricstats::CricError::Validation(format!(
                        "unknown toss decision '{}': use bat or field",
                        elected
                    ))
                })?;
                let p = predictor.predict_win(&team1, &team2, &toss_winner, decision)?;
                println!(
                    "{} vs {}: {} wins with probability {:.1}% (predicted winner: {})",
                    p.team1,
                    p.team2,
                    p.team1,
                    p.team1_win_probability * 100.0,
                    p.predicted_winner
                );
            }
            PredictCommands::Score {
                team,
                venue,
                innings,
            } => {
                let p = predictor.predict_innings_score(&team, &venue, innings)?;
                println!(
                    "{} batting innings {} at {}: predicted total {:.0}",
                    p.batting_team, p.innings, p.venue, p.predicted_runs
                );
            }
            PredictCommands::Player { name } => {
                let p = predictor.predict_player_performance(&name)?;
                println!("{}: predicted {:.1} runs next match", p.name, p.predicted_runs);
            }
        }
        Ok(())
    }

    pub fn export(config: &Config, out: Option<String>) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let mut config = config.clone();
        if let Some(dir) = out {
            config.data.export_dir = dir;
        }
        let summary = cricstats::export::export(&store, &config)?;
        println!("Exported to {}:", summary.export_dir.display());
        for (name, rows) in &summary.tables {
            println!("  {} ({} rows)", name, rows);
        }
        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let store = Store::open(&config.data.database_path)?;
        let versions = store.stage_versions()?;
        if versions.is_empty() {
            println!("No pipeline stages have run yet");
            return Ok(());
        }
        println!("{:<20} {}", "Stage", "Last written");
        for (stage, at) in versions {
            println!("{:<20} {}", stage, at);
        }
        for kind in ModelKind::ALL {
            let path = kind.artifact_path(std::path::Path::new(&config.data.models_dir));
            if path.exists() {
                println!("{:<20} {}", format!("model:{}", kind), path.display());
            }
        }
        Ok(())
    }
}
