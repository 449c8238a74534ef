use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

use guessmon::config::{Config, API_KEY_ENV};
use guessmon::console::ConsolePresenter;
use guessmon::game::{HttpRecordSource, Outcome, RecordSource, RoundConfig, RoundEngine, TriggerContext};
use guessmon::metrics;

#[derive(Parser)]
#[command(name = "guessmon")]
#[command(about = "Guess-the-creature rounds for chat bots, playable from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "guessmon.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init,
    /// Fetch one record and print it as JSON
    Fetch {
        #[arg(short, long)]
        id: u32,
    },
    /// Play one round in the terminal
    Play {
        /// Explicit target id (random when omitted)
        #[arg(short, long)]
        id: Option<u32>,
        /// Number of options (1-4)
        #[arg(long)]
        choices: Option<u8>,
        /// Wrong guesses allowed before the round is lost
        #[arg(long)]
        wrong: Option<u8>,
        /// Seconds to answer
        #[arg(short, long)]
        timeout: Option<u64>,
        /// Player name used for your own selections
        #[arg(long, default_value = "player")]
        player: String,
    },
}

fn init_logging(verbose: u8, configured: &str) {
    let log_level = match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Init = cli.command {
        init_logging(cli.verbose, "info");
        Config::create_default(&cli.config).await?;
        info!("Configuration file created at {}", cli.config);
        return Ok(());
    }

    let config = Config::load(&cli.config).await?;
    init_logging(cli.verbose, &config.logging.level);
    info!("Starting guessmon v{}", env!("CARGO_PKG_VERSION"));
    if config.api.key.is_empty() {
        warn!("No API key configured (set api.key or {}); requests will likely be rejected", API_KEY_ENV);
    }
    let source = HttpRecordSource::new(&config.api)?;

    match cli.command {
        Commands::Init => {}
        Commands::Fetch { id } => {
            let record = source.fetch_record(id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Commands::Play { id, choices, wrong, timeout, player } => {
            let mut round = RoundConfig::from(&config.game);
            round.target_id = id;
            if let Some(choices) = choices {
                round.choice_count = choices;
            }
            if let Some(wrong) = wrong {
                round.allowed_wrong_guesses = wrong;
            }
            if let Some(secs) = timeout {
                round.timeout = Duration::from_secs(secs);
            }

            let engine = RoundEngine::new(Arc::new(source), Arc::new(ConsolePresenter::new()));
            let handle = engine.start_round(TriggerContext::new(player, "terminal"), round).await?;
            let report = handle.outcome().await?;
            match report.outcome {
                Outcome::Won => println!("Correct! It was {}.", report.target.name),
                Outcome::Lost => println!("Out of guesses. It was {}.", report.target.name),
                Outcome::TimedOut => println!("Time's up."),
            }
            debug!("metrics: {:?}", metrics::snapshot());
            // The stdin reader may still be parked on a blocking read; don't wait for it.
            std::process::exit(0);
        }
    }

    Ok(())
}
