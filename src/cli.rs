use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use flexi_logger::{Logger, LoggerHandle};
use log::{debug, info};
use tokio::runtime::Runtime;

use crate::config::{self, Config, FilePollingSource, LoggingConfig};
use crate::database::Database;
use crate::error::LivePulseError;
use crate::poller::Poller;
use crate::probe::{HttpProber, LiveProber};
use crate::status_cache::{StatusCache, StatusSnapshot};
use crate::video_id::VideoId;
use crate::watchlist::Watchlist;

#[derive(Parser)]
#[command(
    name = "livepulse",
    version,
    about = "livePulse: tracks whether a list of videos are live right now"
)]
pub struct Cli {
    /// Path to config.toml (default: livepulse data directory)
    #[arg(long = "config", short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the server and the polling loop (default if no command specified)
    Serve,

    /// Run one poll cycle against the database and print the results
    Cycle,

    /// Parse and probe a single id or URL without touching the database
    Check {
        /// Bare 11-character id or watch URL
        input: String,
    },
}

impl Cli {
    pub fn handle_command_line() -> Result<(), LivePulseError> {
        let args = Cli::parse();

        let project_dirs = config::project_dirs()?;
        let config_path = args
            .config
            .clone()
            .unwrap_or_else(|| config::get_config_path(&project_dirs));
        let config = Config::load_config(&config_path, project_dirs.data_local_dir());

        // Keep the handle alive for the life of the process
        let _logger = init_logging(&config.logging)?;
        debug!("Command-line args: {:?}", std::env::args_os().collect::<Vec<_>>());
        debug!("Using config file {}", config_path.display());

        // Default to Serve if no command specified
        match args.command.unwrap_or(Command::Serve) {
            Command::Serve => Self::start_server(&config, &config_path),
            Command::Cycle => Self::run_single_cycle(&config),
            Command::Check { input } => Self::check(&config, &input),
        }
    }

    fn start_server(config: &Config, config_path: &Path) -> Result<(), LivePulseError> {
        info!(
            "Starting server on {}:{}",
            config.server.host, config.server.port
        );

        let store = Arc::new(Database::open(Path::new(&config.database.path))?);
        let cache = StatusCache::new();
        let watchlist = Watchlist::new(store.clone(), cache.clone());
        let poller = Poller::new(
            store,
            cache,
            HttpProber::new(&config.probe)?,
            Arc::new(FilePollingSource::new(config_path)),
        );

        runtime()?.block_on(async {
            let web_server =
                crate::server::WebServer::new(config.server.host.clone(), config.server.port);
            web_server.start(watchlist, poller).await
        })
    }

    fn run_single_cycle(config: &Config) -> Result<(), LivePulseError> {
        let store = Arc::new(Database::open(Path::new(&config.database.path))?);
        let cache = StatusCache::new();
        let poller = Poller::new(
            store,
            cache.clone(),
            HttpProber::new(&config.probe)?,
            Arc::new(config.polling.clone()),
        );

        let summary = runtime()?.block_on(poller.run_cycle())?;
        println!("{}", summary);
        println!("{}", to_pretty_json(&cache.values())?);

        Ok(())
    }

    fn check(config: &Config, input: &str) -> Result<(), LivePulseError> {
        let id = VideoId::parse(input).map_err(|e| LivePulseError::Error(e.to_string()))?;
        let prober = HttpProber::new(&config.probe)?;

        let snapshot = runtime()?.block_on(async {
            let checked_at = Utc::now();
            match prober.probe(&id).await {
                Ok(outcome) => StatusSnapshot::probed(&id, &outcome, checked_at),
                Err(e) => StatusSnapshot::probe_failed(&id, &e, checked_at),
            }
        });

        println!("{}", to_pretty_json(&snapshot)?);
        Ok(())
    }
}

fn runtime() -> Result<Runtime, LivePulseError> {
    Runtime::new().map_err(|e| LivePulseError::Error(format!("Failed to create runtime: {}", e)))
}

fn init_logging(logging: &LoggingConfig) -> Result<LoggerHandle, LivePulseError> {
    Logger::try_with_str(logging.log_spec())
        .and_then(|logger| logger.format(flexi_logger::detailed_format).start())
        .map_err(|e| LivePulseError::Error(format!("Failed to start logger: {}", e)))
}

fn to_pretty_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, LivePulseError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| LivePulseError::Error(format!("Failed to serialize output: {}", e)))
}
