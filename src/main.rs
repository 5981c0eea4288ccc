mod api;
mod cli;
mod config;
mod database;
mod error;
mod poller;
mod probe;
mod server;
mod status_cache;
mod store;
mod video_id;
mod watchlist;

use cli::Cli;
use log::error;

fn main() {
    // Logging is configured from config.toml ([logging] section) once the
    // config has been loaded. Levels: error, warn, info, debug, trace
    if let Err(err) = Cli::handle_command_line() {
        error!("{:?}", err);
        eprintln!("{}", err);
        std::process::exit(1);
    }
}
