use clap::Parser;
use log::{error, info};

use prionotes::{App, Cli};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Application starting up");

    let mut app = match App::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to open note store: {}", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let outcome = app.run(cli.command).await;
    let shutdown = app.shutdown().await;

    info!("Application shutting down");

    if let Err(e) = outcome.and(shutdown) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
