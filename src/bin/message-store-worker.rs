//! Runs every aggregator against the configured SQLite databases until
//! stdin closes or a line is entered.
//!
//! Usage: `message-store-worker [config-file]`

use std::io::BufRead;

use message_store::{logging, App, AppError, Settings};

fn main() {
    if let Err(err) = run() {
        eprintln!("message-store-worker: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), AppError> {
    let settings = match std::env::args().nth(1) {
        Some(path) => Settings::from_file(&path)?,
        None => Settings::load()?,
    };
    logging::init(&settings.logging)?;

    let app = App::open(&settings)?;
    let running = app.start();
    tracing::info!(aggregators = ?running.names(), "worker started, press enter to stop");

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    for (name, stats) in running.stop() {
        match stats.fatal_error {
            Some(error) => tracing::error!(aggregator = %name, %error, "aggregator failed"),
            None => tracing::info!(
                aggregator = %name,
                batches = stats.batches,
                applied = stats.messages_applied,
                skipped = stats.messages_skipped,
                position = stats.position,
                "aggregator stopped"
            ),
        }
    }
    Ok(())
}
