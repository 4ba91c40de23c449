mod app;
mod config;
mod error;
mod manager;
mod models;
mod worker;

use std::{io::Write, process::ExitCode};

use app::{cli, notifier::Notifier};
use config::PlaygroundConfig;
use error::PlaygroundError;
use manager::launch_manager::LaunchManager;

fn main() -> ExitCode {
    init_logging();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\r[ERROR]: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), PlaygroundError> {
    let config = PlaygroundConfig::load()?;

    let mut manager = LaunchManager::new(&config)?;
    let notifier = Notifier::new(config.notification_duration());
    notifier.start(manager.subscribe()).map_err(PlaygroundError::Runtime)?;
    manager.start()?;

    cli::run_cli(&mut manager, &notifier)
}

fn init_logging() {
    // Raw mode needs explicit carriage returns.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| writeln!(buf, "\r[{}] {}\r", record.level(), record.args()))
        .init();
}
