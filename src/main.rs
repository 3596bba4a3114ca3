mod app;

use std::process;

use log::LevelFilter;
use process_log_system::{Logger, LoggerConfig};

fn main() {
    let config = match LoggerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[ERROR]: {}", e);
            process::exit(2);
        }
    };
    let logger = match Logger::new(config) {
        Ok(logger) => logger,
        Err(e) => {
            eprintln!("[ERROR]: {}", e);
            process::exit(2);
        }
    };
    if let Err(e) = logger.start() {
        eprintln!("[ERROR]: {}", e);
        process::exit(2);
    }
    if let Err(e) = logger.install_global(LevelFilter::Debug) {
        logger.warn(e);
    }

    app::cli::run_cli(&logger);
    logger.stop();
}
