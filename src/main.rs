//! Postman From Source - command-line tool that turns the HTTP routes of a Go project
//! into a Postman Collection v2.1.
//!
//! # Usage
//!
//! ```bash
//! postman-from-source [OPTIONS] [PROJECT_PATH]
//! ```
//!
//! # Examples
//!
//! Write a collection grouped by the first two path segments:
//! ```bash
//! postman-from-source ./my-service --group-depth 2 -o collection.json
//! ```
//!
//! Also write an environment for a staging server:
//! ```bash
//! postman-from-source ./my-service --base-url https://staging.example.com \
//!     --env-out staging.env.json --env-name Staging
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use postman_from_source::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Postman From Source starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
