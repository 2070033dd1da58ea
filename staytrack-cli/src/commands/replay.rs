//! Replay command - run a recorded position log through the engine.

use std::path::{Path, PathBuf};

use clap::{Args, ValueEnum};
use staytrack::config::ConfigFile;
use staytrack::logging::init_logging;
use staytrack::sensor::AuthorizationState;

use crate::error::CliError;
use crate::replay::{read_log, replay, FixtureGeocoder, ReplayOptions, ReplayReport};

/// Authorization the replayed sensor starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthorizationArg {
    /// Access granted at all times
    Always,
    /// Access granted while in use
    WhenInUse,
    /// Not asked yet; the log must grant access with an authorization record
    NotDetermined,
    /// Access refused
    Denied,
}

impl From<AuthorizationArg> for AuthorizationState {
    fn from(arg: AuthorizationArg) -> Self {
        match arg {
            AuthorizationArg::Always => AuthorizationState::Always,
            AuthorizationArg::WhenInUse => AuthorizationState::WhenInUse,
            AuthorizationArg::NotDetermined => AuthorizationState::NotDetermined,
            AuthorizationArg::Denied => AuthorizationState::Denied,
        }
    }
}

/// Arguments for the replay command.
#[derive(Debug, Args)]
pub struct ReplayArgs {
    /// Position log in JSON lines format
    pub log: PathBuf,

    /// JSON file of known addresses used instead of a live geocoder
    #[arg(long)]
    pub addresses: Option<PathBuf>,

    /// Authorization the sensor starts with
    #[arg(long, value_enum, default_value = "always")]
    pub authorization: AuthorizationArg,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the replay command.
pub fn run(args: ReplayArgs, config_path: &Path) -> Result<(), CliError> {
    let config = ConfigFile::load_from(config_path)?;
    let _logging_guard = init_logging(&config.logging.directory, &config.logging.file)
        .map_err(CliError::LoggingInit)?;

    let records = read_log(&args.log)?;
    let geocoder = match &args.addresses {
        Some(path) => FixtureGeocoder::from_file(path)?,
        None => FixtureGeocoder::default(),
    };
    let options = ReplayOptions {
        engine: config.engine,
        authorization: args.authorization.into(),
    };

    tracing::info!(log = %args.log.display(), records = records.len(), "Replaying position log");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let report = runtime.block_on(replay(records, options, geocoder));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &ReplayReport) {
    println!(
        "Replayed {} records: {} samples stored, {} mode changes",
        report.records,
        report.samples_stored,
        report.mode_changes.len()
    );
    println!();

    if report.places.is_empty() {
        println!("No places recorded.");
    } else {
        println!("Places ({}):", report.places.len());
        for (index, place) in report.places.iter().enumerate() {
            println!("  {}. {}", index + 1, place.display_address());
            println!(
                "     {} - {} UTC ({} min, {} samples)",
                place.start_time.format("%Y-%m-%d %H:%M:%S"),
                place.end_time.format("%H:%M:%S"),
                place.duration().as_secs() / 60,
                place.sample_count
            );
        }
    }

    if report.discarded > 0 {
        println!();
        println!("Discarded {} short stays", report.discarded);
    }
    if report.persistence_failures > 0 {
        println!("Save failures: {}", report.persistence_failures);
    }

    println!();
    println!(
        "Geocode: {} lookups, {} cache hits, {} failures",
        report.geocode.provider_calls, report.geocode.cache_hits, report.geocode.failures
    );
}
