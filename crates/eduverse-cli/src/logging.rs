//! Logging setup
//!
//! `RUST_LOG` wins when set. Otherwise the `-v` count picks the level for
//! this binary and `eduverse_core`. Output goes to the configured log file,
//! or stderr when none is set.

use std::fs::OpenOptions;
use std::sync::Mutex;

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

use eduverse_core::Config;

/// Level for a given number of `-v` flags
pub fn level_for(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter_for(verbose: u8) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    let level = level_for(verbose);
    EnvFilter::new(format!("eduverse_core={},eduverse={}", level, level))
}

/// Initialize the global subscriber (a second call is a no-op)
pub fn init(config: &Config, verbose: u8) {
    let (writer, ansi) = match config.log_file {
        Some(ref path) => match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => (BoxMakeWriter::new(Mutex::new(file)), false),
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
                (BoxMakeWriter::new(std::io::stderr), atty::is(atty::Stream::Stderr))
            }
        },
        None => (BoxMakeWriter::new(std::io::stderr), atty::is(atty::Stream::Stderr)),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter_for(verbose))
        .with_target(false)
        .with_ansi(ansi)
        .with_writer(writer)
        .try_init();
}
