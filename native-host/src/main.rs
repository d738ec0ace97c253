//! Native messaging host for the jobscope browser extension.
//!
//! Reads length-prefixed JSON frames from stdin until the browser closes
//! the pipe and answers each with exactly one frame on stdout.

mod logging;

use std::io::{self, BufReader, Read, Write};
use std::process::ExitCode;

use log::{error, info, warn};

use jobscope::codec;
use jobscope::config::{default_config_path, load_or_default, LoggingConfig};
use jobscope::protocol::encode_response;
use jobscope::{Config, Database, Dispatcher, JobscopeError};

fn main() -> ExitCode {
    let config = match load_or_default(default_config_path().as_deref()) {
        Ok(config) => config,
        Err(e) => {
            // Logging is not configured yet; stderr is all there is.
            let _ = logging::init(&LoggingConfig::default());
            error!("{}", e);
            return ExitCode::from(2);
        }
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("jobscope-host: {}", e);
    }

    info!("Native host v{} started", env!("CARGO_PKG_VERSION"));

    match run(config) {
        Ok(()) => {
            info!("Input closed, exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<(), JobscopeError> {
    let db = match Database::open(&config.database_path) {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("Database unavailable, continuing without it: {}", e);
            None
        }
    };

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(JobscopeError::Runtime)?;
    let dispatcher = Dispatcher::new(config, db);

    let stdin = io::stdin();
    let stdout = io::stdout();
    serve(
        &runtime,
        &dispatcher,
        &mut BufReader::new(stdin.lock()),
        &mut stdout.lock(),
    )
}

/// Answers frames until a clean end of stream. A malformed frame is fatal.
fn serve<R: Read, W: Write>(
    runtime: &tokio::runtime::Runtime,
    dispatcher: &Dispatcher,
    input: &mut R,
    output: &mut W,
) -> Result<(), JobscopeError> {
    while let Some(frame) = codec::read_frame(input)? {
        let response = runtime.block_on(dispatcher.dispatch(&frame));
        codec::write_frame(output, &encode_response(&response))?;
    }
    Ok(())
}
