//! Say hello to Amazon Bedrock.
//!
//! Reads AWS credentials from `config.json` (or the file named by `HELLO_BEDROCK_CONFIG`) and
//! asks a Llama 3.1 inference profile what "Hello World" means. Only a config that cannot be
//! loaded fails the process; Bedrock failures are printed and the run still succeeds.
//!
//! Logs go to stderr and are filtered with `RUST_LOG`.
use std::io::{self, Write as _};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use hello_bedrock::{AppConfig, BedrockFactory, InferenceRunner, config_path};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = ?err, "Run aborted");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let path = config_path();

    println!("Loading Amazon Bedrock credentials...");
    let config = match AppConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            println!("Error loading credentials: {err}");
            println!("Error type: {}", err.kind());
            println!(
                "Make sure the {} file exists and contains valid JSON.",
                err.path().display()
            );
            return Ok(ExitCode::FAILURE);
        }
    };

    let runner = InferenceRunner::new(config.settings, config.credentials);
    publish_credentials(&runner);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let mut stdout = io::stdout().lock();
    let outcome = runtime.block_on(runner.run(&BedrockFactory, &mut stdout))?;
    stdout.flush()?;

    tracing::debug!(?outcome, "Run finished");

    Ok(ExitCode::SUCCESS)
}

#[allow(unsafe_code)]
fn publish_credentials(runner: &InferenceRunner) {
    // SAFETY: called before the runtime starts, no other thread exists yet
    if unsafe { runner.publish_credentials() } {
        tracing::debug!("Published credentials to the environment");
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
