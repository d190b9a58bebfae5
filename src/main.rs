use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::Parser;
use log::{debug, info};

use sonabot::store;
use utils::print_err;

mod logging;
mod sonabot;
mod utils;

/// Discord bot answering mentions with help, insults and web searches
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Bot token, overrides the one in the config file
    #[clap(long, short, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Don't relay terminal input into the passthrough channel
    #[clap(long, short)]
    disable_passthrough: bool,

    /// Config file to use instead of the one in the data directory
    #[clap(long, short)]
    config: Option<PathBuf>,
}

async fn start(args: Args) -> Result<()> {
    let config_path = args.config.unwrap_or_else(store::config_file_path);
    let config = store::load_config(&config_path)?.with_token_override(args.token);
    sonabot::run(config, !args.disable_passthrough).await
}

// Initialization failures (bad config, missing token, gateway refusing the token) end the
// process with a non-zero status instead of idling without a connection.
fn main() -> ExitCode {
    let args = Args::parse();
    let logger = logging::init();
    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start tokio runtime")
    {
        Ok(runtime) => runtime,
        Err(e) => {
            print_err(&e);
            return ExitCode::FAILURE;
        }
    };

    let result = runtime.block_on(start(args));
    // Terminal reads block a worker thread until the next line; don't wait for it.
    runtime.shutdown_timeout(Duration::from_secs(1));
    debug!("All workers stopped.");

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            print_err(&e);
            ExitCode::FAILURE
        }
    };
    info!("Bye.");
    logger.flush();
    code
}
