use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use anyhow::{bail, format_err, Context as _, Result};
use log::info;
use tokio::io::BufReader;
use tokio::signal;

use channels::{ChannelDirectory, ChannelIndexer};
use config::Config;
use dispatcher::{CommandListener, Dispatcher};
use passthrough::Passthrough;
use search::{HttpFetcher, SearchExecutor};
use session::DiscordSession;

pub mod channels;
pub mod command;
pub mod config;
pub mod dispatcher;
pub mod gateway;
pub mod insults;
pub mod passthrough;
pub mod search;
pub mod session;
pub mod store;

/// Runs the bot until a termination signal, `exit` typed in the terminal, or a dead gateway.
pub async fn run(config: Config, passthrough_enabled: bool) -> Result<()> {
    if !config.has_token() {
        bail!("Missing Discord bot token: use --token, DISCORD_BOT_TOKEN or discordBotToken in the config file");
    }
    let mut session = DiscordSession::new(&config.discord_bot_token).await?;
    let channels = ChannelDirectory::new();
    let search = SearchExecutor::new(
        HttpFetcher::new(&config.user_agent)?,
        config.max_search_results,
    );
    let dispatcher = Arc::new(Dispatcher::new(session.gateway(), search));
    session.add_handler(ChannelIndexer::new(session.gateway(), channels.clone()));
    session.add_handler(CommandListener::new(dispatcher));
    session.open()?;

    let passthrough = Passthrough::new(
        session.gateway(),
        channels,
        config.passthrough_channel_name.clone(),
    );
    if !passthrough_enabled {
        info!("Bot is now running. Press CTRL-C to exit.");
    }
    let outcome = tokio::select! {
        r = terminate_on_signal() => r,
        r = passthrough.run(BufReader::new(tokio::io::stdin())), if passthrough_enabled => r,
        r = session.disconnected() => {
            r.and_then(|_| Err(format_err!("Discord client stopped unexpectedly")))
        }
    };
    info!("Terminating.");
    session.close().await;
    outcome
}

async fn terminate_on_signal() -> Result<()> {
    let interrupt_signal: Pin<Box<dyn Future<Output = _> + Send>> = Box::pin(async {
        signal::unix::signal(signal::unix::SignalKind::interrupt())
            .context("Failed to register terminate signal handlers!")?
            .recv()
            .await;
        info!("Interrupt received");
        Ok(())
    });
    let terminate_signal = Box::pin(async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to register terminate signal handlers!")?
            .recv()
            .await;
        info!("Terminate signal received");
        Ok(())
    });
    futures_util::future::select_all([interrupt_signal, terminate_signal])
        .await
        .0
}
