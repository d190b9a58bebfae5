use anyhow::{Context as _, Result};
use log::{info, warn};
use tokio::io::{AsyncBufRead, AsyncBufReadExt as _};

use super::channels::ChannelDirectory;
use super::gateway::Gateway;
use crate::utils::ResultExt as _;

const EXIT_SENTINEL: &str = "exit";

/// Relays operator input into a chat channel, one message per line.
pub struct Passthrough<G> {
    gateway: G,
    channels: ChannelDirectory,
    channel_name: String,
}

impl<G: Gateway> Passthrough<G> {
    pub fn new(gateway: G, channels: ChannelDirectory, channel_name: impl Into<String>) -> Self {
        Self {
            gateway,
            channels,
            channel_name: channel_name.into(),
        }
    }

    /// Returns only on `exit`. Closed input stops the relay but leaves the bot running.
    pub async fn run(&self, input: impl AsyncBufRead + Unpin) -> Result<()> {
        info!(
            "Type `{EXIT_SENTINEL}` to quit, and type anything else to speak through me in #{}!",
            self.channel_name
        );
        let mut lines = input.lines();
        while let Some(line) = lines
            .next_line()
            .await
            .context("Failed to read terminal input")?
        {
            let line = line.trim_end_matches('\r');
            if line == EXIT_SENTINEL {
                info!("Exit requested from terminal");
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }
            self.relay(line).await;
        }
        info!("Terminal input closed, relay stopped");
        std::future::pending().await
    }

    async fn relay(&self, text: &str) {
        match self.channels.get(&self.channel_name).await {
            Some(channel) => self.gateway.send_message(channel, text).await.print_err(),
            None => warn!(
                "Channel #{} not known (yet), message dropped",
                self.channel_name
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use serenity::all::{ChannelId, GuildId};

    use super::*;
    use crate::sonabot::gateway::ChannelRef;

    #[derive(Default)]
    struct RecordingGateway(Mutex<Vec<(ChannelId, String)>>);

    impl Gateway for RecordingGateway {
        async fn send_message(&self, channel: ChannelId, text: &str) -> Result<()> {
            self.0.lock().unwrap().push((channel, text.to_string()));
            Ok(())
        }

        async fn list_channels(&self, _guild: GuildId) -> Result<Vec<ChannelRef>> {
            Ok(vec![])
        }
    }

    async fn directory_with_dev_channel() -> ChannelDirectory {
        let channels = ChannelDirectory::new();
        channels
            .insert(ChannelRef {
                id: ChannelId::new(42),
                name: "sona-dev".into(),
            })
            .await;
        channels
    }

    #[tokio::test]
    async fn relays_until_exit() {
        let passthrough = Passthrough::new(
            RecordingGateway::default(),
            directory_with_dev_channel().await,
            "sona-dev",
        );
        let input: &[u8] = b"hello\r\n\n  \nworld\nexit\nnot sent\n";
        passthrough.run(input).await.unwrap();
        let sent = passthrough.gateway.0.lock().unwrap().clone();
        assert_eq!(
            sent,
            [
                (ChannelId::new(42), String::from("hello")),
                (ChannelId::new(42), String::from("world")),
            ]
        );
    }

    #[tokio::test]
    async fn unknown_channel_drops_messages() {
        let passthrough = Passthrough::new(
            RecordingGateway::default(),
            directory_with_dev_channel().await,
            "elsewhere",
        );
        let input: &[u8] = b"hello\nexit\n";
        passthrough.run(input).await.unwrap();
        assert!(passthrough.gateway.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn closed_input_keeps_running() {
        let passthrough = Passthrough::new(
            RecordingGateway::default(),
            directory_with_dev_channel().await,
            "sona-dev",
        );
        let input: &[u8] = b"hello\n";
        let outcome = tokio::time::timeout(Duration::from_millis(200), passthrough.run(input)).await;
        assert!(outcome.is_err(), "run returned on end of input");
        assert_eq!(passthrough.gateway.0.lock().unwrap().len(), 1);
    }
}
