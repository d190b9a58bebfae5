use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use serenity::all::{ChannelId, GuildId, Http, Message, UserId};

/// The bot's own account, as reported by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotIdentity {
    pub id: UserId,
    pub name: String,
}

impl BotIdentity {
    /// Name users see when they mention the bot.
    pub fn display_name(&self) -> String {
        format!("@{}", self.name)
    }
}

/// Slice of an inbound chat message the bot cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub author_id: UserId,
    pub channel_id: ChannelId,
    pub content: String,
    pub mentions: Vec<UserId>,
}

impl InboundMessage {
    pub fn mentions_user(&self, user: UserId) -> bool {
        self.mentions.contains(&user)
    }
}

impl From<&Message> for InboundMessage {
    fn from(msg: &Message) -> Self {
        Self {
            author_id: msg.author.id,
            channel_id: msg.channel_id,
            content: msg.content.clone(),
            mentions: msg.mentions.iter().map(|u| u.id).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub name: String,
}

/// Outbound half of the chat platform connection.
pub trait Gateway: Send + Sync {
    fn send_message(
        &self,
        channel: ChannelId,
        text: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    fn list_channels(&self, guild: GuildId) -> impl Future<Output = Result<Vec<ChannelRef>>> + Send;
}

#[derive(Clone)]
pub struct SerenityGateway {
    http: Arc<Http>,
}

impl SerenityGateway {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

impl Gateway for SerenityGateway {
    async fn send_message(&self, channel: ChannelId, text: &str) -> Result<()> {
        channel
            .say(&self.http, text)
            .await
            .with_context(|| format!("Failed to send message to channel {channel}"))?;
        Ok(())
    }

    async fn list_channels(&self, guild: GuildId) -> Result<Vec<ChannelRef>> {
        let channels = self
            .http
            .get_channels(guild)
            .await
            .with_context(|| format!("Failed to get channels of guild {guild}"))?;
        Ok(channels
            .into_iter()
            .map(|c| ChannelRef {
                id: c.id,
                name: c.name,
            })
            .collect())
    }
}
