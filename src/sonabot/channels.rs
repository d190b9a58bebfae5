use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use serenity::all::{ChannelId, Context, EventHandler, GuildId, Ready};
use tokio::sync::RwLock;

use super::gateway::{ChannelRef, Gateway};
use crate::utils::print_err;

/// Channel name -> id lookup, filled when the gateway reports ready.
///
/// Channels from different guilds share one namespace; a later guild wins on name clashes.
#[derive(Clone, Default)]
pub struct ChannelDirectory(Arc<RwLock<HashMap<String, ChannelRef>>>);

impl ChannelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, channel: ChannelRef) {
        self.0.write().await.insert(channel.name.clone(), channel);
    }

    pub async fn get(&self, name: &str) -> Option<ChannelId> {
        self.0.read().await.get(name).map(|c| c.id)
    }

    pub async fn len(&self) -> usize {
        self.0.read().await.len()
    }
}

pub struct ChannelIndexer<G> {
    gateway: G,
    directory: ChannelDirectory,
}

impl<G: Gateway> ChannelIndexer<G> {
    pub fn new(gateway: G, directory: ChannelDirectory) -> Self {
        Self { gateway, directory }
    }

    /// A guild whose listing fails is skipped; the rest are still indexed.
    pub async fn index_guilds(&self, guilds: impl IntoIterator<Item = GuildId>) {
        for guild in guilds {
            let Some(channels) = self
                .gateway
                .list_channels(guild)
                .await
                .inspect_err(print_err)
                .ok()
            else {
                continue;
            };
            for channel in channels {
                debug!("Indexed channel #{} ({})", channel.name, channel.id);
                self.directory.insert(channel).await;
            }
        }
        info!("Known channels: {}", self.directory.len().await);
    }
}

#[serenity::async_trait]
impl<G: Gateway + 'static> EventHandler for ChannelIndexer<G> {
    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);
        let guilds: Vec<GuildId> = ready.guilds.iter().map(|g| g.id).collect();
        self.index_guilds(guilds).await;
    }
}
