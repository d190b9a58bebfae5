use std::future::pending;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use anyhow::{Context as _, Result};
use log::{debug, info};
use serenity::all::{Context, EventHandler, GatewayIntents, Http, Message, Ready, ShardManager};
use tokio::task::JoinHandle;

use super::gateway::SerenityGateway;
use crate::utils::ResultExt as _;

type HandlerList = RwLock<Vec<(usize, Arc<dyn EventHandler>)>>;

/// The single handler serenity sees. Forwards every event to the registered handlers in
/// registration order.
#[derive(Clone, Default)]
struct HandlerSet {
    handlers: Arc<HandlerList>,
    next_id: Arc<AtomicUsize>,
}

impl HandlerSet {
    fn add(&self, handler: Arc<dyn EventHandler>) -> HandlerRegistration {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handler));
        HandlerRegistration {
            id,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    fn snapshot(&self) -> Vec<Arc<dyn EventHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, h)| h.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[serenity::async_trait]
impl EventHandler for HandlerSet {
    async fn ready(&self, ctx: Context, ready: Ready) {
        for handler in self.snapshot() {
            handler.ready(ctx.clone(), ready.clone()).await;
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        for handler in self.snapshot() {
            handler.message(ctx.clone(), msg.clone()).await;
        }
    }
}

/// Keeps a handler registered. Dropping it removes the handler.
pub struct HandlerRegistration {
    id: usize,
    handlers: Weak<HandlerList>,
}

impl Drop for HandlerRegistration {
    fn drop(&mut self) {
        if let Some(handlers) = self.handlers.upgrade() {
            handlers
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|(id, _)| *id != self.id);
            debug!("Removed event handler #{}", self.id);
        }
    }
}

/// Owns the gateway connection and everything that has to be released on shutdown.
pub struct DiscordSession {
    handlers: HandlerSet,
    registrations: Vec<HandlerRegistration>,
    http: Arc<Http>,
    shard_manager: Arc<ShardManager>,
    client: Option<serenity::Client>,
    runner: Option<JoinHandle<Result<()>>>,
}

impl DiscordSession {
    pub async fn new(token: &str) -> Result<Self> {
        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;
        let handlers = HandlerSet::default();
        let client = serenity::Client::builder(token, intents)
            .event_handler(handlers.clone())
            .await
            .context("Failed to initialize Discord client")?;
        Ok(Self {
            handlers,
            registrations: Vec::new(),
            http: client.http.clone(),
            shard_manager: client.shard_manager.clone(),
            client: Some(client),
            runner: None,
        })
    }

    pub fn gateway(&self) -> SerenityGateway {
        SerenityGateway::new(self.http.clone())
    }

    pub fn add_handler(&mut self, handler: impl EventHandler + 'static) {
        let registration = self.handlers.add(Arc::new(handler));
        debug!("Registered event handler #{}", registration.id);
        self.registrations.push(registration);
    }

    /// Connects to the gateway in a background task.
    pub fn open(&mut self) -> Result<()> {
        let mut client = self
            .client
            .take()
            .context("Discord session already opened")?;
        info!("Discord: Starting Discord client");
        self.runner = Some(tokio::spawn(async move {
            client.start().await.context("Discord client stopped")
        }));
        Ok(())
    }

    /// Resolves when the client task ends on its own; never resolves before `open`.
    pub async fn disconnected(&mut self) -> Result<()> {
        let Some(runner) = self.runner.as_mut() else {
            return pending().await;
        };
        let result = runner.await;
        self.runner = None;
        result.context("Discord client task failed")?
    }

    /// Removes handlers in registration order, then shuts the connection down.
    pub async fn close(mut self) {
        for registration in self.registrations.drain(..) {
            drop(registration);
        }
        debug!("Remaining event handlers: {}", self.handlers.len());
        self.shard_manager.shutdown_all().await;
        if let Some(runner) = self.runner.take() {
            runner
                .await
                .context("Discord client task failed")
                .and_then(|r| r)
                .print_err();
        }
        info!("Discord session closed");
    }
}
