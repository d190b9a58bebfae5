use std::sync::{Arc, OnceLock};

use anyhow::{Context as _, Result};
use log::{debug, error, info};
use serenity::all::{ChannelId, Context, EventHandler, Message};

use super::command::{supported_commands, Command, CommandKind, Grammar};
use super::gateway::{BotIdentity, Gateway, InboundMessage};
use super::insults::Insults;
use super::search::{PageFetcher, SearchExecutor, NOTHING_FOUND};
use crate::utils::ResultExt as _;

/// A parsed command bound to the channel it came from. Lives for a single reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: Command,
    pub reply_to: ChannelId,
}

pub struct Dispatcher<G, F> {
    gateway: G,
    search: SearchExecutor<F>,
    insults: Insults,
    grammar: OnceLock<Grammar>,
}

impl<G: Gateway, F: PageFetcher> Dispatcher<G, F> {
    pub fn new(gateway: G, search: SearchExecutor<F>) -> Self {
        Self {
            gateway,
            search,
            insults: Insults::new(),
            grammar: OnceLock::new(),
        }
    }

    /// Handles one inbound message. Returns the kind of command answered, if any.
    ///
    /// Own messages and messages that don't mention the bot are ignored.
    pub async fn on_message(
        &self,
        me: &BotIdentity,
        message: &InboundMessage,
    ) -> Result<Option<CommandKind>> {
        if message.author_id == me.id {
            return Ok(None);
        }
        if !message.mentions_user(me.id) {
            return Ok(None);
        }
        let invocation = self.parse(me, message);
        let kind = invocation.command.kind();
        info!(
            "Command {} in channel {}: {:?}",
            invocation.command, invocation.reply_to, message.content
        );
        self.execute(me, invocation).await?;
        Ok(Some(kind))
    }

    pub fn parse(&self, me: &BotIdentity, message: &InboundMessage) -> Invocation {
        let grammar = self.grammar.get_or_init(|| Grammar::new(me.id));
        Invocation {
            command: grammar.parse(&message.content),
            reply_to: message.channel_id,
        }
    }

    /// Sends exactly one reply for `invocation`. Send failures are returned, not retried.
    pub async fn execute(&self, me: &BotIdentity, invocation: Invocation) -> Result<()> {
        let reply = self.respond(me, &invocation.command).await;
        debug!("Reply to {}: {} bytes", invocation.reply_to, reply.len());
        self.gateway
            .send_message(invocation.reply_to, &reply)
            .await
            .with_context(|| format!("Failed to answer {}", invocation.command))
    }

    pub async fn respond(&self, me: &BotIdentity, command: &Command) -> String {
        match command {
            Command::Mention => mention_reply(me),
            Command::Help => help_message(),
            Command::Insult => self.insults.pick().to_string(),
            Command::Search { engine, terms } => match self.search.search(*engine, terms).await {
                Ok(reply) => reply.into_text(),
                Err(e) => {
                    error!("{e:#}");
                    String::from(NOTHING_FOUND)
                }
            },
            Command::Unknown => unknown_reply(me),
        }
    }
}

pub fn mention_reply(me: &BotIdentity) -> String {
    format!("You called sire? Mention me with {}", me.display_name())
}

pub fn unknown_reply(me: &BotIdentity) -> String {
    format!("Um... I didn't get that. Try `{} help`", me.display_name())
}

pub fn help_message() -> String {
    let commands = supported_commands()
        .into_iter()
        .map(|c| format!(" - `{}` {}", c.keyword, c.description));
    format!("Commands:\n{}", itertools::join(commands, "\n"))
}

/// Feeds gateway message events into a [`Dispatcher`].
pub struct CommandListener<G, F>(Arc<Dispatcher<G, F>>);

impl<G, F> CommandListener<G, F> {
    pub fn new(dispatcher: Arc<Dispatcher<G, F>>) -> Self {
        Self(dispatcher)
    }
}

#[serenity::async_trait]
impl<G, F> EventHandler for CommandListener<G, F>
where
    G: Gateway + 'static,
    F: PageFetcher + 'static,
{
    async fn message(&self, ctx: Context, msg: Message) {
        let me = {
            let user = ctx.cache.current_user();
            BotIdentity {
                id: user.id,
                name: user.name.clone(),
            }
        };
        self.0
            .on_message(&me, &InboundMessage::from(&msg))
            .await
            .print_err();
    }
}
