use std::fmt::Display;

use regex::Regex;
use serenity::all::UserId;

use super::search::SearchEngine;

pub const HELP_KEYWORD: &str = "help";
pub const INSULT_KEYWORD: &str = "insult me";

/// Everything the bot knows how to answer. Exactly one is picked per mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Mention,
    Help,
    Insult,
    Search { engine: SearchEngine, terms: String },
    Unknown,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Mention => CommandKind::Mention,
            Command::Help => CommandKind::Help,
            Command::Insult => CommandKind::Insult,
            Command::Search {
                engine: SearchEngine::Mdn,
                ..
            } => CommandKind::SearchMdn,
            Command::Search {
                engine: SearchEngine::GoPackages,
                ..
            } => CommandKind::SearchPackages,
            Command::Search {
                engine: SearchEngine::GitHub,
                ..
            } => CommandKind::SearchRepos,
            Command::Unknown => CommandKind::Unknown,
        }
    }
}

impl Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Search { terms, .. } => write!(f, "{:?}({:?})", self.kind(), terms),
            _ => write!(f, "{:?}", self.kind()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    Mention,
    Help,
    Insult,
    SearchMdn,
    SearchPackages,
    SearchRepos,
    Unknown,
}

pub struct CommandDescription {
    pub keyword: String,
    pub description: String,
}

pub fn supported_commands() -> Vec<CommandDescription> {
    let mut commands = vec![CommandDescription {
        keyword: HELP_KEYWORD.into(),
        description: "Returns this dialogue, a list of commands.".into(),
    }];
    commands.extend(SearchEngine::all().into_iter().map(|e| CommandDescription {
        keyword: format!("{} <search terms>", e.keyword()),
        description: e.description().into(),
    }));
    commands.push(CommandDescription {
        keyword: INSULT_KEYWORD.into(),
        description: "If you are feeling too proud".into(),
    });
    commands
}

/// Anchored matchers built around the bot's own mention token.
///
/// Rules are tried in a fixed order and the first hit wins:
/// bare mention, `help`, `insult me`, then the search keywords.
/// Anything else is [`Command::Unknown`].
pub struct Grammar {
    mention: Regex,
    help: Regex,
    insult: Regex,
    searches: Vec<(SearchEngine, Regex)>,
}

impl Grammar {
    pub fn new(bot_id: UserId) -> Self {
        let prefix = format!(r"^\s*<@!?{bot_id}>\s*");
        let rule = |body: &str| {
            Regex::new(&format!("{prefix}{body}")).expect("grammar rules are valid regexes")
        };
        let searches = SearchEngine::all()
            .into_iter()
            .map(|e| (e, rule(&format!(r"(?i:{})\b((?s:.*))$", regex::escape(e.keyword())))))
            .collect();
        Self {
            mention: rule("$"),
            help: rule(&format!(r"(?i:{HELP_KEYWORD})\b")),
            insult: rule(r"(?i:insult\s+me)\b"),
            searches,
        }
    }

    /// Classifies a message that is already known to mention the bot.
    pub fn parse(&self, content: &str) -> Command {
        if self.mention.is_match(content) {
            return Command::Mention;
        }
        if self.help.is_match(content) {
            return Command::Help;
        }
        if self.insult.is_match(content) {
            return Command::Insult;
        }
        for (engine, rule) in &self.searches {
            if let Some(captures) = rule.captures(content) {
                let terms = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
                return Command::Search {
                    engine: *engine,
                    terms: terms.trim().to_string(),
                };
            }
        }
        Command::Unknown
    }
}
