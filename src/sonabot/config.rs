use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub discord_bot_token: String,

    /// Channel that receives lines typed into the bot's terminal.
    #[serde(default = "default_passthrough_channel_name")]
    pub passthrough_channel_name: String,

    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_passthrough_channel_name() -> String {
    "sona-dev".into()
}

fn default_max_search_results() -> usize {
    3
}

fn default_user_agent() -> String {
    format!("sonabot/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discord_bot_token: Default::default(),
            passthrough_channel_name: default_passthrough_channel_name(),
            max_search_results: default_max_search_results(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    /// Token given on the command line or in the environment wins over the file.
    pub fn with_token_override(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.discord_bot_token = token;
        }
        self
    }

    pub fn has_token(&self) -> bool {
        !self.discord_bot_token.trim().is_empty()
    }
}
