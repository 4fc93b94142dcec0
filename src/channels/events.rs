//! Slack Events API payloads, decoded once at the gateway boundary.
//!
//! Only the pieces the bot acts on are modelled: URL verification handshakes
//! and `app_mention` callbacks. Everything else lands in an `Other` variant
//! and is acknowledged without action.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

/// Leading `<@U123>` mention addressed to the bot.
static LEADING_MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<@.+?>(.+)").unwrap());

/// Outer envelope of an Events API request.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEnvelope {
    UrlVerification { challenge: String },
    EventCallback { event: SlackEvent },
    #[serde(other)]
    Other,
}

/// Inner event of an `event_callback`.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackEvent {
    AppMention(AppMention),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct AppMention {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ts: Option<String>,
    /// Present when the mention was edited after posting.
    #[serde(default)]
    pub edited: Option<serde_json::Value>,
}

impl AppMention {
    pub fn is_edited(&self) -> bool {
        self.edited.is_some()
    }
}

/// Turn mention text into command tokens.
///
/// Pasted text often carries non-breaking spaces, so those become plain
/// spaces first. The leading bot mention is dropped and the remainder is
/// split shell-style, so `"白い 猫"` stays one token.
pub fn mention_tokens(text: &str) -> Result<Vec<String>, shell_words::ParseError> {
    let normalized = text.replace('\u{00A0}', " ");
    let stripped = LEADING_MENTION_RE
        .captures(&normalized)
        .and_then(|caps| caps.get(1))
        .map_or(normalized.as_str(), |m| m.as_str());
    shell_words::split(stripped)
}
