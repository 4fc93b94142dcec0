use async_trait::async_trait;
use std::fmt;

/// One outbound message produced by a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyAction {
    /// Plain post to a channel.
    PostToChannel { channel: String, text: String },
    /// Private message to a user.
    DirectMessage { user: String, text: String },
    /// Channel post addressed to a user with an @-mention.
    ReplyMentioning {
        channel: String,
        user: String,
        text: String,
    },
}

impl ReplyAction {
    pub fn reply(channel: &str, user: &str, text: impl Into<String>) -> Self {
        Self::ReplyMentioning {
            channel: channel.to_string(),
            user: user.to_string(),
            text: text.into(),
        }
    }

    pub fn direct(user: &str, text: impl Into<String>) -> Self {
        Self::DirectMessage {
            user: user.to_string(),
            text: text.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::PostToChannel { text, .. }
            | Self::DirectMessage { text, .. }
            | Self::ReplyMentioning { text, .. } => text,
        }
    }
}

impl fmt::Display for ReplyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostToChannel { channel, text } => write!(f, "[#{channel}] {text}"),
            Self::DirectMessage { user, text } => write!(f, "[dm @{user}] {text}"),
            Self::ReplyMentioning {
                channel,
                user,
                text,
            } => write!(f, "[#{channel}] @{user} {text}"),
        }
    }
}

/// Outbound side of a chat platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Human-readable platform name
    fn name(&self) -> &str;

    async fn post_to_channel(&self, channel: &str, text: &str) -> anyhow::Result<()>;

    async fn direct_message(&self, user: &str, text: &str) -> anyhow::Result<()>;

    async fn reply_mentioning(&self, channel: &str, user: &str, text: &str) -> anyhow::Result<()>;

    /// Route a [`ReplyAction`] to the matching method.
    async fn deliver(&self, action: &ReplyAction) -> anyhow::Result<()> {
        match action {
            ReplyAction::PostToChannel { channel, text } => {
                self.post_to_channel(channel, text).await
            }
            ReplyAction::DirectMessage { user, text } => self.direct_message(user, text).await,
            ReplyAction::ReplyMentioning {
                channel,
                user,
                text,
            } => self.reply_mentioning(channel, user, text).await,
        }
    }
}
