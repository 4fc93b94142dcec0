//! Chat commands and the registry that resolves them.
//!
//! A command is addressed by its first token: the registry walks commands in
//! registration order and picks the first whose trigger list contains that
//! token exactly. `help` is always registered last and lists everything
//! before it. Execution, error translation and reply delivery live in
//! [`executor`].

pub mod executor;
pub mod help;
pub mod image;

pub use executor::{CommandExecutor, Execution};
pub use help::HelpCommand;
pub use image::{Delivery, ImageCommand};

use crate::channels::ReplyAction;
use crate::config::Config;
use crate::images::{
    FlickrCatalog, ImageProvider, MoeStash, ProviderError, RandomPageSearch, RandomSource,
    TumblrCatalog,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Reply sent when a search turns up nothing.
pub const NOT_FOUND_TEXT: &str = "見つかんなかったよ(´・ω・｀)";

/// Channel acknowledgement after a picture went out by DM.
pub const DM_SENT_TEXT: &str = "╭( ･ㅂ･)ﻭ ̑̑ DMしたよ";

/// Reply for any other failure; the cause is appended.
pub fn error_text(cause: &CommandError) -> String {
    format!("エラっちゃった(´・ω・｀) err:{cause}")
}

/// Who asked, and where the answer goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub channel: String,
    pub user: String,
}

impl CommandRequest {
    pub fn new(channel: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            user: user.into(),
        }
    }
}

/// Why a command produced no replies.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The search found nothing; answered with [`NOT_FOUND_TEXT`].
    #[error("no image found")]
    NotFound,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("failed to deliver reply: {0:#}")]
    Delivery(anyhow::Error),

    #[error("unexpected failure: {0:#}")]
    Unexpected(anyhow::Error),
}

/// A chat command: trigger words, a help line, and an async body that turns
/// arguments into replies.
#[async_trait]
pub trait Command: Send + Sync {
    /// Words that select this command (exact, case-sensitive).
    fn triggers(&self) -> &[String];

    /// One-line description for the help listing.
    fn help(&self) -> String;

    fn matches(&self, token: &str) -> bool {
        self.triggers().iter().any(|t| t == token)
    }

    async fn execute(
        &self,
        request: &CommandRequest,
        args: &[String],
    ) -> Result<Vec<ReplyAction>, CommandError>;
}

/// Ordered command list with `help` appended at the end.
pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new(commands: Vec<Arc<dyn Command>>) -> Self {
        let help: Arc<dyn Command> = Arc::new(HelpCommand::new(commands.clone()));
        let mut commands = commands;
        commands.push(help);
        Self { commands }
    }

    /// First command whose triggers contain `token`.
    pub fn find(&self, token: &str) -> Option<Arc<dyn Command>> {
        self.commands.iter().find(|c| c.matches(token)).cloned()
    }

    pub fn commands(&self) -> &[Arc<dyn Command>] {
        &self.commands
    }

    /// The text `help` answers with.
    pub fn help_listing(&self) -> String {
        help::render_listing(&self.commands[..self.commands.len() - 1])
    }
}

/// Build the bot's command set from config, in dispatch order:
/// `もえ`, `癒やし`, then one command per configured blog.
pub fn all_commands(
    config: &Config,
    client: reqwest::Client,
    rng: Arc<dyn RandomSource>,
) -> Vec<Arc<dyn Command>> {
    let moe: Arc<dyn ImageProvider> = Arc::new(MoeStash::new(
        config.moe.base_url.clone(),
        config.moe.keys.clone(),
        rng.clone(),
    ));
    let flickr: Arc<dyn ImageProvider> = Arc::new(RandomPageSearch::new(
        FlickrCatalog::new(
            client.clone(),
            config.flickr.api_key.clone(),
            config.flickr.api_url.clone(),
            config.flickr.default_keywords.clone(),
            rng.clone(),
        ),
        rng.clone(),
    ));

    let mut commands: Vec<Arc<dyn Command>> = vec![
        Arc::new(ImageCommand::new(
            ["もえ"],
            "mix3 が溜め込んだ画像を返すよ！",
            moe,
            Delivery::Channel,
        )),
        Arc::new(ImageCommand::new(
            ["癒やし", "癒し"],
            "flicker から画像を返すよ！",
            flickr,
            Delivery::DirectMessage,
        )),
    ];

    for blog in &config.blogs {
        let tumblr: Arc<dyn ImageProvider> = Arc::new(RandomPageSearch::new(
            TumblrCatalog::new(
                client.clone(),
                config.tumblr.api_key.clone(),
                config.tumblr.api_url.clone(),
                blog.blog.clone(),
            ),
            rng.clone(),
        ));
        let delivery = if blog.direct_message {
            Delivery::DirectMessage
        } else {
            Delivery::Channel
        };
        commands.push(Arc::new(
            ImageCommand::new(
                blog.triggers.iter().filter(|t| !t.trim().is_empty()).cloned(),
                format!("http://{}.tumblr.com/ から画像をランダムで返すよ！", blog.blog),
                tumblr,
                delivery,
            )
            .with_append_tags(blog.append_tags.clone()),
        ));
    }

    commands
}
