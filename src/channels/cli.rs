use super::traits::{Messenger, ReplyAction};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Local stand-in for Slack: prints every reply to stdout and keeps a copy.
/// Used by `iyashi-bot ask` to try commands without a workspace.
#[derive(Default)]
pub struct CliMessenger {
    sent: Mutex<Vec<ReplyAction>>,
    quiet: bool,
}

impl CliMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record replies without printing them.
    pub fn quiet() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            quiet: true,
        }
    }

    pub fn sent(&self) -> Vec<ReplyAction> {
        self.sent.lock().clone()
    }

    fn record(&self, action: ReplyAction) {
        if !self.quiet {
            println!("{action}");
        }
        self.sent.lock().push(action);
    }
}

#[async_trait]
impl Messenger for CliMessenger {
    fn name(&self) -> &str {
        "cli"
    }

    async fn post_to_channel(&self, channel: &str, text: &str) -> anyhow::Result<()> {
        self.record(ReplyAction::PostToChannel {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn direct_message(&self, user: &str, text: &str) -> anyhow::Result<()> {
        self.record(ReplyAction::direct(user, text));
        Ok(())
    }

    async fn reply_mentioning(&self, channel: &str, user: &str, text: &str) -> anyhow::Result<()> {
        self.record(ReplyAction::reply(channel, user, text));
        Ok(())
    }
}
