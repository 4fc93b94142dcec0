use super::{Command, CommandError, CommandRequest, DM_SENT_TEXT};
use crate::channels::ReplyAction;
use crate::images::{ImageProvider, SearchCriteria, SearchOutcome};
use async_trait::async_trait;
use std::sync::Arc;

/// Where a found picture goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Reply in the channel, mentioning the requester.
    Channel,
    /// Send by DM, then acknowledge in the channel.
    DirectMessage,
}

/// Searches one [`ImageProvider`] with the command's arguments as terms.
pub struct ImageCommand {
    triggers: Vec<String>,
    help: String,
    provider: Arc<dyn ImageProvider>,
    append_tags: Vec<String>,
    delivery: Delivery,
}

impl ImageCommand {
    pub fn new(
        triggers: impl IntoIterator<Item = impl Into<String>>,
        help: impl Into<String>,
        provider: Arc<dyn ImageProvider>,
        delivery: Delivery,
    ) -> Self {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            help: help.into(),
            provider,
            append_tags: Vec::new(),
            delivery,
        }
    }

    /// Tags added after the user's own on every search.
    pub fn with_append_tags(mut self, tags: Vec<String>) -> Self {
        self.append_tags = tags;
        self
    }

    pub fn delivery(&self) -> Delivery {
        self.delivery
    }
}

#[async_trait]
impl Command for ImageCommand {
    fn triggers(&self) -> &[String] {
        &self.triggers
    }

    fn help(&self) -> String {
        self.help.clone()
    }

    async fn execute(
        &self,
        request: &CommandRequest,
        args: &[String],
    ) -> Result<Vec<ReplyAction>, CommandError> {
        let criteria = SearchCriteria::new(args.iter().cloned())
            .with_appended(self.append_tags.as_slice());
        tracing::debug!(
            provider = self.provider.name(),
            terms = ?criteria.terms(),
            "searching for image"
        );

        let url = match self.provider.search(&criteria).await? {
            SearchOutcome::Found(url) => url,
            SearchOutcome::NotFound => return Err(CommandError::NotFound),
        };

        Ok(match self.delivery {
            Delivery::Channel => vec![ReplyAction::reply(&request.channel, &request.user, url)],
            Delivery::DirectMessage => vec![
                ReplyAction::direct(&request.user, url),
                ReplyAction::reply(&request.channel, &request.user, DM_SENT_TEXT),
            ],
        })
    }
}
