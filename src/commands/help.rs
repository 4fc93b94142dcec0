use super::{Command, CommandError, CommandRequest};
use crate::channels::ReplyAction;
use async_trait::async_trait;
use std::sync::Arc;

/// Lists every other command as `triggers: help` inside a code block.
/// `help <trigger>` answers with just that command's help text.
pub struct HelpCommand {
    triggers: Vec<String>,
    commands: Vec<Arc<dyn Command>>,
}

impl HelpCommand {
    pub fn new(commands: Vec<Arc<dyn Command>>) -> Self {
        Self {
            triggers: vec!["help".into(), "?".into()],
            commands,
        }
    }
}

pub(crate) fn render_listing(commands: &[Arc<dyn Command>]) -> String {
    let lines: Vec<String> = commands
        .iter()
        .map(|c| format!("{}: {}", c.triggers().join("|"), c.help()))
        .collect();
    format!("```{}```", lines.join("\n"))
}

#[async_trait]
impl Command for HelpCommand {
    fn triggers(&self) -> &[String] {
        &self.triggers
    }

    fn help(&self) -> String {
        render_listing(&self.commands)
    }

    async fn execute(
        &self,
        request: &CommandRequest,
        args: &[String],
    ) -> Result<Vec<ReplyAction>, CommandError> {
        let text = match args {
            [topic] => self
                .commands
                .iter()
                .find(|c| c.matches(topic))
                .map_or_else(|| self.help(), |c| c.help()),
            _ => self.help(),
        };
        Ok(vec![ReplyAction::reply(&request.channel, &request.user, text)])
    }
}
