//! Runs one command per mention and turns every failure into a reply.
//!
//! Each command body runs in its own tokio task. A panic inside it surfaces
//! as a `JoinError` at the join point and is handled like any other error:
//! logged with the requester's channel and user, then answered with the
//! error reply. Nothing a command does can take the process down.
//!
//! The task is aborted if the caller stops waiting for it, so a dropped
//! request also stops its in-flight provider calls.

use super::{error_text, Command, CommandError, CommandRegistry, CommandRequest, NOT_FOUND_TEXT};
use crate::channels::{mention_tokens, Messenger, ReplyAction};
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};

/// What happened to one mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// No tokens, or text that could not be split.
    Ignored,
    /// First token matched no command.
    Unmatched,
    /// The command ran and its replies were delivered.
    Completed,
    /// The search found nothing and the not-found reply was sent.
    RepliedNotFound,
    /// Something failed and the error reply was attempted.
    RepliedError,
}

#[derive(Clone)]
pub struct CommandExecutor {
    registry: Arc<CommandRegistry>,
    messenger: Arc<dyn Messenger>,
}

impl CommandExecutor {
    pub fn new(registry: Arc<CommandRegistry>, messenger: Arc<dyn Messenger>) -> Self {
        Self {
            registry,
            messenger,
        }
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Tokenize raw mention text and execute it.
    pub async fn execute_text(&self, channel: &str, user: &str, text: &str) -> Execution {
        match mention_tokens(text) {
            Ok(tokens) => self.execute(channel, user, &tokens).await,
            Err(e) => {
                tracing::warn!(channel, user, "Could not split mention text: {e}");
                Execution::Ignored
            }
        }
    }

    /// Execute a tokenized command line: the first token selects the command,
    /// the rest become its arguments.
    pub async fn execute(&self, channel: &str, user: &str, tokens: &[String]) -> Execution {
        let Some((head, args)) = tokens.split_first() else {
            return Execution::Ignored;
        };
        let Some(command) = self.registry.find(head) else {
            tracing::debug!(channel, user, token = %head, "No command matched");
            return Execution::Unmatched;
        };

        tracing::info!(channel, user, command = %head, args = ?args, "Dispatching command");
        let request = CommandRequest::new(channel, user);

        let err = match self.run(command, request, args.to_vec()).await {
            Ok(()) => return Execution::Completed,
            Err(CommandError::NotFound) => {
                match self
                    .messenger
                    .reply_mentioning(channel, user, NOT_FOUND_TEXT)
                    .await
                {
                    Ok(()) => return Execution::RepliedNotFound,
                    Err(e) => CommandError::Delivery(e),
                }
            }
            Err(err) => err,
        };

        tracing::warn!(channel, user, command = %head, "Command failed: {err}");
        if let Err(e) = self
            .messenger
            .reply_mentioning(channel, user, &error_text(&err))
            .await
        {
            tracing::error!(channel, user, "Failed to send error reply: {e:#}");
        }
        Execution::RepliedError
    }

    async fn run(
        &self,
        command: Arc<dyn Command>,
        request: CommandRequest,
        args: Vec<String>,
    ) -> Result<(), CommandError> {
        let mut task = AbortOnDrop(tokio::spawn(async move {
            command.execute(&request, &args).await
        }));
        let actions = (&mut task.0)
            .await
            .map_err(|e| CommandError::Unexpected(join_failure(e)))??;

        self.deliver_all(&actions).await
    }

    async fn deliver_all(&self, actions: &[ReplyAction]) -> Result<(), CommandError> {
        for action in actions {
            self.messenger
                .deliver(action)
                .await
                .map_err(CommandError::Delivery)?;
        }
        Ok(())
    }
}

/// Aborts the command task when dropped. Aborting a finished task is a no-op.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn join_failure(err: JoinError) -> anyhow::Error {
    if !err.is_panic() {
        return anyhow::anyhow!("command task was cancelled");
    }
    let payload = err.into_panic();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());
    anyhow::anyhow!("command panicked: {message}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::CliMessenger;
    use crate::commands::DM_SENT_TEXT;
    use crate::images::ProviderError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    enum Behaviour {
        Reply(Vec<ReplyAction>),
        NotFound,
        ProviderFault,
        Panic,
    }

    struct Scripted {
        triggers: Vec<String>,
        behaviour: Behaviour,
    }

    fn scripted(trigger: &str, behaviour: Behaviour) -> Arc<dyn Command> {
        Arc::new(Scripted {
            triggers: vec![trigger.into()],
            behaviour,
        })
    }

    #[async_trait]
    impl Command for Scripted {
        fn triggers(&self) -> &[String] {
            &self.triggers
        }

        fn help(&self) -> String {
            "scripted".into()
        }

        async fn execute(
            &self,
            _request: &CommandRequest,
            _args: &[String],
        ) -> Result<Vec<ReplyAction>, CommandError> {
            match &self.behaviour {
                Behaviour::Reply(actions) => Ok(actions.clone()),
                Behaviour::NotFound => Err(CommandError::NotFound),
                Behaviour::ProviderFault => Err(ProviderError::Status {
                    provider: "flickr",
                    status: 503,
                    body: "busy".into(),
                }
                .into()),
                Behaviour::Panic => panic!("index out of range"),
            }
        }
    }

    /// Never finishes. Holds `held` until its future is dropped.
    struct Hanging {
        triggers: Vec<String>,
        started: Mutex<Option<oneshot::Sender<()>>>,
        held: Mutex<Option<oneshot::Sender<()>>>,
    }

    #[async_trait]
    impl Command for Hanging {
        fn triggers(&self) -> &[String] {
            &self.triggers
        }

        fn help(&self) -> String {
            "hangs".into()
        }

        async fn execute(
            &self,
            _request: &CommandRequest,
            _args: &[String],
        ) -> Result<Vec<ReplyAction>, CommandError> {
            let held = self.held.lock().take();
            if let Some(started) = self.started.lock().take() {
                let _ = started.send(());
            }
            std::future::pending::<()>().await;
            drop(held);
            Ok(Vec::new())
        }
    }

    /// Messenger whose DMs always fail.
    struct NoDirectMessages(CliMessenger);

    #[async_trait]
    impl Messenger for NoDirectMessages {
        fn name(&self) -> &str {
            "no-dm"
        }

        async fn post_to_channel(&self, channel: &str, text: &str) -> anyhow::Result<()> {
            self.0.post_to_channel(channel, text).await
        }

        async fn direct_message(&self, _user: &str, _text: &str) -> anyhow::Result<()> {
            anyhow::bail!("cannot_dm_bot")
        }

        async fn reply_mentioning(
            &self,
            channel: &str,
            user: &str,
            text: &str,
        ) -> anyhow::Result<()> {
            self.0.reply_mentioning(channel, user, text).await
        }
    }

    fn executor(commands: Vec<Arc<dyn Command>>) -> (CommandExecutor, Arc<CliMessenger>) {
        let messenger = Arc::new(CliMessenger::quiet());
        let executor = CommandExecutor::new(
            Arc::new(CommandRegistry::new(commands)),
            messenger.clone(),
        );
        (executor, messenger)
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| (*w).to_string()).collect()
    }

    #[tokio::test]
    async fn delivers_command_replies_in_order() {
        let actions = vec![
            ReplyAction::direct("U1", "https://img/a.jpg"),
            ReplyAction::reply("C1", "U1", DM_SENT_TEXT),
        ];
        let (executor, messenger) =
            executor(vec![scripted("癒やし", Behaviour::Reply(actions.clone()))]);

        let outcome = executor.execute("C1", "U1", &tokens(&["癒やし"])).await;

        assert_eq!(outcome, Execution::Completed);
        assert_eq!(messenger.sent(), actions);
    }

    #[tokio::test]
    async fn empty_and_unmatched_do_nothing() {
        let (executor, messenger) = executor(vec![scripted("もえ", Behaviour::NotFound)]);

        assert_eq!(executor.execute("C1", "U1", &[]).await, Execution::Ignored);
        assert_eq!(
            executor.execute("C1", "U1", &tokens(&["ねこ"])).await,
            Execution::Unmatched
        );
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn not_found_gets_friendly_reply() {
        let (executor, messenger) = executor(vec![scripted("もえ", Behaviour::NotFound)]);

        let outcome = executor.execute("C1", "U1", &tokens(&["もえ"])).await;

        assert_eq!(outcome, Execution::RepliedNotFound);
        assert_eq!(
            messenger.sent(),
            vec![ReplyAction::reply("C1", "U1", NOT_FOUND_TEXT)]
        );
    }

    #[tokio::test]
    async fn provider_fault_gets_error_reply_with_cause() {
        let (executor, messenger) = executor(vec![scripted("癒し", Behaviour::ProviderFault)]);

        let outcome = executor.execute("C1", "U1", &tokens(&["癒し"])).await;

        assert_eq!(outcome, Execution::RepliedError);
        assert_eq!(
            messenger.sent(),
            vec![ReplyAction::reply(
                "C1",
                "U1",
                "エラっちゃった(´・ω・｀) err:flickr returned HTTP 503: busy"
            )]
        );
    }

    #[tokio::test]
    async fn panicking_command_is_contained() {
        let (executor, messenger) = executor(vec![
            scripted("boom", Behaviour::Panic),
            scripted("ok", Behaviour::Reply(vec![ReplyAction::reply("C1", "U1", "fine")])),
        ]);

        let outcome = executor.execute("C1", "U1", &tokens(&["boom"])).await;
        assert_eq!(outcome, Execution::RepliedError);
        let sent = messenger.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text().starts_with("エラっちゃった(´・ω・｀) err:"));
        assert!(sent[0].text().contains("index out of range"));

        // The executor keeps serving after the panic.
        let outcome = executor.execute("C1", "U1", &tokens(&["ok"])).await;
        assert_eq!(outcome, Execution::Completed);
    }

    #[tokio::test]
    async fn dropping_the_caller_aborts_the_command_task() {
        let (started_tx, started_rx) = oneshot::channel();
        let (held_tx, held_rx) = oneshot::channel::<()>();
        let hanging: Arc<dyn Command> = Arc::new(Hanging {
            triggers: vec!["癒やし".into()],
            started: Mutex::new(Some(started_tx)),
            held: Mutex::new(Some(held_tx)),
        });
        let (executor, messenger) = executor(vec![hanging]);
        let words = tokens(&["癒やし"]);

        tokio::select! {
            _ = executor.execute("C1", "U1", &words) => panic!("hanging command completed"),
            started = started_rx => started.unwrap(),
        }

        // The select dropped the execute future; the task must go with it.
        let released = tokio::time::timeout(Duration::from_secs(1), held_rx).await;
        assert!(
            matches!(released, Ok(Err(_))),
            "command task kept running after its caller was dropped"
        );
        assert!(messenger.sent().is_empty());
    }

    #[tokio::test]
    async fn failed_dm_becomes_error_reply() {
        let messenger = Arc::new(NoDirectMessages(CliMessenger::quiet()));
        let executor = CommandExecutor::new(
            Arc::new(CommandRegistry::new(vec![scripted(
                "萌え",
                Behaviour::Reply(vec![
                    ReplyAction::direct("U1", "https://img/b.jpg"),
                    ReplyAction::reply("C1", "U1", DM_SENT_TEXT),
                ]),
            )])),
            messenger.clone(),
        );

        let outcome = executor.execute("C1", "U1", &tokens(&["萌え"])).await;

        assert_eq!(outcome, Execution::RepliedError);
        let sent = messenger.0.sent();
        assert_eq!(sent.len(), 1, "acknowledgement must not follow a failed DM");
        assert!(sent[0].text().contains("cannot_dm_bot"));
    }

    #[tokio::test]
    async fn execute_text_strips_mention_and_splits() {
        let (executor, messenger) = executor(vec![scripted(
            "もえ",
            Behaviour::Reply(vec![ReplyAction::reply("C1", "U1", "moe")]),
        )]);

        let outcome = executor.execute_text("C1", "U1", "<@UBOT> もえ").await;
        assert_eq!(outcome, Execution::Completed);

        let outcome = executor.execute_text("C1", "U1", "<@UBOT> \"もえ").await;
        assert_eq!(outcome, Execution::Ignored);
        assert_eq!(messenger.sent().len(), 1);
    }

    #[tokio::test]
    async fn help_lists_registered_commands() {
        let (executor, messenger) = executor(vec![scripted("もえ", Behaviour::NotFound)]);

        let outcome = executor.execute("C1", "U1", &tokens(&["?"])).await;

        assert_eq!(outcome, Execution::Completed);
        assert_eq!(
            messenger.sent(),
            vec![ReplyAction::reply("C1", "U1", "```もえ: scripted```")]
        );
    }
}
