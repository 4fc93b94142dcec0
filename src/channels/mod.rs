//! Chat platform plumbing: inbound Slack event decoding and outbound
//! [`Messenger`] implementations.

pub mod cli;
pub mod events;
pub mod slack;
pub mod traits;

pub use cli::CliMessenger;
pub use events::{mention_tokens, AppMention, SlackEnvelope, SlackEvent};
pub use slack::{SlackIdentity, SlackMessenger};
pub use traits::{Messenger, ReplyAction};
