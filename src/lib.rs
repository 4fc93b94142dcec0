#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::new_without_default,
    clippy::return_self_not_must_use,
    clippy::uninlined_format_args
)]

use clap::Subcommand;
use serde::{Deserialize, Serialize};

pub mod channels;
pub mod commands;
pub mod config;
pub mod gateway;
pub mod images;

pub(crate) mod util;

pub use config::Config;

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigCommands {
    /// Dump the full configuration JSON Schema to stdout
    Schema,
    /// Print the effective configuration with secrets masked
    Show,
}
