#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::uninlined_format_args
)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iyashi_bot::channels::CliMessenger;
use iyashi_bot::commands::{all_commands, CommandExecutor, CommandRegistry, Execution};
use iyashi_bot::config::build_http_client;
use iyashi_bot::images::ThreadRandom;
use iyashi_bot::{gateway, Config, ConfigCommands};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// `iyashi-bot` - picture fetching Slack bot.
#[derive(Parser, Debug)]
#[command(name = "iyashi-bot")]
#[command(version)]
#[command(about = "Answers Slack mentions with pictures from Flickr, Tumblr and a fixed stash.", long_about = None)]
struct Cli {
    /// Config file (default: $IYASHI_BOT_CONFIG, then ~/.iyashi-bot/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Slack Events API gateway
    #[command(long_about = "\
Start the Slack Events API gateway.

Verifies the bot token with auth.test, then serves POST /slack/events \
(and POST /) for signed Slack callbacks. Bind address defaults to the \
values in your config file (gateway.host / gateway.port).

Examples:
  iyashi-bot gateway                  # use config defaults
  iyashi-bot gateway -p 3000          # listen on port 3000
  iyashi-bot gateway --host 0.0.0.0   # bind to all interfaces")]
    Gateway {
        /// Port to listen on; defaults to config gateway.port
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to; defaults to config gateway.host
        #[arg(long)]
        host: Option<String>,
    },

    /// Run one command locally and print the replies
    #[command(long_about = "\
Run one command locally and print the replies.

The words are dispatched exactly as a Slack mention would be, but \
replies are printed instead of posted. Provider credentials are \
still required.

Examples:
  iyashi-bot ask 癒やし 猫
  iyashi-bot ask たわわ
  iyashi-bot ask help")]
    Ask {
        /// Channel id to attribute the request to
        #[arg(long, default_value = "cli")]
        channel: String,

        /// User id to attribute the request to
        #[arg(long, default_value = "you")]
        user: String,

        /// Command word followed by its arguments
        #[arg(required = true, trailing_var_arg = true)]
        words: Vec<String>,
    },

    /// List the registered commands
    #[command(name = "commands")]
    ListCommands,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        config_command: ConfigCommands,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Schema output must stay clean JSON on stdout.
    if let Commands::Config {
        config_command: ConfigCommands::Schema,
    } = &cli.command
    {
        return print_schema();
    }

    // Initialize logging - respects RUST_LOG env var, defaults to INFO
    let subscriber = fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = Config::load(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Gateway { port, host } => {
            let port = port.unwrap_or(config.gateway.port);
            let host = host.unwrap_or_else(|| config.gateway.host.clone());
            info!("Starting iyashi-bot gateway on {host}:{port}");
            gateway::run_gateway(&host, port, config).await
        }

        Commands::Ask {
            channel,
            user,
            words,
        } => {
            config.validate()?;
            let registry = Arc::new(CommandRegistry::new(all_commands(
                &config,
                build_http_client(&config.http),
                Arc::new(ThreadRandom),
            )));
            let executor = CommandExecutor::new(registry, Arc::new(CliMessenger::new()));
            match executor.execute(&channel, &user, &words).await {
                Execution::Unmatched => {
                    anyhow::bail!(
                        "No command matches '{}'. Try: iyashi-bot commands",
                        words.first().map_or("", String::as_str)
                    )
                }
                Execution::RepliedError => anyhow::bail!("Command failed (see reply above)"),
                _ => Ok(()),
            }
        }

        Commands::ListCommands => {
            let registry = CommandRegistry::new(all_commands(
                &config,
                build_http_client(&config.http),
                Arc::new(ThreadRandom),
            ));
            for command in registry.commands() {
                println!("{:<16} {}", command.triggers().join("|"), first_line(&command.help()));
            }
            Ok(())
        }

        Commands::Config { config_command } => match config_command {
            ConfigCommands::Schema => print_schema(),
            ConfigCommands::Show => {
                let mut shown = config.clone();
                for secret in [
                    &mut shown.slack.bot_token,
                    &mut shown.slack.signing_secret,
                    &mut shown.flickr.api_key,
                    &mut shown.tumblr.api_key,
                ] {
                    if !secret.is_empty() {
                        *secret = "***".into();
                    }
                }
                println!(
                    "{}",
                    toml::to_string_pretty(&shown).context("failed to render config")?
                );
                Ok(())
            }
        },
    }
}

fn print_schema() -> Result<()> {
    let schema = schemars::schema_for!(Config);
    println!(
        "{}",
        serde_json::to_string_pretty(&schema).context("failed to serialize JSON Schema")?
    );
    Ok(())
}

fn first_line(text: &str) -> &str {
    text.trim_matches('`').lines().next().unwrap_or_default()
}
