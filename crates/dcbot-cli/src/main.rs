//! CLI entry point for dcbot.
//!
//! This binary provides the `dcbot` command with subcommands for listing
//! the built-in commands, trying a single line, and replaying a recorded
//! feed through the polling loop.

mod cli;
mod demo;
mod helpers;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dcbot_kernel::DispatchOutcome;
use dcbot_runtime::{BotConfig, ChannelError, Message, Role, ScriptedChannel, Sender};
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::helpers::{credentials_from_env, init_tracing};

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = BotConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    init_tracing(&config.log_level);

    match cli.command {
        Commands::Commands => cmd_commands(config),
        Commands::Try {
            line,
            sender,
            moderator,
        } => cmd_try(config, &line, sender, moderator).await,
        Commands::Replay {
            feed,
            comment_banned,
        } => cmd_replay(config, &feed, comment_banned).await,
    }
}

// ---------------------------------------------------------------------------
// Subcommand: commands
// ---------------------------------------------------------------------------

fn cmd_commands(config: BotConfig) -> Result<()> {
    let bot = demo::build_bot(Arc::new(ScriptedChannel::new()), config)?;
    let registry = bot.dispatcher().registry();

    println!("{} keys:", registry.len());
    for key in registry.keys() {
        println!("  {key}");
    }
    println!();
    let prefix = bot.config().prefixes.first().cloned().unwrap_or_default();
    println!("{}", demo::usage_listing(bot.dispatcher(), &prefix));
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: try
// ---------------------------------------------------------------------------

async fn cmd_try(config: BotConfig, line: &str, sender: String, moderator: bool) -> Result<()> {
    let bot = demo::build_bot(Arc::new(ScriptedChannel::new()), config)?;
    let sender = Sender {
        id: 0,
        display_name: sender,
        role: if moderator {
            Role::Moderator
        } else {
            Role::Member
        },
    };
    let message = Message::new(0, sender, line);

    match bot
        .dispatcher()
        .dispatch(bot.handle(), &message, &message.text)
        .await
    {
        DispatchOutcome::NoMatch => println!("(no command matched)"),
        DispatchOutcome::Completed { reply: None, .. } => println!("(no reply)"),
        DispatchOutcome::Completed {
            reply: Some(text), ..
        } => println!("@{} {text}", message.sender.display_name),
        DispatchOutcome::Failed { error, .. } => {
            return Err(error).context("command failed");
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcommand: replay
// ---------------------------------------------------------------------------

async fn cmd_replay(config: BotConfig, feed: &Path, comment_banned: bool) -> Result<()> {
    let content = std::fs::read_to_string(feed)
        .with_context(|| format!("failed to read feed {}", feed.display()))?;
    let pages: Vec<Vec<Message>> =
        serde_json::from_str(&content).context("feed must be a JSON array of message pages")?;
    info!(pages = pages.len(), feed = %feed.display(), "replaying feed");

    let channel = Arc::new(ScriptedChannel::from_pages(pages));
    if comment_banned {
        channel.set_reply_default(Err(ChannelError::Banned("replay".into())));
    }

    let mut bot = demo::build_bot(Arc::clone(&channel), config)?;
    let credentials = credentials_from_env("replay");

    let interrupt = {
        let channel = Arc::clone(&channel);
        async move {
            let ctrl_c = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "cannot listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };
            tokio::select! {
                () = channel.wait_exhausted() => info!("feed exhausted"),
                () = ctrl_c => info!("interrupted by user"),
            }
        }
    };
    let exit = bot.run_until(&credentials, interrupt).await?;

    for reply in channel.replies() {
        println!("reply to #{}: {}", reply.target, reply.text);
    }
    for dm in channel.direct_messages() {
        println!(
            "dm to {} [{}]: {}",
            dm.recipient.display_name, dm.subject, dm.text
        );
    }
    println!("stopped: {exit:?}");
    Ok(())
}
