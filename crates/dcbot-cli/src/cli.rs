//! CLI argument definitions for dcbot.
//!
//! All `clap` structures live here so that `main.rs` stays focused on
//! dispatching subcommands.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// dcbot -- a command bot for comment feeds.
#[derive(Parser)]
#[command(
    name = "dcbot",
    version,
    about = "dcbot -- a command bot for comment feeds",
    long_about = "Polls a comment feed, runs prefixed commands with typed arguments, \
                  and replies publicly or by direct message."
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, short, global = true, default_value = dcbot_runtime::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every registered command key with its usage.
    Commands,

    /// Dispatch a single line as if it had been posted to the feed.
    Try {
        /// The message text, e.g. "/add x 1 y 2".
        line: String,

        /// Display name of the simulated sender.
        #[arg(long, default_value = "author")]
        sender: String,

        /// Treat the simulated sender as a moderator.
        #[arg(long)]
        moderator: bool,
    },

    /// Run the polling loop over a recorded feed.
    Replay {
        /// JSON file holding an array of pages, each an array of messages.
        feed: PathBuf,

        /// Fail every public reply with a comment ban, forcing the
        /// direct-message route.
        #[arg(long)]
        comment_banned: bool,
    },
}
