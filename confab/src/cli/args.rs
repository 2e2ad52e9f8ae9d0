//! CLI argument definitions.

use clap::{Parser, Subcommand};

/// Confab - hold multi-turn conversations with a completion service
#[derive(Parser, Debug)]
#[command(name = "confab")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Message to send to the current conversation (default behavior)
    #[arg(trailing_var_arg = true)]
    pub message: Vec<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a message to the current conversation (explicit command)
    Send {
        /// Message text
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Start a new conversation, optionally seeded with a first message
    New {
        /// Seed message for the title
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// List conversations
    List,

    /// Show messages of a conversation (current one if no id given)
    Show {
        /// Conversation ID to show
        id: Option<String>,
    },

    /// Make a conversation current
    Select {
        /// Conversation ID to select
        id: String,
    },

    /// Delete a conversation
    Delete {
        /// Conversation ID to delete
        id: String,
    },

    /// Run the session server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "58464")]
        port: u16,

        /// Completion service endpoint URL
        #[arg(long, env = "CONFAB_ENDPOINT")]
        endpoint: String,
    },
}
