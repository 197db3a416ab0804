use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "alertmail")]
#[command(about = "Email/SMS notification engine for fleet alerts")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the engine, reading NDJSON events from stdin
    Run {
        /// Replay events from a file instead of stdin
        #[arg(long)]
        events: Option<String>,
    },

    /// Send one message through the configured SMTP relay and exit
    Send {
        /// Destination address
        #[arg(long)]
        to: String,
        /// Subject line
        #[arg(long)]
        subject: String,
        /// Message body
        #[arg(long)]
        body: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,
    /// Initialize fresh configuration
    Init,
    /// Set configuration value
    Set {
        /// Configuration key (e.g. smtp.sms_gateway)
        key: String,
        /// Configuration value
        value: String,
    },
}
