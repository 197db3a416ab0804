// alertmail: email/SMS notification engine for fleet alerts

use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use alertmail::cli::{Cli, Commands, ConfigAction};
use alertmail::config::Config;
use alertmail::dispatch::{MailDispatch, SmtpMailer};
use alertmail::engine::Engine;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref().map(Path::new);
    let config = Config::load(config_path).context("failed to load configuration")?;

    init_tracing(cli.verbose || config.server.verbose);

    match cli.command {
        Some(Commands::Send { to, subject, body }) => {
            let mailer = SmtpMailer::new(&config.smtp)?;
            mailer.send(&to, &subject, &body)?;
            Ok(())
        }
        Some(Commands::Config { action }) => handle_config_action(action, &config, config_path),
        Some(Commands::Run { events }) => run(&config, events.as_deref().map(Path::new)),
        None => run(&config, None),
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "alertmail=debug" } else { "alertmail=info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Consume NDJSON events from stdin (or a replay file) until EOF or a
/// terminate command, one event at a time, in arrival order.
fn run(config: &Config, events_path: Option<&Path>) -> Result<()> {
    let mailer = SmtpMailer::new(&config.smtp)?;
    let mut engine = Engine::new(
        mailer,
        config.sms_gateway(),
        config.alerts_state_path(),
        config.assets_state_path(),
    );

    let reader: Box<dyn BufRead> = match events_path {
        Some(path) => Box::new(BufReader::new(File::open(path).with_context(|| {
            format!("failed to open events file {}", path.display())
        })?)),
        None => Box::new(io::stdin().lock()),
    };

    engine.run(reader);
    Ok(())
}

fn handle_config_action(action: ConfigAction, config: &Config, path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show => {
            print!("{}", toml::to_string_pretty(config)?);
            Ok(())
        }
        ConfigAction::Init => {
            let fresh = Config::default();
            fresh.save(path)?;
            println!("wrote default configuration");
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut updated = config.clone();
            updated.set_value(&key, &value)?;
            updated.save(path)?;
            println!("{key} = {value}");
            Ok(())
        }
    }
}
