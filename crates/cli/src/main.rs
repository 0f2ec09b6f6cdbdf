mod commands;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::auth::{self, AuthCommand};
use commands::messages::{self, MessageContext};
use discord_notify_api::{DiscordClient, NotificationError, ReqwestTransport, DEFAULT_BASE_URL};
use discord_notify_auth::{token_key, CredentialStore};
use discord_notify_config::{app_dir, Config, Profile};
use discord_notify_output::{OutputFormat, OutputRenderer};
use tracing_subscriber::{fmt, EnvFilter};

const TOKEN_ENV: &str = "DISCORD_BOT_TOKEN";

#[derive(Parser, Debug)]
#[command(name = "discord-notify", version, about = "Send notifications through a Discord bot", long_about = None)]
struct Cli {
    /// Profile to use from config file
    #[arg(short, long, global = true)]
    profile: Option<String>,

    /// Path to config file (defaults to ~/.discord-notify/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    output: OutputFormat,

    /// Enable verbose logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: NotifyCommand,
}

#[derive(Subcommand, Debug, Clone)]
enum NotifyCommand {
    /// Post a message to a channel
    Send(messages::SendArgs),
    /// Delete a message from a channel
    Delete(messages::DeleteArgs),
    /// List recent messages in a channel
    Messages(messages::MessagesArgs),
    /// Check whether a user is a member of a guild
    Joined(messages::JoinedArgs),
    /// Send a direct message to a user
    Dm(messages::DmArgs),
    /// Profile and bot token management
    #[command(subcommand)]
    Auth(AuthCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_tracing(cli.debug) {
        eprintln!("{err}");
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.clone();
    let mut config = Config::load(config_path.as_ref())?;
    let renderer = OutputRenderer::new(cli.output);
    let store = CredentialStore::new(app_dir());

    let command = match cli.command {
        NotifyCommand::Auth(command) => {
            return auth::handle(
                command,
                &mut config,
                config_path.as_deref(),
                &store,
                &renderer,
            );
        }
        command => command,
    };

    let profile = resolve_active_profile(&config, cli.profile.as_deref(), &store, |key| {
        std::env::var(key).ok()
    })?;
    let ctx = MessageContext {
        client: build_client(&profile)?,
        renderer: &renderer,
        default_channel: profile.default_channel,
    };

    match command {
        NotifyCommand::Send(args) => messages::send(args, &ctx).await,
        NotifyCommand::Delete(args) => messages::delete(args, &ctx).await,
        NotifyCommand::Messages(args) => messages::list(args, &ctx).await,
        NotifyCommand::Joined(args) => messages::joined(args, &ctx).await,
        NotifyCommand::Dm(args) => messages::direct_message(args, &ctx).await,
        NotifyCommand::Auth(_) => unreachable!("auth commands are handled above"),
    }
}

fn init_tracing(debug: bool) -> Result<()> {
    let default = if debug {
        "info,discord_notify=debug,discord_notify_api=debug"
    } else {
        "warn,discord_notify=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow!("failed to initialize logger: {err}"))
}

fn report(err: &anyhow::Error) {
    eprintln!("{} {err:#}", "Error:".red().bold());
    if let Some(hint) = err
        .downcast_ref::<NotificationError>()
        .and_then(NotificationError::suggestion)
    {
        eprintln!("{} {hint}", "Hint:".yellow().bold());
    }
}

#[derive(Debug)]
struct ActiveProfile {
    base_url: String,
    token: String,
    default_channel: Option<String>,
}

/// Token lookup order: `DISCORD_NOTIFY_TOKEN_<PROFILE>` env var, then
/// `DISCORD_BOT_TOKEN`, then the profile's `token`, then the credential store.
/// Without any profile a token from the environment is enough.
fn resolve_active_profile(
    config: &Config,
    requested: Option<&str>,
    store: &CredentialStore,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ActiveProfile> {
    let fallback = Profile::default();
    let (name, profile) = match config.resolve_profile(requested) {
        Some(found) => found,
        None => match requested {
            Some(name) => {
                return Err(anyhow!(
                    "Profile '{name}' does not exist. Run `discord-notify auth login --profile {name}` first."
                ));
            }
            None => ("default", &fallback),
        },
    };

    let non_empty = |value: Option<String>| value.filter(|t| !t.trim().is_empty());
    let token = non_empty(env(&profile_token_env(name)))
        .or_else(|| non_empty(env(TOKEN_ENV)))
        .or_else(|| non_empty(profile.token.clone()));

    let token = match token {
        Some(token) => token,
        None => store
            .get_secret(&token_key(name))
            .context("Unable to read stored bot token")?
            .ok_or_else(|| {
                anyhow!(
                    "No bot token found for profile '{name}'. Set {TOKEN_ENV} or run `discord-notify auth login --profile {name}`"
                )
            })?,
    };

    Ok(ActiveProfile {
        base_url: profile
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        token: token.trim().to_string(),
        default_channel: profile.default_channel.clone(),
    })
}

fn profile_token_env(profile: &str) -> String {
    let suffix: String = profile
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("DISCORD_NOTIFY_TOKEN_{suffix}")
}

fn build_client(profile: &ActiveProfile) -> Result<DiscordClient> {
    let transport = ReqwestTransport::new().context("Unable to build HTTP client")?;
    Ok(DiscordClient::new(Arc::new(transport), profile.token.clone())
        .with_base_url(profile.base_url.clone()))
}
