use std::path::Path;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Subcommand};
use discord_notify_auth::{token_key, CredentialStore};
use discord_notify_config::Config;
use discord_notify_output::OutputRenderer;
use serde::Serialize;
use url::Url;

#[derive(Subcommand, Debug, Clone)]
pub enum AuthCommand {
    /// Add or update a profile and store its bot token
    Login(LoginArgs),
    /// Remove the stored bot token (and optionally the profile)
    Logout(LogoutArgs),
    /// List configured profiles
    List,
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    /// Profile name to create or update.
    #[arg(long)]
    pub profile: String,
    /// Bot token (falls back to DISCORD_BOT_TOKEN or an interactive prompt).
    #[arg(long, env = "DISCORD_BOT_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
    /// Override the Discord API base URL (e.g. a local proxy).
    #[arg(long)]
    pub base_url: Option<String>,
    /// Channel used by `send` when no channel is given.
    #[arg(long)]
    pub default_channel: Option<String>,
    /// Mark this profile as the default one.
    #[arg(long)]
    pub default: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LogoutArgs {
    /// Profile to remove the token for.
    #[arg(long)]
    pub profile: String,
    /// Remove the profile from config entirely (not just the stored token).
    #[arg(long)]
    pub remove_profile: bool,
}

pub fn handle(
    command: AuthCommand,
    config: &mut Config,
    config_path: Option<&Path>,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    match command {
        AuthCommand::Login(args) => login(args, config, config_path, store),
        AuthCommand::Logout(args) => logout(args, config, config_path, store),
        AuthCommand::List => list_profiles(config, store, renderer),
    }
}

fn login(
    args: LoginArgs,
    config: &mut Config,
    config_path: Option<&Path>,
    store: &CredentialStore,
) -> Result<()> {
    if args.profile.trim().is_empty() {
        return Err(anyhow!("Profile name cannot be empty"));
    }

    let base_url = args
        .base_url
        .as_deref()
        .map(|raw| {
            Url::parse(raw)
                .map(|url| url.to_string())
                .with_context(|| format!("Invalid Discord API base URL: {raw}"))
        })
        .transpose()?;

    let token = match args.token {
        Some(token) if !token.trim().is_empty() => token.trim().to_owned(),
        _ => rpassword::prompt_password("Enter bot token: ")
            .context("Failed to read token from prompt")?
            .trim()
            .to_owned(),
    };
    if token.is_empty() {
        return Err(anyhow!("Bot token cannot be empty"));
    }

    let profile = config.profiles.entry(args.profile.clone()).or_default();
    if base_url.is_some() {
        profile.base_url = base_url;
    }
    if args.default_channel.is_some() {
        profile.default_channel = args.default_channel;
    }
    profile.token = None;

    if args.default || config.default_profile.is_none() {
        config.default_profile = Some(args.profile.clone());
    }

    store
        .set_secret(&token_key(&args.profile), &token)
        .context("Failed to store bot token")?;

    config
        .save(config_path)
        .context("Unable to persist configuration file")?;

    tracing::info!(profile = %args.profile, "Profile saved and bot token stored");
    Ok(())
}

fn logout(
    args: LogoutArgs,
    config: &mut Config,
    config_path: Option<&Path>,
    store: &CredentialStore,
) -> Result<()> {
    if !config.profiles.contains_key(&args.profile) {
        return Err(anyhow!("Profile '{}' does not exist", args.profile));
    }

    store
        .delete_secret(&token_key(&args.profile))
        .context("Failed to delete bot token")?;

    if args.remove_profile {
        config.profiles.remove(&args.profile);
        if config.default_profile.as_deref() == Some(args.profile.as_str()) {
            config.default_profile = config.profiles.keys().next().cloned();
        }
    }

    config
        .save(config_path)
        .context("Unable to persist configuration file")?;
    tracing::info!(profile = %args.profile, "Bot token removed");
    Ok(())
}

fn list_profiles(
    config: &Config,
    store: &CredentialStore,
    renderer: &OutputRenderer,
) -> Result<()> {
    #[derive(Serialize)]
    struct Row<'a> {
        name: &'a str,
        base_url: &'a str,
        default_channel: &'a str,
        has_token: bool,
        is_default: bool,
    }

    let mut rows = Vec::new();
    for (name, profile) in &config.profiles {
        let has_token =
            profile.token.is_some() || store.get_secret(&token_key(name))?.is_some();
        rows.push(Row {
            name,
            base_url: profile.base_url.as_deref().unwrap_or(""),
            default_channel: profile.default_channel.as_deref().unwrap_or(""),
            has_token,
            is_default: config.default_profile.as_deref() == Some(name.as_str()),
        });
    }

    if rows.is_empty() {
        tracing::info!("No profiles configured yet. Use `discord-notify auth login` to add one.");
    }

    renderer.render(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use discord_notify_output::OutputFormat;
    use tempfile::TempDir;

    fn login_args(profile: &str) -> LoginArgs {
        LoginArgs {
            profile: profile.to_string(),
            token: Some("  bot-token  ".to_string()),
            base_url: None,
            default_channel: Some("123".to_string()),
            default: false,
        }
    }

    #[test]
    fn test_login_stores_token_and_profile() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        let store = CredentialStore::new(dir.path());
        let mut config = Config::default();

        login(login_args("ops"), &mut config, Some(config_path.as_path()), &store).unwrap();

        assert_eq!(config.default_profile.as_deref(), Some("ops"));
        assert_eq!(
            store.get_secret(&token_key("ops")).unwrap().as_deref(),
            Some("bot-token")
        );

        let saved = Config::load(Some(config_path.as_path())).unwrap();
        let profile = saved.profile("ops").unwrap();
        assert_eq!(profile.default_channel.as_deref(), Some("123"));
        assert!(profile.token.is_none());
    }

    #[test]
    fn test_login_rejects_invalid_base_url() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        let mut config = Config::default();
        let args = LoginArgs {
            base_url: Some("not a url".to_string()),
            ..login_args("ops")
        };

        let err = login(args, &mut config, Some(dir.path().join("c.yaml").as_path()), &store).unwrap_err();
        assert!(err.to_string().contains("Invalid Discord API base URL"));
    }

    #[test]
    fn test_logout_removes_profile_and_moves_default() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("config.yaml");
        let store = CredentialStore::new(dir.path());
        let mut config = Config::default();

        login(login_args("alerts"), &mut config, Some(config_path.as_path()), &store).unwrap();
        login(login_args("ops"), &mut config, Some(config_path.as_path()), &store).unwrap();
        assert_eq!(config.default_profile.as_deref(), Some("alerts"));

        let args = LogoutArgs {
            profile: "alerts".to_string(),
            remove_profile: true,
        };
        logout(args, &mut config, Some(config_path.as_path()), &store).unwrap();

        assert_eq!(config.default_profile.as_deref(), Some("ops"));
        assert!(store.get_secret(&token_key("alerts")).unwrap().is_none());
        assert!(store.get_secret(&token_key("ops")).unwrap().is_some());
    }

    #[test]
    fn test_logout_unknown_profile() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        let mut config = Config::default();
        let args = LogoutArgs {
            profile: "ghost".to_string(),
            remove_profile: false,
        };

        assert!(logout(args, &mut config, None, &store).is_err());
    }

    #[test]
    fn test_list_profiles_renders() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::new(dir.path());
        let mut config = Config::default();
        login(
            login_args("ops"),
            &mut config,
            Some(dir.path().join("config.yaml").as_path()),
            &store,
        )
        .unwrap();

        let renderer = OutputRenderer::new(OutputFormat::Quiet);
        assert!(list_profiles(&config, &store, &renderer).is_ok());
    }
}
