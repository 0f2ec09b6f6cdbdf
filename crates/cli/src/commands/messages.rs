use anyhow::{anyhow, bail, Context, Result};
use clap::Args;
use discord_notify_api::DiscordClient;
use discord_notify_output::OutputRenderer;
use serde_json::{Map, Value};

#[derive(Args, Debug, Clone)]
pub struct PayloadArgs {
    /// Plain text message content
    #[arg(long, conflicts_with = "json")]
    pub content: Option<String>,
    /// Full message object as JSON (embeds, components, allowed_mentions, ...)
    #[arg(long)]
    pub json: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SendArgs {
    /// Channel id (defaults to the profile's default_channel)
    pub channel: Option<String>,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    pub channel: String,
    pub message: String,
}

#[derive(Args, Debug, Clone)]
pub struct MessagesArgs {
    /// Channel id (defaults to the profile's default_channel)
    pub channel: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct JoinedArgs {
    pub guild: String,
    pub user: String,
}

#[derive(Args, Debug, Clone)]
pub struct DmArgs {
    /// Recipient user id
    pub user: String,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

pub struct MessageContext<'a> {
    pub client: DiscordClient,
    pub renderer: &'a OutputRenderer,
    pub default_channel: Option<String>,
}

impl MessageContext<'_> {
    fn channel(&self, requested: Option<String>) -> Result<String> {
        requested.or_else(|| self.default_channel.clone()).ok_or_else(|| {
            anyhow!("No channel given and the profile has no default_channel configured")
        })
    }
}

pub async fn send(args: SendArgs, ctx: &MessageContext<'_>) -> Result<()> {
    let channel = ctx.channel(args.channel)?;
    let payload = message_payload(args.payload)?;

    let message = ctx.client.send(&channel, &payload).await?;
    tracing::info!(channel = %channel, "Message sent");
    ctx.renderer.render(&message)
}

pub async fn delete(args: DeleteArgs, ctx: &MessageContext<'_>) -> Result<()> {
    let body = ctx.client.delete_message(&args.channel, &args.message).await?;
    tracing::info!(channel = %args.channel, message = %args.message, "Message deleted");
    if !body.is_null() {
        ctx.renderer.render(&body)?;
    }
    Ok(())
}

pub async fn list(args: MessagesArgs, ctx: &MessageContext<'_>) -> Result<()> {
    let channel = ctx.channel(args.channel)?;
    let messages = ctx.client.get_messages(&channel).await?;
    ctx.renderer.render(&messages)
}

pub async fn joined(args: JoinedArgs, ctx: &MessageContext<'_>) -> Result<()> {
    let joined = ctx.client.has_joined_guild(&args.guild, &args.user).await;
    println!("{joined}");
    Ok(())
}

/// Open the DM channel with a user, then post into it.
pub async fn direct_message(args: DmArgs, ctx: &MessageContext<'_>) -> Result<()> {
    let payload = message_payload(args.payload)?;

    let channel = ctx.client.get_private_channel(&args.user).await?;
    let message = ctx.client.send(&channel, &payload).await?;
    tracing::info!(user = %args.user, channel = %channel, "Direct message sent");
    ctx.renderer.render(&message)
}

fn message_payload(args: PayloadArgs) -> Result<Map<String, Value>> {
    match (args.content, args.json) {
        (Some(content), _) => {
            let mut payload = Map::new();
            payload.insert("content".to_string(), Value::String(content));
            Ok(payload)
        }
        (None, Some(raw)) => {
            let value: Value =
                serde_json::from_str(&raw).context("--json is not valid JSON")?;
            match value {
                Value::Object(payload) if !payload.is_empty() => Ok(payload),
                Value::Object(_) => bail!("--json must not be an empty object"),
                _ => bail!("--json must be a JSON object"),
            }
        }
        (None, None) => bail!("Provide the message with --content or --json"),
    }
}
