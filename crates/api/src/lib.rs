pub mod error;
pub mod transport;

pub use error::{ErrorKind, MalformedResponse, NotificationError, Result};
pub use reqwest::Method;
pub use transport::{
    BoxError, ReqwestTransport, RequestOptions, Transport, TransportError, TransportResponse,
};

use std::fmt;
use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION};
use serde_json::{Map, Number, Value};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://discord.com/api";

/// Bot-authenticated client for the Discord REST API.
#[derive(Clone)]
pub struct DiscordClient {
    transport: Arc<dyn Transport>,
    base_url: String,
    token: String,
}

impl DiscordClient {
    pub fn new(transport: Arc<dyn Transport>, token: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            token: token.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Post a message to a channel and return the created message.
    pub async fn send(&self, channel_id: &str, data: &Map<String, Value>) -> Result<Value> {
        self.request(
            Method::POST,
            &format!("channels/{channel_id}/messages"),
            Some(data),
        )
        .await
    }

    pub async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<Value> {
        self.request(
            Method::DELETE,
            &format!("channels/{channel_id}/messages/{message_id}"),
            None,
        )
        .await
    }

    pub async fn get_messages(&self, channel_id: &str) -> Result<Value> {
        self.request(
            Method::GET,
            &format!("channels/{channel_id}/messages"),
            None,
        )
        .await
    }

    /// Whether `user_id` is a member of `guild_id`. Any failure reads as "no".
    pub async fn has_joined_guild(&self, guild_id: &str, user_id: &str) -> bool {
        match self
            .request(
                Method::GET,
                &format!("guilds/{guild_id}/members/{user_id}"),
                None,
            )
            .await
        {
            Ok(member) => member.get("user").is_some_and(|user| !user.is_null()),
            Err(err) => {
                debug!(error = %err, guild_id, user_id, "Guild membership lookup failed");
                false
            }
        }
    }

    /// Open (or reuse) the DM channel with a user and return its id.
    pub async fn get_private_channel(&self, user_id: &str) -> Result<String> {
        let mut payload = Map::new();
        payload.insert(
            "recipient_id".to_string(),
            Value::String(user_id.to_string()),
        );

        let channel = self
            .request(Method::POST, "users/@me/channels", Some(&payload))
            .await?;

        match channel.get("id") {
            Some(Value::String(id)) => Ok(id.clone()),
            Some(Value::Number(id)) => Ok(id.to_string()),
            _ => Err(MalformedResponse::MissingField("id").into()),
        }
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        data: Option<&Map<String, Value>>,
    ) -> Result<Value> {
        let url = join_url(&self.base_url, path);
        let options = self.request_options(data)?;

        debug!(method = %method, url = %url, has_body = options.json.is_some(), "Sending request");

        let response = self.transport.request(method, &url, options).await?;

        debug!(status = response.status, "Received response");

        let body = decode_body(&response.body)?;
        if let Some(code) = positive_code(&body) {
            return Err(NotificationError::Api { body, code });
        }

        Ok(body)
    }

    fn request_options(&self, data: Option<&Map<String, Value>>) -> Result<RequestOptions> {
        let mut authorization = HeaderValue::from_str(&format!("Bot {}", self.token))
            .map_err(|err| NotificationError::Communication {
                source: Box::new(err),
            })?;
        authorization.set_sensitive(true);

        let mut options = RequestOptions::default();
        options.headers.insert(AUTHORIZATION, authorization);
        options.json = data
            .filter(|data| !data.is_empty())
            .map(|data| Value::Object(data.clone()));

        Ok(options)
    }
}

impl fmt::Debug for DiscordClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscordClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// An empty body (e.g. `204 No Content`) decodes to `Value::Null`.
fn decode_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }

    serde_json::from_slice(body).map_err(|err| MalformedResponse::InvalidJson(err).into())
}

fn positive_code(body: &Value) -> Option<Number> {
    match body.get("code") {
        Some(Value::Number(code)) if code.as_f64().is_some_and(|c| c > 0.0) => Some(code.clone()),
        _ => None,
    }
}
