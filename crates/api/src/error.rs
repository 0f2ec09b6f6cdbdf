use serde_json::{Number, Value};
use thiserror::Error;

use crate::transport::{BoxError, TransportError, TransportResponse};

/// A notification could not be delivered to Discord.
#[derive(Error, Debug)]
pub enum NotificationError {
    /// Discord answered, but with a non-2xx status.
    #[error("Discord responded with an HTTP error: {status}")]
    Http {
        response: TransportResponse,
        status: u16,
        #[source]
        source: BoxError,
    },

    /// No usable response was received.
    #[error("Communication with Discord failed: {source}")]
    Communication {
        #[source]
        source: BoxError,
    },

    /// The exchange succeeded but the body carries a positive error `code`.
    #[error("Discord responded with an API error: {code}")]
    Api { body: Value, code: Number },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Http,
    Communication,
    Api,
}

/// A 2xx response whose body could not be used.
#[derive(Error, Debug)]
pub enum MalformedResponse {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("response is missing the `{0}` field")]
    MissingField(&'static str),
}

impl NotificationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NotificationError::Http { .. } => ErrorKind::Http,
            NotificationError::Communication { .. } => ErrorKind::Communication,
            NotificationError::Api { .. } => ErrorKind::Api,
        }
    }

    /// HTTP status of the failed exchange, when Discord answered with one.
    pub fn status(&self) -> Option<u16> {
        match self {
            NotificationError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Discord's JSON error code, for API errors.
    pub fn code(&self) -> Option<&Number> {
        match self {
            NotificationError::Api { code, .. } => Some(code),
            _ => None,
        }
    }

    pub fn suggestion(&self) -> Option<&str> {
        match self {
            NotificationError::Http { status: 401, .. } => {
                Some("Verify the bot token using: discord-notify auth login")
            }
            NotificationError::Http { status: 403, .. } => {
                Some("Check that the bot has permission to use this channel")
            }
            NotificationError::Http { status: 404, .. } => {
                Some("Check if the channel, message, guild or user id is correct")
            }
            NotificationError::Http { status: 429, .. } => {
                Some("Discord is rate limiting this bot, try again later")
            }
            NotificationError::Communication { .. } => {
                Some("Check your network connection or try again later")
            }
            NotificationError::Api { code, .. } => match code.as_u64() {
                Some(10003) => Some("Unknown channel, check the channel id"),
                Some(50001) => Some("The bot is missing access to this channel or guild"),
                Some(50007) => Some("The user does not accept direct messages from this bot"),
                Some(50013) => Some("The bot is missing permissions for this action"),
                _ => None,
            },
            _ => None,
        }
    }
}

impl From<TransportError> for NotificationError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { response, source } => NotificationError::Http {
                status: response.status,
                response,
                source,
            },
            TransportError::Connection(source) => NotificationError::Communication { source },
        }
    }
}

impl From<MalformedResponse> for NotificationError {
    fn from(err: MalformedResponse) -> Self {
        NotificationError::Communication {
            source: Box::new(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotificationError>;
