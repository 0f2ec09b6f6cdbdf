//! The HTTP capability the Discord client is built on.
//!
//! `DiscordClient` never talks to the network itself. It hands a method, a
//! URL and a set of [`RequestOptions`] to a [`Transport`] and interprets what
//! comes back. [`ReqwestTransport`] is the production implementation; tests
//! substitute their own.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde_json::Value;
use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Per-request options passed to the transport.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub headers: HeaderMap,
    /// JSON body. `None` means the request is sent without a body.
    pub json: Option<Value>,
}

/// A response received from the remote server.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

#[derive(Error, Debug)]
pub enum TransportError {
    /// The server answered with a non-2xx status.
    #[error("server responded with status {}", .response.status)]
    Status {
        response: TransportResponse,
        #[source]
        source: BoxError,
    },

    /// No response is available (connect, DNS, TLS, timeout, body read).
    #[error("request could not be completed: {0}")]
    Connection(#[source] BoxError),
}

#[derive(Error, Debug)]
#[error("unexpected HTTP status {0}")]
pub struct UnexpectedStatus(pub u16);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .user_agent(format!(
                "DiscordBot ({}, {})",
                env!("CARGO_PKG_REPOSITORY"),
                env!("CARGO_PKG_VERSION")
            ))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn request(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions,
    ) -> Result<TransportResponse, TransportError> {
        let mut req = self.client.request(method, url).headers(options.headers);
        if let Some(json) = &options.json {
            req = req.json(json);
        }

        let response = req
            .send()
            .await
            .map_err(|err| TransportError::Connection(Box::new(err)))?;

        let status = response.status();
        let status_error: Option<BoxError> = if status.is_success() {
            None
        } else {
            match response.error_for_status_ref() {
                Err(err) => Some(Box::new(err) as BoxError),
                Ok(_) => Some(Box::new(UnexpectedStatus(status.as_u16())) as BoxError),
            }
        };

        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| TransportError::Connection(Box::new(err)))?
            .to_vec();

        let response = TransportResponse {
            status: status.as_u16(),
            headers,
            body,
        };

        match status_error {
            Some(source) => Err(TransportError::Status { response, source }),
            None => Ok(response),
        }
    }
}
