//! An async wrapper around the [OpenAI API](https://platform.openai.com/docs/api-reference)
//! with first-class support for streamed completions.
//!
//! Requests are plain builder-constructed values sent through an [`OpenAI`] handle,
//! either with [`OpenAI::req`] for a single response or [`OpenAI::stream`] for a
//! [`FrameStream`] of incremental chunks.

#![allow(async_fn_in_trait)]

mod auth;
pub mod endpoints;
pub mod error;
pub mod streaming;
mod util;

pub use auth::{
    AuthTokenProvider, Credentials, EnvironmentAuthTokenProvider, RotatingAuthTokenProvider,
    StaticAuthTokenProvider,
};
use endpoints::{OpenAIRequestProvider, OpenAIStreamingRequestProvider};
pub use error::{OpenAIError, OpenAIResult};
use serde::Deserialize;
pub use streaming::{FrameStream, StreamChunk};
pub use tokio_util::sync::CancellationToken;
pub use util::UnknownWireValue;

/// A handle to OpenAI.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Clone)]
pub struct OpenAI<Auth> {
    client: reqwest::Client,
    auth: Auth,
    base_url: String,
}

impl<Auth> OpenAI<Auth>
where
    Auth: AuthTokenProvider,
{
    /// Creates a new instance of OpenAI with the provided auth.
    pub fn new(auth: Auth) -> Self {
        Self {
            client: reqwest::Client::new(),
            auth,
            base_url: endpoints::API_BASE_URL.to_owned(),
        }
    }

    /// Points the client at a different deployment of the API, e.g. a proxy.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    /// Uses a preconfigured HTTP client (timeouts, proxies, ...).
    pub fn with_http_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a request to the OpenAI API.
    ///
    /// Dropping the returned future aborts the request.
    pub async fn req<R: OpenAIRequestProvider>(&self, r: &R) -> OpenAIResult<R::Response> {
        endpoints::send_request(self, r).await
    }

    /// Sends a streaming request, returning once the response headers arrive.
    pub async fn stream<R: OpenAIStreamingRequestProvider>(
        &self,
        r: &R,
    ) -> OpenAIResult<FrameStream<R::Chunk>> {
        self.stream_with_cancellation(r, CancellationToken::new()).await
    }

    /// Like [`OpenAI::stream`], but stops sending and reading as soon as `cancel` fires.
    /// Cancellation ends the stream early; it is not reported as an error.
    pub async fn stream_with_cancellation<R: OpenAIStreamingRequestProvider>(
        &self,
        r: &R,
        cancel: CancellationToken,
    ) -> OpenAIResult<FrameStream<R::Chunk>> {
        endpoints::send_streaming_request(self, r, cancel).await
    }
}

/// The token usage of a request.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}
