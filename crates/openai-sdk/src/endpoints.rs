use reqwest::{multipart::Form, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use crate::{
    auth,
    error::{classify_error, parse_response, ConfigError, ValidationError},
    streaming::{FrameStream, StreamChunk},
    OpenAI, OpenAIError, OpenAIResult,
};

pub mod audio;
pub mod chat;
pub mod completions;
pub mod embeddings;
pub mod files;
pub mod fine_tuning;
pub mod images;
pub mod models;
pub mod moderations;

pub(crate) const API_BASE_URL: &str = "https://api.openai.com/v1";

/// The body of an outgoing request.
pub enum RequestBody {
    Empty,
    Json(Map<String, Value>),
    Multipart(Form),
}

impl RequestBody {
    pub(crate) fn json<T: Serialize>(value: &T) -> OpenAIResult<Self> {
        match serde_json::to_value(value).map_err(OpenAIError::Serialize)? {
            Value::Object(map) => Ok(Self::Json(map)),
            _ => Err(OpenAIError::Serialize(serde::ser::Error::custom(
                "request body must serialize to a JSON object",
            ))),
        }
    }
}

pub(super) async fn send_request<Auth, R>(
    openai: &OpenAI<Auth>,
    request: &R,
) -> OpenAIResult<R::Response>
where
    Auth: auth::AuthTokenProvider,
    R: OpenAIRequestProvider,
{
    let response = dispatch(openai, request, false).await?;
    let status = response.status();
    let body = response.text().await?;

    parse_response(status, &body)
}

pub(super) async fn send_streaming_request<Auth, R>(
    openai: &OpenAI<Auth>,
    request: &R,
    cancel: CancellationToken,
) -> OpenAIResult<FrameStream<R::Chunk>>
where
    Auth: auth::AuthTokenProvider,
    R: OpenAIStreamingRequestProvider,
{
    let response = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            tracing::debug!("streaming request cancelled before a response arrived");
            return Ok(FrameStream::empty());
        }
        response = dispatch(openai, request, true) => response?,
    };

    let status = response.status();
    if !status.is_success() {
        // a failed streaming call is never decoded as frames
        let body = response.text().await?;
        let err = classify_error(status, &body);
        tracing::warn!(status = status.as_u16(), error = %err, "OpenAI streaming request failed");
        return Err(err.into());
    }

    Ok(FrameStream::new(response.bytes_stream(), status, cancel))
}

/// Validates, authenticates and sends `request`, returning as soon as the response
/// headers are in.
async fn dispatch<Auth, R>(
    openai: &OpenAI<Auth>,
    request: &R,
    stream: bool,
) -> OpenAIResult<reqwest::Response>
where
    Auth: auth::AuthTokenProvider,
    R: OpenAIRequestProvider,
{
    request.validate()?;

    let credentials = openai
        .auth
        .resolve()
        .await
        .ok_or(ConfigError::MissingApiKey)?;
    let headers = credentials.headers()?;

    let path = request.path_with_leading_slash();
    let mut builder = openai
        .client
        .request(R::METHOD, format!("{}{path}", openai.base_url))
        .headers(headers);

    let query = request.query();
    if !query.is_empty() {
        builder = builder.query(&query);
    }

    builder = match request.body()? {
        RequestBody::Empty => builder,
        RequestBody::Json(mut body) => {
            if R::STREAMABLE {
                body.insert("stream".to_owned(), Value::Bool(stream));
            }
            builder.json(&body)
        }
        RequestBody::Multipart(form) => builder.multipart(form),
    };

    tracing::debug!(method = %R::METHOD, path = %path, stream, "sending OpenAI request");

    Ok(builder.send().await?)
}

mod private {
    pub trait Sealed {}
}

/// Any type that can be sent to the client's `req` method.
pub trait OpenAIRequestProvider: private::Sealed {
    type Response: DeserializeOwned;
    const METHOD: Method;
    /// Whether the endpoint takes a `stream` flag. The client always sets it, so the
    /// flag matches the way the request is sent.
    const STREAMABLE: bool = false;

    fn path_with_leading_slash(&self) -> String;

    fn query(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }

    /// Checks local preconditions. Runs before anything is sent.
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn body(&self) -> OpenAIResult<RequestBody>;
}

/// Any request that can also be sent to the client's `stream` method.
pub trait OpenAIStreamingRequestProvider: OpenAIRequestProvider {
    type Chunk: StreamChunk;
}

/// A page of results from a list endpoint.
#[derive(Deserialize, Debug)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub object: String,
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

impl<T> IntoIterator for ListResponse<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

pub(crate) trait FormExt {
    /// Adds a text field only when there is a value for it.
    fn optional_text(self, name: &'static str, value: Option<impl ToString>) -> Self;
}

impl FormExt for Form {
    fn optional_text(self, name: &'static str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.text(name, value.to_string()),
            None => self,
        }
    }
}

/// The pagination parameters shared by list endpoints.
pub(crate) fn pagination_query(
    after: Option<&str>,
    limit: Option<u32>,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(after) = after {
        query.push(("after", after.to_owned()));
    }
    if let Some(limit) = limit {
        query.push(("limit", limit.to_string()));
    }
    query
}
