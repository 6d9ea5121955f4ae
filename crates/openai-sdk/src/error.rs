use std::fmt;

use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize};

pub type OpenAIResult<T> = std::result::Result<T, OpenAIError>;

#[derive(Debug, thiserror::Error)]
pub enum OpenAIError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("OpenAI API error: {0}")]
    API(#[from] OpenAIAPIError),
    #[error("failed to read response stream: {0}")]
    Stream(#[source] std::io::Error),
    #[error("failed to serialize request body: {0}")]
    Serialize(#[source] serde_json::Error),
    #[error("client configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("OpenAI refused to generate response: {0}")]
    Refusal(String),
}

impl OpenAIError {
    /// The HTTP status behind the error, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::API(err) => Some(err.status()),
            Self::Http(err) => err.status(),
            _ => None,
        }
    }
}

/// The client is not set up to make requests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("{0} header contains characters that cannot be sent")]
    InvalidHeaderValue(&'static str),
}

/// A request failed a local precondition and was never sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{field}` is invalid: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Fails with [`ValidationError::Empty`] when `value` is blank.
pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Empty(field))
    } else {
        Ok(())
    }
}

/// Fails unless `value` is a non-blank id that can be placed in a URL path as a single
/// segment.
pub(crate) fn require_path_segment(
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    require_non_empty(field, value)?;
    match value
        .chars()
        .find(|c| matches!(c, '/' | '?' | '#' | '%') || c.is_whitespace() || c.is_control())
    {
        Some(c) => Err(ValidationError::Invalid {
            field,
            reason: format!("{c:?} is not allowed in an id"),
        }),
        None => Ok(()),
    }
}

/// The structured error the provider returns in `{"error": {...}}` bodies.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default, deserialize_with = "crate::util::string_or_number")]
    pub code: Option<String>,
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(kind) = &self.kind {
            write!(f, " (type: {kind})")?;
        }
        if let Some(code) = &self.code {
            write!(f, " (code: {code})")?;
        }
        Ok(())
    }
}

/// A failure reported by the API, or a response the client could not make sense of.
/// Every variant carries the HTTP status of the response that produced it.
#[derive(Debug, thiserror::Error)]
pub enum OpenAIAPIError {
    #[error("{status}: {error}")]
    Envelope {
        status: StatusCode,
        error: ErrorEnvelope,
    },
    #[error("{status}: unexpected response body: {body}")]
    Unparseable {
        status: StatusCode,
        body: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{status}: malformed stream frame: {frame}")]
    MalformedFrame {
        status: StatusCode,
        frame: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{status}: empty or undeserializable response")]
    EmptyResponse { status: StatusCode },
}

impl OpenAIAPIError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Envelope { status, .. }
            | Self::Unparseable { status, .. }
            | Self::MalformedFrame { status, .. }
            | Self::EmptyResponse { status } => *status,
        }
    }

    /// The provider's structured error, when the body had one.
    pub fn envelope(&self) -> Option<&ErrorEnvelope> {
        match self {
            Self::Envelope { error, .. } => Some(error),
            _ => None,
        }
    }

    /// A human readable description: the provider's message when present.
    pub fn message(&self) -> String {
        match self {
            Self::Envelope { error, .. } => error.message.clone(),
            other => other.to_string(),
        }
    }

    /// The raw text that failed to parse, if that is what went wrong.
    pub fn raw_text(&self) -> Option<&str> {
        match self {
            Self::Unparseable { body, .. } => Some(body),
            Self::MalformedFrame { frame, .. } => Some(frame),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelopeWrapper {
    error: ErrorEnvelope,
}

/// Turns a non-success response into an error. Bodies that aren't a well-formed error
/// envelope keep the raw text and the parse failure.
pub(crate) fn classify_error(status: StatusCode, body: &str) -> OpenAIAPIError {
    match serde_json::from_str::<ErrorEnvelopeWrapper>(body) {
        Ok(wrapper) => OpenAIAPIError::Envelope {
            status,
            error: wrapper.error,
        },
        Err(source) => OpenAIAPIError::Unparseable {
            status,
            body: body.to_owned(),
            source,
        },
    }
}

/// Parses the body of a response that reported success.
pub(crate) fn parse_success<T>(status: StatusCode, body: &str) -> Result<T, OpenAIAPIError>
where
    T: DeserializeOwned,
{
    if body.trim().is_empty() {
        return Err(OpenAIAPIError::EmptyResponse { status });
    }

    match serde_json::from_str::<T>(body) {
        Ok(parsed) => Ok(parsed),
        // the API occasionally reports errors with a 200
        Err(source) => match serde_json::from_str::<ErrorEnvelopeWrapper>(body) {
            Ok(wrapper) => Err(OpenAIAPIError::Envelope {
                status,
                error: wrapper.error,
            }),
            Err(_) => Err(OpenAIAPIError::Unparseable {
                status,
                body: body.to_owned(),
                source,
            }),
        },
    }
}

/// Routes a response body to either the success parser or the classifier.
pub(crate) fn parse_response<T>(status: StatusCode, body: &str) -> OpenAIResult<T>
where
    T: DeserializeOwned,
{
    if status.is_success() {
        Ok(parse_success(status, body)?)
    } else {
        let err = classify_error(status, body);
        tracing::warn!(status = status.as_u16(), error = %err, "OpenAI request failed");
        Err(err.into())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn ids_must_be_single_path_segments() {
        assert!(require_path_segment("file_id", "file-abc123").is_ok());
        assert!(require_path_segment("model", "ft:gpt-4o-mini:org:custom:9abc").is_ok());
        assert_eq!(
            require_path_segment("file_id", ""),
            Err(ValidationError::Empty("file_id"))
        );
        for id in ["file-1/content", "../models", "a?b=c", "a#b", "a%2Fb", "a b"] {
            assert!(
                matches!(
                    require_path_segment("file_id", id),
                    Err(ValidationError::Invalid { field: "file_id", .. })
                ),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn error_envelope_is_extracted() {
        let err = classify_error(
            StatusCode::BAD_REQUEST,
            r#"{"error":{"message":"bad request","type":"invalid_request_error","code":"x"}}"#,
        );

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "bad request");
        let envelope = err.envelope().unwrap();
        assert_eq!(envelope.kind.as_deref(), Some("invalid_request_error"));
        assert_eq!(envelope.code.as_deref(), Some("x"));
        assert!(envelope.param.is_none());
    }

    #[test]
    fn unparseable_error_body_keeps_text_and_cause() {
        let err = classify_error(StatusCode::BAD_GATEWAY, "<html>upstream down</html>");

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.raw_text(), Some("<html>upstream down</html>"));
        assert!(err.source().is_some());
        assert!(err.envelope().is_none());
    }

    #[test]
    fn json_without_envelope_is_unparseable() {
        let err = classify_error(StatusCode::INTERNAL_SERVER_ERROR, r#"{"detail":"nope"}"#);
        assert!(matches!(err, OpenAIAPIError::Unparseable { .. }));
    }

    #[test]
    fn empty_success_body_is_a_contract_violation() {
        let err = parse_success::<serde_json::Value>(StatusCode::OK, "  ").unwrap_err();
        assert!(matches!(
            err,
            OpenAIAPIError::EmptyResponse {
                status: StatusCode::OK
            }
        ));
    }

    #[test]
    fn success_body_of_the_wrong_shape_keeps_the_cause() {
        #[derive(Deserialize, Debug)]
        struct Expected {
            #[allow(dead_code)]
            id: String,
        }

        let err = parse_success::<Expected>(StatusCode::OK, r#"{"name":"x"}"#).unwrap_err();
        assert_eq!(err.raw_text(), Some(r#"{"name":"x"}"#));
        assert!(err.source().is_some());
    }

    #[test]
    fn error_envelope_in_a_success_body_is_an_api_error() {
        #[derive(Deserialize, Debug)]
        struct Expected {
            #[allow(dead_code)]
            id: String,
        }

        let err = parse_success::<Expected>(
            StatusCode::OK,
            r#"{"error":{"message":"quota exceeded","type":"insufficient_quota"}}"#,
        )
        .unwrap_err();
        assert_eq!(err.message(), "quota exceeded");
    }

    #[test]
    fn non_success_is_routed_to_the_classifier() {
        let err = parse_response::<serde_json::Value>(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"message":"invalid key","type":"invalid_request_error","param":null,"code":"invalid_api_key"}}"#,
        )
        .unwrap_err();

        assert_eq!(err.status(), Some(StatusCode::UNAUTHORIZED));
        match err {
            OpenAIError::API(api) => assert_eq!(api.message(), "invalid key"),
            other => panic!("expected an API error, got {other:?}"),
        }
    }
}
