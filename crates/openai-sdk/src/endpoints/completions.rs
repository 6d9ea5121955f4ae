use std::{borrow::Cow, collections::HashMap};

use bon::Builder;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{
    chat::FinishReason, OpenAIRequestProvider, OpenAIStreamingRequestProvider, RequestBody,
};
use crate::{
    error::{require_non_empty, ValidationError},
    streaming::StreamChunk,
    OpenAIResult, Usage,
};

/// A legacy text completion request: a single prompt, continued by the model.
///
/// Construct with `Completion::model`
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = model)]
pub struct Completion<'a> {
    #[builder(start_fn, into)]
    model: Cow<'a, str>,
    #[builder(into)]
    prompt: Cow<'a, str>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    suffix: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logprobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    echo: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<Cow<'a, str>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    best_of: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logit_bias: Option<HashMap<i32, i32>>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<Cow<'a, str>>,
}

impl OpenAIRequestProvider for Completion<'_> {
    type Response = CompletionResponse;

    const METHOD: Method = Method::POST;
    const STREAMABLE: bool = true;

    fn path_with_leading_slash(&self) -> String {
        "/completions".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("model", &self.model)?;
        require_non_empty("prompt", &self.prompt)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        RequestBody::json(self)
    }
}

impl OpenAIStreamingRequestProvider for Completion<'_> {
    type Chunk = CompletionChunk;
}

impl super::private::Sealed for Completion<'_> {}

/// A response from a completion request.
#[derive(Deserialize, Debug)]
pub struct CompletionResponse {
    #[serde(default)]
    id: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    model: String,
    choices: Vec<CompletionChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl CompletionResponse {
    /// Consumes the response and gives the text of the first choice.
    pub fn text(self) -> Option<String> {
        self.choices.into_iter().next().map(|choice| choice.text)
    }

    pub fn choices(&self) -> &[CompletionChoice] {
        &self.choices
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionChoice {
    #[serde(default)]
    text: String,
    #[serde(default)]
    index: u32,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

impl CompletionChoice {
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }
}

/// One increment of a streamed completion.
#[derive(Deserialize, Debug, Clone)]
pub struct CompletionChunk {
    #[serde(default)]
    id: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    choices: Vec<CompletionChunkChoice>,
}

impl CompletionChunk {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// The choice at index 0, or the first one present.
    pub fn primary_choice(&self) -> Option<&CompletionChunkChoice> {
        self.choices
            .iter()
            .find(|choice| choice.index == 0)
            .or_else(|| self.choices.first())
    }

    /// The text fragment of the primary choice.
    pub fn text(&self) -> Option<&str> {
        self.primary_choice()?.text.as_deref()
    }
}

impl StreamChunk for CompletionChunk {
    fn carries_text(&self) -> bool {
        self.primary_choice().is_some_and(|choice| {
            choice.finish_reason != Some(FinishReason::Stop)
                && choice.text.as_deref().is_some_and(|text| !text.is_empty())
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct CompletionChunkChoice {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

impl CompletionChunkChoice {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }
}
