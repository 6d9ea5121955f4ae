use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{FinishReason, Role};
use crate::{streaming::StreamChunk, Usage};

/// One increment of a streamed chat completion.
///
/// Every field but `choices` may be missing from a frame, in which case it takes its
/// default.
#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    id: String,
    #[serde(default)]
    object: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatCompletionChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ChatCompletionChunk {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn object(&self) -> &str {
        &self.object
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn choices(&self) -> &[ChatCompletionChunkChoice] {
        &self.choices
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    /// The choice at index 0, or the first one present.
    pub fn primary_choice(&self) -> Option<&ChatCompletionChunkChoice> {
        self.choices
            .iter()
            .find(|choice| choice.index == 0)
            .or_else(|| self.choices.first())
    }

    /// The text fragment of the primary choice.
    pub fn content(&self) -> Option<&str> {
        self.primary_choice().and_then(ChatCompletionChunkChoice::content)
    }
}

impl StreamChunk for ChatCompletionChunk {
    fn carries_text(&self) -> bool {
        self.primary_choice().is_some_and(|choice| {
            choice.finish_reason != Some(FinishReason::Stop)
                && choice.content().is_some_and(|content| !content.is_empty())
        })
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ChatCompletionChunkChoice {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    delta: Option<ChatCompletionDelta>,
    #[serde(default)]
    finish_reason: Option<FinishReason>,
}

impl ChatCompletionChunkChoice {
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn delta(&self) -> Option<&ChatCompletionDelta> {
        self.delta.as_ref()
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn content(&self) -> Option<&str> {
        self.delta.as_ref()?.content.as_deref()
    }
}

/// The partial message carried by a chunk. Any part may be absent.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ChatCompletionDelta {
    /// Roles this client doesn't know are read as `None`.
    #[serde(default, deserialize_with = "crate::util::lenient_option")]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// A fragment of a tool call. Fragments with the same `index` add up to one call.
#[derive(Deserialize, Debug, Clone)]
pub struct ToolCallDelta {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionCallDelta>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct FunctionCallDelta {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}
