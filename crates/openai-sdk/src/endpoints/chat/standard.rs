use std::{borrow::Cow, collections::HashMap};

use bon::Builder;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use crate::{
    endpoints::{OpenAIRequestProvider, OpenAIStreamingRequestProvider, RequestBody},
    error::{require_non_empty, ValidationError},
    OpenAIError, OpenAIResult, Usage,
};

use super::{ChatCompletionChunk, FinishReason, Message, Role, Tool, ToolCall, ToolChoice};

/// A chat completion request. Send it with `req` for the whole response at once, or
/// with `stream` to receive it as it is generated.
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = model)]
pub struct ChatCompletion<'a> {
    #[builder(start_fn, into)]
    model: Cow<'a, str>,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    presence_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frequency_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<Cow<'a, str>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logit_bias: Option<HashMap<i32, i32>>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Tool<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<ToolChoice<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<HashMap<String, String>>,
}

impl OpenAIRequestProvider for ChatCompletion<'_> {
    type Response = ChatCompletionResponse;

    const METHOD: Method = Method::POST;
    const STREAMABLE: bool = true;

    fn path_with_leading_slash(&self) -> String {
        "/chat/completions".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("model", &self.model)?;
        if self.messages.is_empty() {
            return Err(ValidationError::Empty("messages"));
        }
        Ok(())
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        RequestBody::json(self)
    }
}

impl OpenAIStreamingRequestProvider for ChatCompletion<'_> {
    type Chunk = ChatCompletionChunk;
}

impl super::super::private::Sealed for ChatCompletion<'_> {}

/// A response from a chat completion request.
#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    id: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    model: String,
    choices: Vec<ChatCompletionResponseChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

impl ChatCompletionResponse {
    /// Takes the first message in the response consumes the response.
    pub fn take_first_choice(self) -> Option<ChatCompletionResponseChoice> {
        self.choices.into_iter().next()
    }

    pub fn choices(&self) -> &[ChatCompletionResponseChoice] {
        &self.choices
    }

    /// Gives the usage tokens of the response.
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

/// A response choice from a chat completion request.
#[derive(Deserialize, Debug)]
pub struct ChatCompletionResponseChoice {
    #[serde(default)]
    finish_reason: Option<FinishReason>,
    #[serde(default)]
    index: u32,
    message: ChatCompletionResponseMessage,
}

impl ChatCompletionResponseChoice {
    /// Takes the message text. A refusal from the model is returned as an error; a
    /// message that only carries tool calls gives an empty string.
    pub fn message(self) -> OpenAIResult<String> {
        match self.message.refusal {
            Some(refusal) => Err(OpenAIError::Refusal(refusal)),
            None => Ok(self.message.content.unwrap_or_default()),
        }
    }

    /// The tool calls the model asked for, if any.
    pub fn tool_calls(&self) -> &[ToolCall] {
        self.message.tool_calls.as_deref().unwrap_or_default()
    }

    pub fn role(&self) -> Option<Role> {
        self.message.role
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn index(&self) -> u32 {
        self.index
    }
}

// leave private, messages should only be interacted with through the choice.
#[derive(Deserialize, Debug)]
struct ChatCompletionResponseMessage {
    #[serde(default, deserialize_with = "crate::util::lenient_option")]
    role: Option<Role>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCall>>,
}

#[macro_export]
macro_rules! logit_bias {
    () => {
        std::collections::HashMap::new()
    };

    ($($key:tt : $value:expr),+ $(,)?) => {{
        let mut map = std::collections::HashMap::new();
        $(
            map.insert($key as i32, $value as i32);
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{system_message, user_message};

    fn request() -> ChatCompletion<'static> {
        ChatCompletion::model("gpt-4o-mini")
            .messages(vec![
                system_message!("You are a helpful assistant."),
                user_message!("Hi"),
            ])
            .temperature(0.2)
            .stop(vec!["\n\n".into()])
            .logit_bias(logit_bias!(50256: -100))
            .build()
    }

    #[test]
    fn serializes_only_set_parameters() {
        let body = serde_json::to_value(request()).unwrap();

        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "Hi");
        assert_eq!(body["stop"][0], "\n\n");
        assert_eq!(body["logit_bias"]["50256"], -100);
        assert!(body.get("top_p").is_none());
        assert!(body.get("tools").is_none());
        assert!(body.get("stream").is_none());
    }

    #[test]
    fn validation_requires_model_and_messages() {
        assert!(request().validate().is_ok());

        let no_model = ChatCompletion::model("")
            .messages(vec![user_message!("Hi")])
            .build();
        assert_eq!(no_model.validate(), Err(ValidationError::Empty("model")));

        let no_messages = ChatCompletion::model("gpt-4o").messages(vec![]).build();
        assert_eq!(
            no_messages.validate(),
            Err(ValidationError::Empty("messages"))
        );
    }

    #[test]
    fn response_choice_exposes_text_and_tool_calls() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1700000000,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": { "name": "get_weather", "arguments": "{\"city\":\"Oslo\"}" }
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": { "prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21 }
            }"#,
        )
        .unwrap();

        assert_eq!(response.usage().map(|u| u.total_tokens), Some(21));
        let choice = response.take_first_choice().unwrap();
        assert_eq!(choice.finish_reason(), Some(FinishReason::ToolCalls));
        assert_eq!(choice.tool_calls()[0].function.name, "get_weather");
        assert_eq!(choice.message().unwrap(), "");
    }

    #[test]
    fn refusals_become_errors() {
        let response: ChatCompletionResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":null,"refusal":"I can't help with that."},"finish_reason":"stop"}]}"#,
        )
        .unwrap();

        let err = response.take_first_choice().unwrap().message().unwrap_err();
        assert!(matches!(err, OpenAIError::Refusal(_)));
    }
}
