mod chunk;
mod standard;

pub use chunk::*;
pub use standard::*;

use std::borrow::Cow;

use bon::Builder;
use serde::{Deserialize, Serialize, Serializer};

/// The role of the message used for the chat completion.
#[derive(Serialize, Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The system message, describing the task to the model.
    System,
    /// Instructions from the developer. Newer models use this in place of `System`.
    Developer,
    /// The user message, i.e. the payload into the model.
    User,
    /// The assistant message, i.e. the model's response.
    Assistant,
    /// The result of a tool call, sent back to the model.
    Tool,
}

/// A chat completion message. You can pre-populate the request with user and
/// assistant messages (alongside the system message) to provide context for the
/// completion.
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = role)]
pub struct Message<'a> {
    #[builder(start_fn)]
    role: Role,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<Cow<'a, str>>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<Cow<'a, str>>,
    /// Tool calls previously requested by the assistant, when replaying them.
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ToolCall>>,
    /// The call a `Tool` message answers.
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<Cow<'a, str>>,
}

impl<'a> Message<'a> {
    /// A `Tool` message carrying the output of the call with id `tool_call_id`.
    pub fn tool_result(
        tool_call_id: impl Into<Cow<'a, str>>,
        content: impl Into<Cow<'a, str>>,
    ) -> Self {
        Message::role(Role::Tool)
            .tool_call_id(tool_call_id)
            .content(content)
            .build()
    }

    pub fn role_of(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

#[macro_export]
macro_rules! system_message {
    ($($arg:tt)*) => {
        $crate::endpoints::chat::Message::role(
            $crate::endpoints::chat::Role::System
        )
        .content(format!($($arg)*))
        .build()
    };
}

#[macro_export]
macro_rules! user_message {
    ($($arg:tt)*) => {
        $crate::endpoints::chat::Message::role(
            $crate::endpoints::chat::Role::User
        )
        .content(format!($($arg)*))
        .build()
    };
}

#[macro_export]
macro_rules! assistant_message {
    ($($arg:tt)*) => {
        $crate::endpoints::chat::Message::role(
            $crate::endpoints::chat::Role::Assistant
        )
        .content(format!($($arg)*))
        .build()
    };
}

/// The reason the response was terminated.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    FunctionCall,
    /// A reason this client doesn't know about yet.
    #[serde(other)]
    Other,
}

/// A tool the model may call.
#[derive(Serialize, Debug, Clone)]
#[serde(tag = "type", content = "function", rename_all = "snake_case")]
pub enum Tool<'a> {
    Function(FunctionDefinition<'a>),
}

/// A function the model may call. `parameters` is a JSON schema describing the
/// arguments object.
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = name)]
pub struct FunctionDefinition<'a> {
    #[builder(start_fn, into)]
    name: Cow<'a, str>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strict: Option<bool>,
}

impl<'a> From<FunctionDefinition<'a>> for Tool<'a> {
    fn from(function: FunctionDefinition<'a>) -> Self {
        Tool::Function(function)
    }
}

/// Controls whether and which tool the model calls.
#[derive(Debug, Clone)]
pub enum ToolChoice<'a> {
    None,
    Auto,
    Required,
    Function(Cow<'a, str>),
}

impl Serialize for ToolChoice<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ToolChoice::None => serializer.serialize_str("none"),
            ToolChoice::Auto => serializer.serialize_str("auto"),
            ToolChoice::Required => serializer.serialize_str("required"),
            ToolChoice::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            })
            .serialize(serializer),
        }
    }
}

/// A call the model asked to make.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub function: FunctionCall,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Function,
}

/// The function name and its arguments, encoded as a JSON string by the model.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

impl FunctionCall {
    /// Parses the arguments the model produced.
    pub fn parse_arguments<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_str(&self.arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_build_messages() {
        let message = user_message!("Hi {}", "there");
        assert_eq!(message.role_of(), Role::User);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({ "role": "user", "content": "Hi there" })
        );
    }

    #[test]
    fn tool_result_references_the_call() {
        let message = Message::tool_result("call_1", "{\"ok\":true}");
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            serde_json::json!({ "role": "tool", "content": "{\"ok\":true}", "tool_call_id": "call_1" })
        );
    }

    #[test]
    fn tools_serialize_in_the_function_envelope() {
        let tool: Tool = FunctionDefinition::name("get_weather")
            .description("Current weather for a city")
            .parameters(serde_json::json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"],
            }))
            .build()
            .into();

        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], "get_weather");
        assert_eq!(value["function"]["parameters"]["required"][0], "city");
    }

    #[test]
    fn tool_choice_wire_forms() {
        assert_eq!(
            serde_json::to_value(ToolChoice::Auto).unwrap(),
            serde_json::json!("auto")
        );
        assert_eq!(
            serde_json::to_value(ToolChoice::Function("lookup".into())).unwrap(),
            serde_json::json!({ "type": "function", "function": { "name": "lookup" } })
        );
    }

    #[test]
    fn unknown_finish_reasons_are_tolerated() {
        let reason: FinishReason = serde_json::from_str("\"brand_new_reason\"").unwrap();
        assert_eq!(reason, FinishReason::Other);
    }

    #[test]
    fn function_arguments_parse() {
        #[derive(Deserialize)]
        struct Args {
            city: String,
        }

        let call = FunctionCall {
            name: "get_weather".into(),
            arguments: r#"{"city":"Oslo"}"#.into(),
        };
        assert_eq!(call.parse_arguments::<Args>().unwrap().city, "Oslo");
    }
}
