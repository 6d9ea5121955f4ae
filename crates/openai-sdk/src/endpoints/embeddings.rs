use std::borrow::Cow;

use bon::Builder;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{OpenAIRequestProvider, RequestBody};
use crate::{
    error::{require_non_empty, ValidationError},
    OpenAIResult, Usage,
};

/// The text to embed: one input or a batch.
#[derive(Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum EmbeddingsInput<'a> {
    Single(Cow<'a, str>),
    Batch(Vec<Cow<'a, str>>),
}

impl<'a> From<&'a str> for EmbeddingsInput<'a> {
    fn from(input: &'a str) -> Self {
        Self::Single(input.into())
    }
}

impl From<String> for EmbeddingsInput<'_> {
    fn from(input: String) -> Self {
        Self::Single(input.into())
    }
}

impl<'a> From<Vec<Cow<'a, str>>> for EmbeddingsInput<'a> {
    fn from(inputs: Vec<Cow<'a, str>>) -> Self {
        Self::Batch(inputs)
    }
}

/// A text embeddings creation request.
///
/// Construct with `Embeddings::model`
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = model)]
pub struct Embeddings<'a> {
    #[builder(start_fn, into)]
    model: Cow<'a, str>,
    #[builder(into)]
    input: EmbeddingsInput<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<u32>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<Cow<'a, str>>,
}

impl OpenAIRequestProvider for Embeddings<'_> {
    type Response = EmbeddingsResponse;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/embeddings".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("model", &self.model)?;
        match &self.input {
            EmbeddingsInput::Single(input) => require_non_empty("input", input),
            EmbeddingsInput::Batch(inputs) if inputs.is_empty() => {
                Err(ValidationError::Empty("input"))
            }
            EmbeddingsInput::Batch(_) => Ok(()),
        }
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        RequestBody::json(self)
    }
}

impl super::private::Sealed for Embeddings<'_> {}

#[derive(Deserialize, Debug)]
pub struct EmbeddingsResponse {
    data: Vec<EmbeddingsData>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    usage: Option<Usage>,
}

impl EmbeddingsResponse {
    /// Consumes the response and gives the first embedding.
    pub fn embedding(self) -> Vec<f32> {
        self.data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .unwrap_or_default()
    }

    /// Gives a reference to the first embedding.
    pub fn embedding_ref(&self) -> &[f32] {
        self.data
            .first()
            .map(|d| d.embedding.as_slice())
            .unwrap_or_default()
    }

    /// Consumes the response and gives every embedding, ordered by input index.
    pub fn embeddings(mut self) -> Vec<Vec<f32>> {
        self.data.sort_by_key(|d| d.index);
        self.data.into_iter().map(|d| d.embedding).collect()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }
}

#[derive(Deserialize, Debug)]
struct EmbeddingsData {
    #[serde(default)]
    index: u32,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_inputs_serialize_as_an_array() {
        let request = Embeddings::model("text-embedding-3-small")
            .input(vec![Cow::from("a"), Cow::from("b")])
            .build();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["input"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn empty_input_is_rejected() {
        let request = Embeddings::model("text-embedding-3-small")
            .input("")
            .build();
        assert_eq!(request.validate(), Err(ValidationError::Empty("input")));
    }

    #[test]
    fn embeddings_are_ordered_by_index() {
        let response: EmbeddingsResponse = serde_json::from_str(
            r#"{"object":"list","data":[{"index":1,"embedding":[0.5]},{"index":0,"embedding":[0.25]}],"model":"m"}"#,
        )
        .unwrap();
        assert_eq!(response.embedding_ref(), &[0.5]);
        assert_eq!(response.embeddings(), vec![vec![0.25], vec![0.5]]);
    }
}
