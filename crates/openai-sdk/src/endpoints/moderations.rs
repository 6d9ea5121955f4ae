use std::{borrow::Cow, collections::HashMap};

use bon::Builder;
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{OpenAIRequestProvider, RequestBody};
use crate::{
    error::{require_non_empty, ValidationError},
    OpenAIResult,
};

/// Classifies text against the provider's usage policies.
///
/// Construct with `Moderation::input`
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = input)]
pub struct Moderation<'a> {
    #[builder(start_fn, into)]
    input: Cow<'a, str>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<Cow<'a, str>>,
}

impl OpenAIRequestProvider for Moderation<'_> {
    type Response = ModerationResponse;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/moderations".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("input", &self.input)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        RequestBody::json(self)
    }
}

impl super::private::Sealed for Moderation<'_> {}

#[derive(Deserialize, Debug)]
pub struct ModerationResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub model: String,
    pub results: Vec<ModerationResult>,
}

impl ModerationResponse {
    /// Whether any result was flagged.
    pub fn flagged(&self) -> bool {
        self.results.iter().any(|result| result.flagged)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ModerationResult {
    pub flagged: bool,
    #[serde(default)]
    pub categories: HashMap<String, bool>,
    #[serde(default)]
    pub category_scores: HashMap<String, f64>,
}

impl ModerationResult {
    /// The categories that were flagged.
    pub fn flagged_categories(&self) -> impl Iterator<Item = &str> {
        self.categories
            .iter()
            .filter(|(_, flagged)| **flagged)
            .map(|(category, _)| category.as_str())
    }
}
