use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;

use super::{ListResponse, OpenAIRequestProvider, RequestBody};
use crate::{
    error::{require_path_segment, ValidationError},
    OpenAIResult,
};

/// Lists the models available to the account.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListModels;

impl OpenAIRequestProvider for ListModels {
    type Response = ListResponse<Model>;

    const METHOD: Method = Method::GET;

    fn path_with_leading_slash(&self) -> String {
        "/models".to_string()
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for ListModels {}

#[derive(Debug, Clone)]
pub struct RetrieveModel {
    model: String,
}

impl RetrieveModel {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl OpenAIRequestProvider for RetrieveModel {
    type Response = Model;

    const METHOD: Method = Method::GET;

    fn path_with_leading_slash(&self) -> String {
        format!("/models/{}", self.model)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_path_segment("model", &self.model)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for RetrieveModel {}

#[derive(Deserialize, Debug, Clone)]
pub struct Model {
    pub id: String,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owned_by: String,
}
