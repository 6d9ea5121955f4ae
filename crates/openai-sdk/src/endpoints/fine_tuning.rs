use std::borrow::Cow;

use bon::Builder;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{pagination_query, ListResponse, OpenAIRequestProvider, RequestBody};
use crate::{
    error::{require_non_empty, require_path_segment, ValidationError},
    util::wire_enum,
    OpenAIResult,
};

/// Starts a fine-tuning job from an uploaded training file.
///
/// Construct with `CreateFineTuningJob::model`
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = model)]
pub struct CreateFineTuningJob<'a> {
    #[builder(start_fn, into)]
    model: Cow<'a, str>,
    /// The id of an uploaded file with purpose `fine-tune`.
    #[builder(into)]
    training_file: Cow<'a, str>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_file: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hyperparameters: Option<Hyperparameters>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    suffix: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    seed: Option<i64>,
}

/// Training hyperparameters. Anything left unset is chosen by the API.
#[derive(Serialize, Debug, Clone, Default, Builder)]
pub struct Hyperparameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    n_epochs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    batch_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    learning_rate_multiplier: Option<f64>,
}

impl OpenAIRequestProvider for CreateFineTuningJob<'_> {
    type Response = FineTuningJob;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/fine_tuning/jobs".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("model", &self.model)?;
        require_non_empty("training_file", &self.training_file)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        RequestBody::json(self)
    }
}

impl super::private::Sealed for CreateFineTuningJob<'_> {}

/// Lists the organization's fine-tuning jobs, newest first.
#[derive(Debug, Clone, Default, Builder)]
pub struct ListFineTuningJobs<'a> {
    /// The id of the last job of the previous page.
    #[builder(into)]
    after: Option<Cow<'a, str>>,
    limit: Option<u32>,
}

impl OpenAIRequestProvider for ListFineTuningJobs<'_> {
    type Response = ListResponse<FineTuningJob>;

    const METHOD: Method = Method::GET;

    fn path_with_leading_slash(&self) -> String {
        "/fine_tuning/jobs".to_string()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        pagination_query(self.after.as_deref(), self.limit)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for ListFineTuningJobs<'_> {}

#[derive(Debug, Clone)]
pub struct RetrieveFineTuningJob {
    job_id: String,
}

impl RetrieveFineTuningJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

impl OpenAIRequestProvider for RetrieveFineTuningJob {
    type Response = FineTuningJob;

    const METHOD: Method = Method::GET;

    fn path_with_leading_slash(&self) -> String {
        format!("/fine_tuning/jobs/{}", self.job_id)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_path_segment("job_id", &self.job_id)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for RetrieveFineTuningJob {}

/// Immediately cancels a running fine-tuning job.
#[derive(Debug, Clone)]
pub struct CancelFineTuningJob {
    job_id: String,
}

impl CancelFineTuningJob {
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
        }
    }
}

impl OpenAIRequestProvider for CancelFineTuningJob {
    type Response = FineTuningJob;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        format!("/fine_tuning/jobs/{}/cancel", self.job_id)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_path_segment("job_id", &self.job_id)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for CancelFineTuningJob {}

/// Lists status updates for a fine-tuning job.
///
/// Construct with `ListFineTuningEvents::job_id`
#[derive(Debug, Clone, Builder)]
#[builder(start_fn = job_id)]
pub struct ListFineTuningEvents<'a> {
    #[builder(start_fn, into)]
    job_id: Cow<'a, str>,
    #[builder(into)]
    after: Option<Cow<'a, str>>,
    limit: Option<u32>,
}

impl OpenAIRequestProvider for ListFineTuningEvents<'_> {
    type Response = ListResponse<FineTuningEvent>;

    const METHOD: Method = Method::GET;

    fn path_with_leading_slash(&self) -> String {
        format!("/fine_tuning/jobs/{}/events", self.job_id)
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        pagination_query(self.after.as_deref(), self.limit)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_path_segment("job_id", &self.job_id)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for ListFineTuningEvents<'_> {}

wire_enum! {
    pub enum FineTuningJobStatus {
        ValidatingFiles => "validating_files",
        Queued => "queued",
        Running => "running",
        Succeeded => "succeeded",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl FineTuningJobStatus {
    /// Whether the job has stopped, successfully or not.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct FineTuningJob {
    pub id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub finished_at: Option<DateTime<Utc>>,
    pub model: String,
    #[serde(default)]
    pub fine_tuned_model: Option<String>,
    #[serde(default)]
    pub organization_id: Option<String>,
    pub status: FineTuningJobStatus,
    pub training_file: String,
    #[serde(default)]
    pub validation_file: Option<String>,
    #[serde(default)]
    pub result_files: Vec<String>,
    #[serde(default)]
    pub trained_tokens: Option<u64>,
    /// Values the API chose are reported as `"auto"` until training starts.
    #[serde(default)]
    pub hyperparameters: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<FineTuningJobError>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FineTuningJobError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct FineTuningEvent {
    pub id: String,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_serializes_hyperparameters() {
        let request = CreateFineTuningJob::model("gpt-4o-mini-2024-07-18")
            .training_file("file-abc")
            .hyperparameters(Hyperparameters::builder().n_epochs(3).build())
            .build();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["training_file"], "file-abc");
        assert_eq!(body["hyperparameters"], serde_json::json!({ "n_epochs": 3 }));
        assert!(body.get("suffix").is_none());
    }

    #[test]
    fn training_file_is_required() {
        let request = CreateFineTuningJob::model("gpt-4o-mini")
            .training_file("")
            .build();
        assert_eq!(
            request.validate(),
            Err(ValidationError::Empty("training_file"))
        );
    }

    #[test]
    fn pagination_becomes_query_parameters() {
        let list = ListFineTuningJobs::builder().after("ftjob-1").limit(5).build();
        assert_eq!(
            list.query(),
            vec![("after", "ftjob-1".to_string()), ("limit", "5".to_string())]
        );

        let events = ListFineTuningEvents::job_id("ftjob-2").build();
        assert!(events.query().is_empty());
        assert_eq!(
            events.path_with_leading_slash(),
            "/fine_tuning/jobs/ftjob-2/events"
        );
    }

    #[test]
    fn cancel_targets_the_job() {
        let cancel = CancelFineTuningJob::new("ftjob-3");
        assert_eq!(
            cancel.path_with_leading_slash(),
            "/fine_tuning/jobs/ftjob-3/cancel"
        );
        assert_eq!(
            CancelFineTuningJob::new("").validate(),
            Err(ValidationError::Empty("job_id"))
        );
        assert!(matches!(
            CancelFineTuningJob::new("ftjob-3#frag").validate(),
            Err(ValidationError::Invalid { field: "job_id", .. })
        ));
        assert!(matches!(
            ListFineTuningEvents::job_id("ftjob-2/cancel").build().validate(),
            Err(ValidationError::Invalid { field: "job_id", .. })
        ));
    }

    #[test]
    fn jobs_parse() {
        let job: FineTuningJob = serde_json::from_str(
            r#"{
                "object": "fine_tuning.job",
                "id": "ftjob-abc",
                "model": "gpt-4o-mini-2024-07-18",
                "created_at": 1721764800,
                "finished_at": null,
                "fine_tuned_model": null,
                "organization_id": "org-1",
                "result_files": [],
                "status": "queued",
                "validation_file": null,
                "training_file": "file-abc",
                "hyperparameters": { "n_epochs": "auto" }
            }"#,
        )
        .unwrap();

        assert_eq!(job.status, FineTuningJobStatus::Queued);
        assert!(!job.status.is_terminal());
        assert!(job.finished_at.is_none());
        assert_eq!(job.hyperparameters.unwrap()["n_epochs"], "auto");
    }
}
