use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::{
    multipart::{Form, Part},
    Method,
};
use serde::Deserialize;

use super::{ListResponse, OpenAIRequestProvider, RequestBody};
use crate::{
    error::{require_path_segment, ValidationError},
    util::wire_enum,
    OpenAIResult,
};

/// A named file to send in a multipart request.
///
/// The contents are reference counted, so cloning an upload (or sending the same
/// request twice) doesn't copy them.
#[derive(Debug, Clone)]
pub struct UploadFile {
    file_name: String,
    bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub(crate) fn validate(&self, field: &'static str) -> Result<(), ValidationError> {
        if self.file_name.trim().is_empty() {
            return Err(ValidationError::Invalid {
                field,
                reason: "file name is empty".to_owned(),
            });
        }
        if self.bytes.is_empty() {
            return Err(ValidationError::Invalid {
                field,
                reason: format!("{} has no contents", self.file_name),
            });
        }
        Ok(())
    }

    pub(crate) fn part(&self) -> Part {
        Part::stream_with_length(self.bytes.clone(), self.bytes.len() as u64)
            .file_name(self.file_name.clone())
    }
}

wire_enum! {
    /// What an uploaded file will be used for.
    pub enum FilePurpose {
        FineTune => "fine-tune",
        Assistants => "assistants",
        Batch => "batch",
        Vision => "vision",
        UserData => "user_data",
    }
}

/// Uploads a file.
#[derive(Debug, Clone)]
pub struct FileUpload {
    file: UploadFile,
    purpose: FilePurpose,
}

impl FileUpload {
    pub fn new(file: UploadFile, purpose: FilePurpose) -> Self {
        Self { file, purpose }
    }
}

impl OpenAIRequestProvider for FileUpload {
    type Response = FileObject;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/files".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.file.validate("file")
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Multipart(
            Form::new()
                .text("purpose", self.purpose.as_str())
                .part("file", self.file.part()),
        ))
    }
}

impl super::private::Sealed for FileUpload {}

/// Lists uploaded files, optionally only those with a given purpose.
#[derive(Debug, Clone, Default)]
pub struct ListFiles {
    purpose: Option<FilePurpose>,
}

impl ListFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn purpose(purpose: FilePurpose) -> Self {
        Self {
            purpose: Some(purpose),
        }
    }
}

impl OpenAIRequestProvider for ListFiles {
    type Response = ListResponse<FileObject>;

    const METHOD: Method = Method::GET;

    fn path_with_leading_slash(&self) -> String {
        "/files".to_string()
    }

    fn query(&self) -> Vec<(&'static str, String)> {
        self.purpose
            .map(|purpose| vec![("purpose", purpose.to_string())])
            .unwrap_or_default()
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for ListFiles {}

/// Fetches the metadata of one file.
#[derive(Debug, Clone)]
pub struct RetrieveFile {
    file_id: String,
}

impl RetrieveFile {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}

impl OpenAIRequestProvider for RetrieveFile {
    type Response = FileObject;

    const METHOD: Method = Method::GET;

    fn path_with_leading_slash(&self) -> String {
        format!("/files/{}", self.file_id)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_path_segment("file_id", &self.file_id)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for RetrieveFile {}

#[derive(Debug, Clone)]
pub struct DeleteFile {
    file_id: String,
}

impl DeleteFile {
    pub fn new(file_id: impl Into<String>) -> Self {
        Self {
            file_id: file_id.into(),
        }
    }
}

impl OpenAIRequestProvider for DeleteFile {
    type Response = DeletedFile;

    const METHOD: Method = Method::DELETE;

    fn path_with_leading_slash(&self) -> String {
        format!("/files/{}", self.file_id)
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_path_segment("file_id", &self.file_id)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Empty)
    }
}

impl super::private::Sealed for DeleteFile {}

/// An uploaded file.
#[derive(Deserialize, Debug, Clone)]
pub struct FileObject {
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created_at: DateTime<Utc>,
    pub filename: String,
    pub purpose: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct DeletedFile {
    pub id: String,
    #[serde(default)]
    pub object: String,
    pub deleted: bool,
}
