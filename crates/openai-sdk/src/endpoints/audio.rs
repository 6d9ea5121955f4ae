use std::borrow::Cow;

use bon::Builder;
use reqwest::{multipart::Form, Method};
use serde::Deserialize;

use super::{files::UploadFile, FormExt, OpenAIRequestProvider, RequestBody};
use crate::{
    error::{require_non_empty, ValidationError},
    util::wire_enum,
    OpenAIResult,
};

wire_enum! {
    /// The shape of an audio response. Only the JSON formats are supported, since
    /// every response is parsed as JSON.
    pub enum AudioResponseFormat {
        Json => "json",
        VerboseJson => "verbose_json",
    }
}

/// Transcribes audio into text in the language it was spoken in.
///
/// Construct with `Transcription::file`
#[derive(Debug, Clone, Builder)]
#[builder(start_fn = file)]
pub struct Transcription<'a> {
    #[builder(start_fn)]
    file: UploadFile,
    #[builder(into)]
    model: Cow<'a, str>,
    /// ISO-639-1 code of the spoken language.
    #[builder(into)]
    language: Option<Cow<'a, str>>,
    #[builder(into)]
    prompt: Option<Cow<'a, str>>,
    response_format: Option<AudioResponseFormat>,
    temperature: Option<f32>,
}

impl OpenAIRequestProvider for Transcription<'_> {
    type Response = AudioText;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/audio/transcriptions".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.file.validate("file")?;
        require_non_empty("model", &self.model)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Multipart(
            audio_form(&self.file, &self.model)
                .optional_text("language", self.language.as_deref())
                .optional_text("prompt", self.prompt.as_deref())
                .optional_text("response_format", self.response_format)
                .optional_text("temperature", self.temperature),
        ))
    }
}

impl super::private::Sealed for Transcription<'_> {}

/// Translates audio into English text.
///
/// Construct with `Translation::file`
#[derive(Debug, Clone, Builder)]
#[builder(start_fn = file)]
pub struct Translation<'a> {
    #[builder(start_fn)]
    file: UploadFile,
    #[builder(into)]
    model: Cow<'a, str>,
    #[builder(into)]
    prompt: Option<Cow<'a, str>>,
    response_format: Option<AudioResponseFormat>,
    temperature: Option<f32>,
}

impl OpenAIRequestProvider for Translation<'_> {
    type Response = AudioText;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/audio/translations".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.file.validate("file")?;
        require_non_empty("model", &self.model)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Multipart(
            audio_form(&self.file, &self.model)
                .optional_text("prompt", self.prompt.as_deref())
                .optional_text("response_format", self.response_format)
                .optional_text("temperature", self.temperature),
        ))
    }
}

impl super::private::Sealed for Translation<'_> {}

fn audio_form(file: &UploadFile, model: &str) -> Form {
    Form::new()
        .part("file", file.part())
        .text("model", model.to_owned())
}

/// The text of a transcription or translation. The optional fields are only filled in
/// for `verbose_json` responses.
#[derive(Deserialize, Debug, Clone)]
pub struct AudioText {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Vec<AudioSegment>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AudioSegment {
    pub id: u32,
    pub start: f64,
    pub end: f64,
    pub text: String,
}
