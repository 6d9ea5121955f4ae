use std::borrow::Cow;

use bon::Builder;
use chrono::{DateTime, Utc};
use reqwest::{multipart::Form, Method};
use serde::{Deserialize, Serialize};

use super::{files::UploadFile, FormExt, OpenAIRequestProvider, RequestBody};
use crate::{
    error::{require_non_empty, ValidationError},
    util::wire_enum,
    OpenAIResult,
};

wire_enum! {
    /// The dimensions of a generated image.
    pub enum ImageSize {
        Square256 => "256x256",
        Square512 => "512x512",
        Square1024 => "1024x1024",
        Landscape1792x1024 => "1792x1024",
        Portrait1024x1792 => "1024x1792",
    }
}

wire_enum! {
    /// How generated images are returned.
    pub enum ImageResponseFormat {
        Url => "url",
        B64Json => "b64_json",
    }
}

wire_enum! {
    pub enum ImageQuality {
        Standard => "standard",
        Hd => "hd",
    }
}

wire_enum! {
    pub enum ImageStyle {
        Vivid => "vivid",
        Natural => "natural",
    }
}

/// Creates images from a text prompt.
///
/// Construct with `ImageGeneration::prompt`
#[derive(Serialize, Debug, Clone, Builder)]
#[builder(start_fn = prompt)]
pub struct ImageGeneration<'a> {
    #[builder(start_fn, into)]
    prompt: Cow<'a, str>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<Cow<'a, str>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    n: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<ImageSize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quality: Option<ImageQuality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<ImageStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ImageResponseFormat>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<Cow<'a, str>>,
}

impl OpenAIRequestProvider for ImageGeneration<'_> {
    type Response = ImagesResponse;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/images/generations".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("prompt", &self.prompt)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        RequestBody::json(self)
    }
}

impl super::private::Sealed for ImageGeneration<'_> {}

/// Edits an image according to a prompt, optionally only inside a transparent mask.
///
/// Construct with `ImageEdit::image`
#[derive(Debug, Clone, Builder)]
#[builder(start_fn = image)]
pub struct ImageEdit<'a> {
    #[builder(start_fn)]
    image: UploadFile,
    #[builder(into)]
    prompt: Cow<'a, str>,
    mask: Option<UploadFile>,
    #[builder(into)]
    model: Option<Cow<'a, str>>,
    n: Option<u32>,
    size: Option<ImageSize>,
    response_format: Option<ImageResponseFormat>,
    #[builder(into)]
    user: Option<Cow<'a, str>>,
}

impl OpenAIRequestProvider for ImageEdit<'_> {
    type Response = ImagesResponse;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/images/edits".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.image.validate("image")?;
        if let Some(mask) = &self.mask {
            mask.validate("mask")?;
        }
        require_non_empty("prompt", &self.prompt)
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        let mut form = Form::new()
            .part("image", self.image.part())
            .text("prompt", self.prompt.to_string());
        if let Some(mask) = &self.mask {
            form = form.part("mask", mask.part());
        }

        Ok(RequestBody::Multipart(
            form.optional_text("model", self.model.as_deref())
                .optional_text("n", self.n)
                .optional_text("size", self.size)
                .optional_text("response_format", self.response_format)
                .optional_text("user", self.user.as_deref()),
        ))
    }
}

impl super::private::Sealed for ImageEdit<'_> {}

/// Creates variations of an image.
///
/// Construct with `ImageVariation::image`
#[derive(Debug, Clone, Builder)]
#[builder(start_fn = image)]
pub struct ImageVariation<'a> {
    #[builder(start_fn)]
    image: UploadFile,
    #[builder(into)]
    model: Option<Cow<'a, str>>,
    n: Option<u32>,
    size: Option<ImageSize>,
    response_format: Option<ImageResponseFormat>,
    #[builder(into)]
    user: Option<Cow<'a, str>>,
}

impl OpenAIRequestProvider for ImageVariation<'_> {
    type Response = ImagesResponse;

    const METHOD: Method = Method::POST;

    fn path_with_leading_slash(&self) -> String {
        "/images/variations".to_string()
    }

    fn validate(&self) -> Result<(), ValidationError> {
        self.image.validate("image")
    }

    fn body(&self) -> OpenAIResult<RequestBody> {
        Ok(RequestBody::Multipart(
            Form::new()
                .part("image", self.image.part())
                .optional_text("model", self.model.as_deref())
                .optional_text("n", self.n)
                .optional_text("size", self.size)
                .optional_text("response_format", self.response_format)
                .optional_text("user", self.user.as_deref()),
        ))
    }
}

impl super::private::Sealed for ImageVariation<'_> {}

#[derive(Deserialize, Debug)]
pub struct ImagesResponse {
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    created: Option<DateTime<Utc>>,
    data: Vec<Image>,
}

impl ImagesResponse {
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn images(&self) -> &[Image] {
        &self.data
    }

    pub fn into_images(self) -> Vec<Image> {
        self.data
    }
}

/// A generated image, as a URL or base64 data depending on the requested format.
#[derive(Deserialize, Debug, Clone)]
pub struct Image {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub b64_json: Option<String>,
    #[serde(default)]
    pub revised_prompt: Option<String>,
}
