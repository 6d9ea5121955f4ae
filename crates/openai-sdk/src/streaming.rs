//! Decoding of server-sent-event responses into typed stream chunks.
//!
//! The API streams one JSON object per `data: ` line and ends the logical stream
//! with `data: [DONE]`. [`FrameStream`] reads the body line by line, parses each
//! payload, and yields only the chunks that carry text.

use std::{
    io,
    marker::PhantomData,
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_util::{
    stream::{self, FusedStream},
    Stream, StreamExt, TryStreamExt,
};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tokio::io::AsyncBufReadExt;
use tokio_util::{io::StreamReader, sync::CancellationToken};

use crate::{error::OpenAIAPIError, OpenAIError, OpenAIResult};

const DATA_MARKER: &[u8] = b"data: ";
const DONE_SENTINEL: &[u8] = b"[DONE]";

/// A chunk type that can be decoded from a streaming response.
pub trait StreamChunk: DeserializeOwned + Send + 'static {
    /// Whether the chunk adds anything to the output. Chunks that don't, such as an
    /// empty delta or the final `stop` chunk, are never yielded.
    fn carries_text(&self) -> bool;
}

type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// A lazily decoded, non-restartable stream of chunks from a single streaming request.
///
/// The stream owns the HTTP response. The response is released when the stream ends,
/// fails, is cancelled, or is dropped, whichever comes first. Once it has ended the
/// stream keeps returning `None`.
pub struct FrameStream<T> {
    inner: Pin<Box<dyn FusedStream<Item = OpenAIResult<T>> + Send>>,
}

impl<T: StreamChunk> FrameStream<T> {
    /// Decodes `body`, a successful response body with status `status`, until it ends
    /// or `cancel` fires.
    pub fn new<S, E>(body: S, status: StatusCode, cancel: CancellationToken) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<Box<dyn std::error::Error + Send + Sync>> + 'static,
    {
        let body: ByteStream = Box::pin(body.map_err(io::Error::other));
        let decoder = Decoder::<T> {
            reader: StreamReader::new(body),
            line: Vec::new(),
            status,
            cancel,
            _chunk: PhantomData,
        };

        // a decoder that has failed or finished is dropped right away, taking the
        // response with it
        let inner = stream::unfold(Some(decoder), |decoder| async move {
            let mut decoder = decoder?;
            match decoder.next_chunk().await? {
                Ok(chunk) => Some((Ok(chunk), Some(decoder))),
                Err(err) => Some((Err(err), None)),
            }
        })
        .fuse();

        Self {
            inner: Box::pin(inner),
        }
    }

    /// A stream that yields nothing, for requests cancelled before a response arrived.
    pub fn empty() -> Self {
        Self {
            inner: Box::pin(stream::empty()),
        }
    }
}

impl<T> Stream for FrameStream<T> {
    type Item = OpenAIResult<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl<T> FusedStream for FrameStream<T> {
    fn is_terminated(&self) -> bool {
        self.inner.is_terminated()
    }
}

struct Decoder<T> {
    reader: StreamReader<ByteStream, Bytes>,
    /// The line being read. Bytes stay here if a read is interrupted.
    line: Vec<u8>,
    status: StatusCode,
    cancel: CancellationToken,
    _chunk: PhantomData<fn() -> T>,
}

impl<T: StreamChunk> Decoder<T> {
    async fn next_chunk(&mut self) -> Option<OpenAIResult<T>> {
        loop {
            let read = tokio::select! {
                biased;
                () = self.cancel.cancelled() => {
                    tracing::debug!("stream cancelled by caller");
                    return None;
                }
                read = self.reader.read_until(b'\n', &mut self.line) => read,
            };

            match read {
                Ok(0) => {
                    tracing::debug!("stream closed by server");
                    return None;
                }
                Ok(_) => {}
                Err(err) => return Some(Err(OpenAIError::Stream(err))),
            }

            let line = std::mem::take(&mut self.line);
            match decode_line::<T>(&line, self.status) {
                Ok(Some(chunk)) => return Some(Ok(chunk)),
                Ok(None) => continue,
                Err(err) => return Some(Err(err.into())),
            }
        }
    }
}

/// Decodes one raw line of the event stream. `Ok(None)` means the line is skipped.
///
/// Lines are kept as bytes so that a payload which isn't valid UTF-8 is reported as a
/// malformed frame rather than a transport failure.
pub(crate) fn decode_line<T: StreamChunk>(
    line: &[u8],
    status: StatusCode,
) -> Result<Option<T>, OpenAIAPIError> {
    let Some(payload) = strip_data_marker(line) else {
        return Ok(None);
    };

    let payload = payload.trim_ascii();
    if payload.is_empty() {
        return Ok(None);
    }
    if payload == DONE_SENTINEL {
        tracing::debug!("received end of stream sentinel");
        return Ok(None);
    }

    let chunk: T =
        serde_json::from_slice(payload).map_err(|source| OpenAIAPIError::MalformedFrame {
            status,
            frame: String::from_utf8_lossy(payload).into_owned(),
            source,
        })?;

    if chunk.carries_text() {
        tracing::trace!(frame = %String::from_utf8_lossy(payload), "decoded stream chunk");
        Ok(Some(chunk))
    } else {
        Ok(None)
    }
}

fn strip_data_marker(line: &[u8]) -> Option<&[u8]> {
    let line = line.trim_ascii_start();
    let marker = line.get(..DATA_MARKER.len())?;
    marker
        .eq_ignore_ascii_case(DATA_MARKER)
        .then(|| &line[DATA_MARKER.len()..])
}
