//! A minimal HTTP/1.1 responder for exercising the client against canned responses.
//!
//! Each accepted connection is answered with the next queued [`MockResponse`] and then
//! closed, so every request the client makes lands on a fresh connection.

#![allow(dead_code)]

use std::time::Duration;

use openai_sdk::{Credentials, OpenAI, StaticAuthTokenProvider};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};

/// A base URL nothing listens on. Requests that reach the network fail with a
/// transport error, so getting any other error proves nothing was sent.
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:9/v1";

pub struct MockResponse {
    status: u16,
    content_type: &'static str,
    chunks: Vec<String>,
    chunk_delay: Duration,
    hold_open: bool,
}

impl MockResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![body.to_owned()],
            chunk_delay: Duration::ZERO,
            hold_open: false,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            content_type: "text/html",
            ..Self::json(status, body)
        }
    }

    /// An event stream written one line at a time.
    pub fn event_stream(lines: &[&str]) -> Self {
        Self {
            status: 200,
            content_type: "text/event-stream",
            chunks: lines.iter().map(|line| format!("{line}\n")).collect(),
            chunk_delay: Duration::from_millis(5),
            hold_open: false,
        }
    }

    /// Keeps the connection open after the last chunk instead of closing it.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[derive(Debug)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body should be JSON")
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub struct MockServer {
    pub base_url: String,
    requests: mpsc::UnboundedReceiver<CapturedRequest>,
}

impl MockServer {
    pub async fn start(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());
        let (tx, requests) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for response in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                let request = read_request(&mut socket).await;
                let _ = tx.send(request);
                write_response(&mut socket, response).await;
            }
        });

        Self { base_url, requests }
    }

    /// The next request the server received.
    pub async fn request(&mut self) -> CapturedRequest {
        tokio::time::timeout(Duration::from_secs(5), self.requests.recv())
            .await
            .expect("timed out waiting for a request")
            .expect("server stopped before receiving a request")
    }

    pub fn client(&self) -> OpenAI<StaticAuthTokenProvider> {
        client(&self.base_url)
    }
}

pub fn client(base_url: &str) -> OpenAI<StaticAuthTokenProvider> {
    OpenAI::new(StaticAuthTokenProvider::new(
        Credentials::new("sk-test").with_organization("org-test"),
    ))
    .with_base_url(base_url)
}

async fn read_request(socket: &mut TcpStream) -> CapturedRequest {
    let mut buf = Vec::new();
    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let mut chunk = [0u8; 4096];
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed while reading request headers");
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap_or_default().to_owned();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_owned(), value.trim().to_owned()))
        .collect();

    let mut rest = buf[header_end + 4..].to_vec();
    let header = |name: &str| {
        headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    };

    let body = if let Some(length) = header("content-length") {
        let length: usize = length.parse().unwrap();
        while rest.len() < length {
            read_more(socket, &mut rest).await;
        }
        rest.truncate(length);
        rest
    } else if header("transfer-encoding").is_some_and(|te| te.eq_ignore_ascii_case("chunked")) {
        while find(&rest, b"0\r\n\r\n").is_none() {
            read_more(socket, &mut rest).await;
        }
        dechunk(&rest)
    } else {
        Vec::new()
    };

    CapturedRequest {
        request_line,
        headers,
        body,
    }
}

async fn read_more(socket: &mut TcpStream, buf: &mut Vec<u8>) {
    let mut chunk = [0u8; 4096];
    let n = socket.read(&mut chunk).await.unwrap();
    assert!(n > 0, "connection closed while reading request body");
    buf.extend_from_slice(&chunk[..n]);
}

fn dechunk(mut raw: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    while let Some(line_end) = find(raw, b"\r\n") {
        let size_text = String::from_utf8_lossy(&raw[..line_end]);
        let size = usize::from_str_radix(size_text.split(';').next().unwrap().trim(), 16).unwrap();
        if size == 0 {
            break;
        }
        let start = line_end + 2;
        body.extend_from_slice(&raw[start..start + size]);
        raw = &raw[start + size + 2..];
    }
    body
}

async fn write_response(socket: &mut TcpStream, response: MockResponse) {
    let reason = reqwest::StatusCode::from_u16(response.status)
        .ok()
        .and_then(|status| status.canonical_reason())
        .unwrap_or("Unknown");
    let head = format!(
        "HTTP/1.1 {} {reason}\r\ncontent-type: {}\r\nconnection: close\r\n\r\n",
        response.status, response.content_type
    );
    if socket.write_all(head.as_bytes()).await.is_err() {
        return;
    }

    for chunk in &response.chunks {
        if socket.write_all(chunk.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
        if !response.chunk_delay.is_zero() {
            tokio::time::sleep(response.chunk_delay).await;
        }
    }

    if response.hold_open {
        // wait for the client to hang up
        let mut sink = [0u8; 1024];
        while matches!(socket.read(&mut sink).await, Ok(n) if n > 0) {}
    }

    let _ = socket.shutdown().await;
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
