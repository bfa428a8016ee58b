//! Network transport for downloads.

use std::io::{ErrorKind, Read};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_LENGTH};

use courier_core::PrimitiveError;

/// Code reported when the transport itself fails (DNS, TLS, timeout...).
const TRANSPORT_FAILURE: i32 = -1;

/// What a body-less request learned about a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeInfo {
    pub status: u16,
    /// `None` when the server did not say.
    pub content_length: Option<u64>,
    /// Name from `Content-Disposition`, else from the final URL.
    pub filename: Option<String>,
}

/// Whether the transfer should keep going after a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkControl {
    Continue,
    Abort,
}

/// How a body transfer ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOutcome {
    pub status: u16,
    /// The chunk callback asked to stop.
    pub aborted: bool,
}

/// Fetches resources for the download driver.
pub trait Transport: Send + Sync {
    /// Ask for headers only.
    fn probe(&self, url: &str) -> Result<ProbeInfo, PrimitiveError>;

    /// Stream the body through `on_chunk`.
    fn fetch(
        &self,
        url: &str,
        on_chunk: &mut dyn FnMut(&[u8]) -> ChunkControl,
    ) -> Result<FetchOutcome, PrimitiveError>;
}

/// [`Transport`] over HTTP(S) using a blocking reqwest client.
///
/// The client is built per call so it is always created and dropped on the
/// worker thread that uses it.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    user_agent: String,
    connect_timeout: Duration,
    chunk_size: usize,
}

impl HttpTransport {
    pub fn new(user_agent: impl Into<String>, connect_timeout: Duration, chunk_size: usize) -> Self {
        Self {
            user_agent: user_agent.into(),
            connect_timeout,
            chunk_size: chunk_size.max(1),
        }
    }

    fn client(&self) -> Result<Client, PrimitiveError> {
        Client::builder()
            .user_agent(self.user_agent.clone())
            .connect_timeout(self.connect_timeout)
            .timeout(None::<Duration>)
            .build()
            .map_err(transport_error)
    }
}

fn transport_error(err: reqwest::Error) -> PrimitiveError {
    PrimitiveError::new(TRANSPORT_FAILURE, err.to_string())
}

fn header_str<'a>(response: &'a Response, name: reqwest::header::HeaderName) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}

impl Transport for HttpTransport {
    fn probe(&self, url: &str) -> Result<ProbeInfo, PrimitiveError> {
        let response = self.client()?.head(url).send().map_err(transport_error)?;

        let content_length = header_str(&response, CONTENT_LENGTH).and_then(|v| v.trim().parse().ok());
        let filename = header_str(&response, CONTENT_DISPOSITION)
            .and_then(filename_from_content_disposition)
            .or_else(|| filename_from_url(response.url().as_str()));

        Ok(ProbeInfo {
            status: response.status().as_u16(),
            content_length,
            filename,
        })
    }

    fn fetch(
        &self,
        url: &str,
        on_chunk: &mut dyn FnMut(&[u8]) -> ChunkControl,
    ) -> Result<FetchOutcome, PrimitiveError> {
        let mut response = self.client()?.get(url).send().map_err(transport_error)?;
        let status = response.status().as_u16();

        let mut buf = vec![0u8; self.chunk_size];
        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(PrimitiveError::new(TRANSPORT_FAILURE, e.to_string())),
            };
            if on_chunk(&buf[..n]) == ChunkControl::Abort {
                return Ok(FetchOutcome {
                    status,
                    aborted: true,
                });
            }
        }

        Ok(FetchOutcome {
            status,
            aborted: false,
        })
    }
}

/// Pull the `filename=` parameter out of a `Content-Disposition` value.
///
/// Quotes are stripped, any directory part (either separator) is dropped and
/// the name is cut at the first CR or LF.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let mut rest = value;
    let raw = loop {
        let start = rest.find(|c: char| c.is_ascii_alphabetic())?;
        rest = &rest[start..];
        if let Some(after) = rest.strip_prefix("filename=") {
            break after;
        }
        let next = rest.find(';')?;
        rest = &rest[next + 1..];
    };

    let (body, stop) = match raw.chars().next() {
        Some(quote @ ('"' | '\'')) => (&raw[1..], quote),
        _ => (raw, ';'),
    };
    let name = body.split(stop).next().unwrap_or(body);
    let name = name.rsplit('/').next().unwrap_or(name);
    let name = name.rsplit('\\').next().unwrap_or(name);
    let name = name.split(['\r', '\n']).next().unwrap_or(name).trim();

    (!name.is_empty()).then(|| name.to_string())
}

/// Last path segment of a URL, ignoring query and fragment.
pub fn filename_from_url(url: &str) -> Option<String> {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    let path = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest.split_once('/').map_or("", |(_, p)| p));
    let name = path.rsplit('/').next().unwrap_or("");
    (!name.is_empty()).then(|| name.to_string())
}
