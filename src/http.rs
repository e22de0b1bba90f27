// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Shared plumbing for talking to HTTP APIs.

use reqwest::{Client, ClientBuilder, StatusCode, header};
use thiserror::Error;

/// An appropriate user agent to use when making HTTP requests.
///
/// Reddit asks that bots identify themselves and their operator, so the
/// moderator account's username is folded into the agent string.
///
/// # Examples
///
/// ```
/// let agent = sbmod::http::user_agent("sbmodbot");
/// assert!(agent.starts_with("sbmod v"));
/// assert!(agent.ends_with("by u/sbmodbot"));
/// ```
pub fn user_agent(operator: &str) -> String {
    format!(
        "{} v{} by u/{operator}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    )
}

/// Builds an HTTP client that sends the given user agent.
pub fn client(user_agent: &str) -> HTTPResult<Client> {
    let client = ClientBuilder::new()
        .user_agent(user_agent)
        .build()
        .map_err(HTTPError::Client)?;
    Ok(client)
}

/// Checks that a response is successful and carries a JSON body, then
/// returns the body as text.
pub async fn json_body(resp: reqwest::Response) -> HTTPResult<String> {
    let status = resp.status();
    if !status.is_success() {
        return Err(HTTPError::Http(status));
    }

    let content_type = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .ok_or(HTTPError::MissingContentType)?
        .to_str()?;
    if !content_type.starts_with("application/json") {
        return Err(HTTPError::UnexpectedContentType(content_type.to_string()));
    }

    Ok(resp.text().await?)
}

/// The result of an HTTP request.
pub type HTTPResult<T> = Result<T, HTTPError>;

/// Indicates an error has occurred when making an HTTP call.
#[derive(Debug, Error)]
pub enum HTTPError {
    /// The HTTP client itself could not be built.
    #[error("Could not create HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// An error that occurred while making an HTTP request or reading its body.
    #[error("Error while making HTTP request: {0}")]
    Request(#[from] reqwest::Error),

    /// An unsuccessful HTTP status code in an HTTP response.
    #[error("Request returned HTTP {0}")]
    Http(StatusCode),

    /// A missing Content-Type header in a response.
    #[error("Missing Content-Type header")]
    MissingContentType,

    /// An invalid Content-Type header.
    #[error("Invalid Content-Type header value: {0}")]
    InvalidContentType(#[from] header::ToStrError),

    /// A Content-Type that is not understood by the service.
    #[error("Unexpected content type: {0}")]
    UnexpectedContentType(String),

    /// A response body that could not be deserialized.
    #[error("Could not parse response body: {0}")]
    Parse(#[from] serde_json::Error),
}

impl HTTPError {
    /// The HTTP status of the failed response, if the server sent one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HTTPError::Http(status) => Some(*status),
            HTTPError::Request(err) => err.status(),
            _ => None,
        }
    }
}
