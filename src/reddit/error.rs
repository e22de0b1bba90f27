// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Errors returned by the Reddit API.

use crate::http::HTTPError;
use reqwest::StatusCode;
use thiserror::Error;

/// Reddit's error code for subreddit-level rate limiting of moderator actions.
pub const SUBREDDIT_RATELIMIT: &str = "SUBREDDIT_RATELIMIT";

/// An error talking to Reddit.
#[derive(Debug, Error)]
pub enum Error {
    /// Reddit refused to issue an access token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The requested user, subreddit, or conversation does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reddit accepted the request but reported an error for it.
    #[error("Reddit API error {kind}: {message}")]
    Api {
        /// Reddit's error code, such as `SUBREDDIT_RATELIMIT`.
        kind: String,

        /// Human-readable explanation.
        message: String,
    },

    /// The API base URL cannot have paths appended to it.
    #[error("Invalid Reddit API URL: {0}")]
    Endpoint(String),

    /// The HTTP request itself failed.
    #[error(transparent)]
    Http(#[from] HTTPError),
}

impl Error {
    /// True if Reddit is rate limiting moderator actions on the subreddit.
    pub fn is_subreddit_ratelimit(&self) -> bool {
        matches!(self, Error::Api { kind, .. } if kind == SUBREDDIT_RATELIMIT)
    }

    /// True if the account lacks the moderator permissions the request needs.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Error::Http(err) if err.status() == Some(StatusCode::FORBIDDEN))
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Http(HTTPError::Parse(error))
    }
}

/// The result of a Reddit API call.
pub type Result<T> = std::result::Result<T, Error>;
