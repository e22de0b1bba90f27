// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Authentication for the Reddit API.
//!
//! Moderator tools run as a "script" app, which trades the account's
//! username and password for a short-lived bearer token.

use crate::http::{self, HTTPError};
use crate::reddit::error::{Error, Result};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Tokens are refreshed this long before Reddit says they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Credentials for a Reddit script app and the account it acts as.
#[derive(Clone)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
    username: String,
    password: String,
}

impl Credentials {
    /// Creates a new set of credentials.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            username: username.into(),
            password: password.into(),
        }
    }

    /// The script app's client ID.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The account the tool acts as.
    ///
    /// # Examples
    ///
    /// ```
    /// use sbmod::reddit::Credentials;
    /// let creds = Credentials::new("id", "secret", "sbmodbot", "hunter2");
    /// assert_eq!(creds.username(), "sbmodbot");
    /// ```
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A bearer token along with the moment it stops being useful.
#[derive(Clone)]
pub struct Token {
    value: String,
    expires_at: Instant,
}

impl Token {
    /// Creates a token that expires `expires_in` from now.
    pub fn new(value: impl Into<String>, expires_in: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + expires_in,
        }
    }

    /// The raw token.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// True if the token can still be used without refreshing it.
    pub fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<u64>,
    error: Option<String>,
}

/// Exchanges `credentials` for a bearer token at `auth_url`
/// (normally `https://www.reddit.com`).
///
/// Reddit answers bad client credentials with HTTP 401 and a bad username
/// or password with HTTP 200 and an `error` field; both become
/// [`Error::Auth`].
pub async fn request_token(
    client: &Client,
    auth_url: &str,
    credentials: &Credentials,
) -> Result<Token> {
    log::debug!(
        "requesting access token for u/{} from {auth_url}",
        credentials.username
    );

    let resp = client
        .post(format!("{auth_url}/api/v1/access_token"))
        .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
        .form(&[
            ("grant_type", "password"),
            ("username", credentials.username.as_str()),
            ("password", credentials.password.as_str()),
        ])
        .send()
        .await
        .map_err(HTTPError::from)?;

    if matches!(
        resp.status(),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
    ) {
        return Err(Error::Auth(format!(
            "client ID or secret rejected (HTTP {})",
            resp.status()
        )));
    }

    let body = http::json_body(resp).await?;
    let token: TokenResponse = serde_json::from_str(&body)?;
    match token {
        TokenResponse {
            error: Some(error), ..
        } => Err(Error::Auth(error)),
        TokenResponse {
            access_token: Some(value),
            expires_in,
            ..
        } => Ok(Token::new(
            value,
            Duration::from_secs(expires_in.unwrap_or(3600)),
        )),
        _ => Err(Error::Auth("no access token in response".to_string())),
    }
}
