// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Reddit API clients and services for communicating with Reddit over HTTPS.

pub mod auth;
pub mod error;
pub mod service;
pub mod thing;

pub use auth::Credentials;
pub use error::{Error, Result};
pub use service::{RedditService, Service};
