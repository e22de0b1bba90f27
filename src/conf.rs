// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Configuration file and environment handling.
//!
//! Settings live in a TOML file, `~/.config/sbmod.toml` by default. Only
//! the `[credentials]` table is required, and any credential can instead
//! come from the environment:
//!
//! ```toml
//! [credentials]
//! client_id = "script app id"
//! client_secret = "script app secret"
//! username = "sbmodbot"
//! password = "hunter2"
//!
//! [subreddit]
//! name = "santabarbara"
//! bot = "sbmodbot"
//!
//! [verification]
//! minimum_account_age_days = 14
//! timezone = "America/Los_Angeles"
//! ```

use crate::clock::{self, DateTime, NaiveDate, Tz};
use crate::reddit::Credentials;
use crate::reddit::service::Endpoints;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::{env, fs, io};
use thiserror::Error;

/// Environment variable naming an alternate configuration file.
pub const CONFIG_ENV: &str = "SBMOD_CONFIG";

const CREDENTIAL_ENVS: [(&str, &str); 4] = [
    ("client_id", "SBMOD_CLIENT_ID"),
    ("client_secret", "SBMOD_CLIENT_SECRET"),
    ("username", "SBMOD_USERNAME"),
    ("password", "SBMOD_PASSWORD"),
];

/// Indicates a problem loading the configuration.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration file could not be read.
    #[error("Could not read {}: {source}", path.display())]
    Io {
        /// The file that could not be read.
        path: PathBuf,

        /// The underlying I/O error.
        source: io::Error,
    },

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("Invalid configuration in {}: {source}", path.display())]
    Parse {
        /// The file that could not be parsed.
        path: PathBuf,

        /// The underlying TOML error.
        source: toml::de::Error,
    },

    /// A credential is in neither the file nor the environment.
    #[error("Missing credential `{field}`: set it in [credentials] or ${env}")]
    MissingCredential {
        /// Key in the `[credentials]` table.
        field: &'static str,

        /// Environment variable that can supply it instead.
        env: &'static str,
    },

    /// An environment variable is set but is not valid Unicode.
    #[error("Environment error for ${name}: {source}")]
    Env {
        /// The variable's name.
        name: &'static str,

        /// The underlying error.
        source: env::VarError,
    },

    /// The timezone is not in the IANA database.
    #[error("Unknown timezone: {0}")]
    Timezone(String),

    /// The home directory could not be determined.
    #[error("Could not determine home directory")]
    NoHome,
}

/// Standard result type for configuration loading.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CredentialsTable {
    client_id: Option<String>,
    client_secret: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl CredentialsTable {
    fn field(&mut self, name: &str) -> &mut Option<String> {
        match name {
            "client_id" => &mut self.client_id,
            "client_secret" => &mut self.client_secret,
            "username" => &mut self.username,
            _ => &mut self.password,
        }
    }

    /// Fills in or overrides credentials from the environment, then
    /// insists that every credential is present.
    fn resolve(mut self) -> Result<Credentials> {
        for (field, name) in CREDENTIAL_ENVS {
            match env::var(name) {
                Ok(value) => *self.field(field) = Some(value),
                Err(env::VarError::NotPresent) => {}
                Err(source) => return Err(Error::Env { name, source }),
            }
            if self.field(field).as_deref().is_none_or(str::is_empty) {
                return Err(Error::MissingCredential { field, env: name });
            }
        }

        Ok(Credentials::new(
            self.client_id.unwrap_or_default(),
            self.client_secret.unwrap_or_default(),
            self.username.unwrap_or_default(),
            self.password.unwrap_or_default(),
        ))
    }
}

/// Which subreddit is moderated and who to talk to about it.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SubredditSettings {
    /// The subreddit, without `r/`.
    pub name: String,

    /// The bot account that opens the "request to join" modmail.
    pub bot: String,

    /// Who gets a private message when the bot hits an error.
    pub exception_user: String,

    /// Modmail conversation where failed verifications are reported.
    pub failed_verification_conversation: String,

    /// SQLite file holding deferred tasks.
    pub database: Option<PathBuf>,
}

impl Default for SubredditSettings {
    fn default() -> Self {
        Self {
            name: "santabarbara".to_string(),
            bot: "sbmodbot".to_string(),
            exception_user: "bboe".to_string(),
            failed_verification_conversation: "2i4snm".to_string(),
            database: None,
        }
    }
}

impl SubredditSettings {
    /// The SQLite file for deferred tasks, `~/.config/sbmod.db` unless set.
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(expand_home(path)?),
            None => Ok(dirs::home_dir()
                .ok_or(Error::NoHome)?
                .join(".config")
                .join("sbmod.db")),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct VerificationTable {
    minimum_account_age_days: u32,
    history_date: NaiveDate,
    positive_karma_date: NaiveDate,
    subreddits_to_show: usize,
    timezone: String,
}

/// Comments older than this do not count toward an account's history.
const HISTORY_DATE: NaiveDate = date(2024, 11, 5);

/// Comments older than this do not count toward an account's karma.
const POSITIVE_KARMA_DATE: NaiveDate = date(2025, 1, 20);

const fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => date,
        None => panic!("invalid built-in date"),
    }
}

impl Default for VerificationTable {
    fn default() -> Self {
        Self {
            minimum_account_age_days: 14,
            history_date: HISTORY_DATE,
            positive_karma_date: POSITIVE_KARMA_DATE,
            subreddits_to_show: 10,
            timezone: "America/Los_Angeles".to_string(),
        }
    }
}

/// Thresholds an account must meet to be verified.
#[derive(Clone, Debug, PartialEq)]
pub struct Thresholds {
    /// Accounts younger than this many days are rejected.
    pub minimum_account_age_days: u32,

    /// Accounts whose first comment in the subreddit came after this date
    /// need an average comment score of at least one.
    pub history_date: DateTime<Tz>,

    /// Accounts whose first comment in the subreddit came after this date
    /// are rejected outright.
    pub positive_karma_date: DateTime<Tz>,

    /// How many subreddits to list in a report.
    pub subreddits_to_show: usize,

    /// Timezone used for the dates above and for reports.
    pub timezone: Tz,
}

#[cfg(test)]
impl Default for Thresholds {
    fn default() -> Self {
        VerificationTable::default()
            .resolve()
            .expect("built-in verification table should resolve")
    }
}

impl VerificationTable {
    fn resolve(self) -> Result<Thresholds> {
        let timezone: Tz = self
            .timezone
            .parse()
            .map_err(|_| Error::Timezone(self.timezone.clone()))?;
        let midnight = |date: NaiveDate| {
            clock::midnight(date, timezone).ok_or_else(|| Error::Timezone(self.timezone.clone()))
        };
        Ok(Thresholds {
            minimum_account_age_days: self.minimum_account_age_days,
            history_date: midnight(self.history_date)?,
            positive_karma_date: midnight(self.positive_karma_date)?,
            subreddits_to_show: self.subreddits_to_show,
            timezone,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ApiTable {
    auth_url: Option<String>,
    api_url: Option<String>,
}

impl ApiTable {
    fn resolve(self) -> Endpoints {
        let defaults = Endpoints::default();
        Endpoints::new(
            self.auth_url
                .unwrap_or_else(|| defaults.auth_url().to_string()),
            self.api_url
                .unwrap_or_else(|| defaults.api_url().to_string()),
        )
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    credentials: CredentialsTable,
    subreddit: SubredditSettings,
    verification: VerificationTable,
    api: ApiTable,
}

/// Fully resolved program settings.
#[derive(Debug)]
pub struct Settings {
    /// Who to authenticate as.
    pub credentials: Credentials,

    /// The moderated subreddit.
    pub subreddit: SubredditSettings,

    /// Verification rules.
    pub thresholds: Thresholds,

    /// Reddit API base URLs.
    pub endpoints: Endpoints,
}

impl Settings {
    /// Loads settings from `path`, or from `$SBMOD_CONFIG`, or from
    /// `~/.config/sbmod.toml`, in that order of preference.
    ///
    /// A missing default file is not an error as long as the environment
    /// supplies every credential.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match env::var_os(CONFIG_ENV) {
                Some(path) => Self::from_file(Path::new(&path)),
                None => {
                    let path = default_path()?;
                    if path.exists() {
                        Self::from_file(&path)
                    } else {
                        log::debug!("{} does not exist; using defaults", path.display());
                        Self::parse("", &path)
                    }
                }
            },
        }
    }

    /// Loads settings from a specific file.
    pub fn from_file(path: &Path) -> Result<Self> {
        log::debug!("loading configuration from {}", path.display());
        let text = fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text, path)
    }

    fn parse(text: &str, path: &Path) -> Result<Self> {
        let file: FileConfig = toml::from_str(text).map_err(|source| Error::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            credentials: file.credentials.resolve()?,
            subreddit: file.subreddit,
            thresholds: file.verification.resolve()?,
            endpoints: file.api.resolve(),
        })
    }
}

/// `~/.config/sbmod.toml`.
pub fn default_path() -> Result<PathBuf> {
    Ok(dirs::home_dir()
        .ok_or(Error::NoHome)?
        .join(".config")
        .join("sbmod.toml"))
}

fn expand_home(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(dirs::home_dir().ok_or(Error::NoHome)?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}
