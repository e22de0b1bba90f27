// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Drives the command-line program.

use crate::actions::{self, Moderator};
use crate::bot::Bot;
use crate::clock::SystemClock;
use crate::conf::{self, Settings};
use crate::http;
use crate::reddit::{self, RedditService};
use crate::store::{self, TaskStore};
use crate::verification;
use crate::view::Viewable;
use clap::{Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Exit status for errors of any kind.
pub const EXIT_ERROR: u8 = 2;

/// Program configuration.
#[derive(Debug, Parser)]
#[command(version)]
#[command(about = "Verifies and approves members of a subreddit", long_about = None)]
pub struct Config {
    #[command(flatten)]
    verbosity: Verbosity<InfoLevel>,

    /// Path to the configuration file [default: ~/.config/sbmod.toml]
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

impl Config {
    /// The most verbose level of logging requested.
    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.verbosity.log_level_filter()
    }

    /// The configuration file named on the command line, if any.
    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List users who recently commented on the subreddit's newest posts
    Active,

    /// List users who have had posts or comments removed by Reddit
    Admin,

    /// List the subreddit's approved users
    Contributors,

    /// Verify a single user and approve them if they pass
    Verify {
        /// Reddit username
        redditor: String,
    },

    /// Verify and approve users read from stdin, one per line
    FromList,

    /// Answer verification requests sent to the bot's inbox until interrupted
    Run,
}

/// Indicates why the program could not finish.
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] conf::Error),

    /// Reddit could not be reached or refused a request.
    #[error(transparent)]
    Reddit(#[from] reddit::Error),

    /// The task store could not be opened.
    #[error(transparent)]
    Store(#[from] store::Error),

    /// A moderator action failed.
    #[error(transparent)]
    Action(#[from] actions::Error),

    /// Output could not be written.
    #[error("Could not write output: {0}")]
    Output(#[from] io::Error),
}

impl Error {
    fn reddit_error(&self) -> Option<&reddit::Error> {
        match self {
            Error::Reddit(err)
            | Error::Action(actions::Error::Reddit(err))
            | Error::Action(actions::Error::Verification(verification::Error::Reddit(err))) => {
                Some(err)
            }
            _ => None,
        }
    }

    /// True if Reddit refused a request because the bot account lacks a
    /// moderator permission.
    pub fn is_forbidden(&self) -> bool {
        self.reddit_error().is_some_and(reddit::Error::is_forbidden)
    }
}

/// Standard result type for the command-line program.
pub type Result<T> = std::result::Result<T, Error>;

/// How a successful run ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Everything went as planned.
    Success,

    /// The requested account failed verification.
    Unverified,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        match status {
            Status::Success => ExitCode::SUCCESS,
            Status::Unverified => ExitCode::from(1),
        }
    }
}

/// Runs the command-line program.
#[derive(Debug)]
pub struct Runner {
    config: Config,
    settings: Settings,
}

impl Runner {
    /// Creates a new program runner using the given `config`.
    ///
    /// Returns an error if the configuration file cannot be loaded.
    pub fn new(config: Config) -> Result<Runner> {
        let settings = Settings::load(config.config.as_deref())?;
        Ok(Self { config, settings })
    }

    /// Runs the selected subcommand, writing results to `out` and reading
    /// usernames for `from-list` from `input`.
    ///
    /// Authentication happens before anything else, so bad credentials
    /// fail the run before any moderator action is taken.
    pub async fn run(&self, out: &mut impl Write, input: impl BufRead) -> Result<Status> {
        let settings = &self.settings;
        let user_agent = http::user_agent(settings.credentials.username());
        let service = RedditService::connect(
            settings.credentials.clone(),
            settings.endpoints.clone(),
            &user_agent,
        )
        .await?;
        let store = TaskStore::open(&settings.subreddit.database_path()?)?;
        let moderator = Moderator::new(
            &service,
            &settings.subreddit,
            &settings.thresholds,
            &store,
            SystemClock,
        );

        match &self.config.command {
            Command::Active => {
                let tally = moderator.list_active_redditors().await?;
                print(out, &tally.view())?;
            }
            Command::Admin => {
                let tally = moderator.list_redditors_with_admin_removed_items().await?;
                print(out, &tally.view())?;
            }
            Command::Contributors => {
                let contributors = moderator.contributors().await?;
                print(out, &contributors.view())?;
            }
            Command::Verify { redditor } => {
                let (verified, report) = moderator.process_redditor(redditor).await?;
                print(out, &report)?;
                if !verified {
                    return Ok(Status::Unverified);
                }
            }
            Command::FromList => {
                for (username, verified) in moderator.process_redditors_from_list(input).await? {
                    let result = if verified { "verified" } else { "not verified" };
                    log::info!("{username}: {result}");
                }
            }
            Command::Run => Bot::new(moderator, user_agent).run().await,
        }

        Ok(Status::Success)
    }
}

fn print(out: &mut impl Write, text: &str) -> io::Result<()> {
    if !text.is_empty() {
        writeln!(out, "{text}")?;
    }
    Ok(())
}

/// Runs the program against the terminal and returns its exit status.
pub async fn run(config: Config) -> ExitCode {
    let result = match Runner::new(config) {
        Ok(runner) => runner.run(&mut io::stdout().lock(), io::stdin().lock()).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(status) => status.into(),
        Err(err) => {
            log::debug!("{err:?}");
            eprintln!("{err}");
            if err.is_forbidden() {
                eprintln!("The bot account is missing a moderator permission this command needs");
            }
            ExitCode::from(EXIT_ERROR)
        }
    }
}
