// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Decides whether a Redditor may become an approved user of the
//! subreddit, and explains why in a report moderators can read.
//!
//! An account is checked in three stages, stopping at the first failure:
//!
//! 1. The account must exist, must not be suspended, and must be older
//!    than the minimum account age.
//! 2. The subreddit's moderators must not have banned or muted it.
//! 3. It must have commented in the subreddit early enough, and if its
//!    first comment there is fairly recent, its comments there must
//!    average at least one point.

use crate::clock::{self, Clock, DateTime, TimeDelta, Utc};
use crate::conf::Thresholds;
use crate::count::Tally;
use crate::reddit::service::{MAX_LISTING, Service};
use crate::reddit::thing::Comment;
use counter::Counter;
use itertools::Itertools;
use thiserror::Error;

/// An error raised while verifying an account.
#[derive(Debug, Error)]
pub enum Error {
    /// A report was requested before [`Verification::verify()`] finished.
    #[error("verify hasn't been called yet")]
    NotVerified,

    /// The minimum account age reaches back before any representable date.
    #[error("Minimum account age of {0} days is out of range")]
    AccountAge(u32),

    /// Reddit could not be queried.
    #[error(transparent)]
    Reddit(#[from] crate::reddit::Error),
}

/// Standard result type for verification.
pub type Result<T> = std::result::Result<T, Error>;

/// The verification of a single account.
#[derive(Debug)]
pub struct Verification<'a> {
    username: String,
    subreddit: &'a str,
    thresholds: &'a Thresholds,
    verified: Option<bool>,
    error: Option<String>,
    created: Option<DateTime<Utc>>,
    comments: Vec<Comment>,
    found_comments: usize,
    karma: i64,
    karma_average: f64,
    note_types: Counter<String>,
    subreddits: Tally,
}

impl<'a> Verification<'a> {
    /// Prepares to verify `username` for `subreddit`.
    pub fn new(username: impl Into<String>, subreddit: &'a str, thresholds: &'a Thresholds) -> Self {
        Self {
            username: username.into(),
            subreddit,
            thresholds,
            verified: None,
            error: None,
            created: None,
            comments: Vec::new(),
            found_comments: 0,
            karma: 0,
            karma_average: 0.0,
            note_types: Counter::new(),
            subreddits: Tally::ignoring_case(),
        }
    }

    /// Why verification failed, once it has.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Runs every check and returns true if the account passed.
    ///
    /// Failing a check is not an error; only problems talking to Reddit are.
    pub async fn verify<S: Service>(&mut self, service: &S, clock: &impl Clock) -> Result<bool> {
        let verified = self.check_status(service, clock).await?
            && self.check_notes(service).await?
            && self.check_comments(service).await?;
        self.verified = Some(verified);
        Ok(verified)
    }

    async fn check_status<S: Service>(&mut self, service: &S, clock: &impl Clock) -> Result<bool> {
        let about = match service.about(&self.username).await {
            Ok(about) => about,
            Err(crate::reddit::Error::NotFound(_)) => {
                return Ok(self.fail("is not found. No history information available."));
            }
            Err(err) => return Err(err.into()),
        };

        if about.is_suspended() {
            return Ok(self.fail("is suspended. No history information available."));
        }

        let Some(created) = about.created_utc() else {
            return Ok(self.fail("is not found. No history information available."));
        };
        self.created = Some(created);

        let days = self.thresholds.minimum_account_age_days;
        let cutoff = TimeDelta::try_days(days.into())
            .and_then(|age| clock.now().checked_sub_signed(age))
            .ok_or(Error::AccountAge(days))?;
        if created > cutoff {
            let created = self.display(&created);
            return Ok(self.fail(format!(
                "was created too recently ({created}). Skipped history collection."
            )));
        }
        Ok(true)
    }

    async fn check_notes<S: Service>(&mut self, service: &S) -> Result<bool> {
        log::debug!("fetching mod notes for {}", self.username);
        for note in service.mod_notes(self.subreddit, &self.username).await? {
            *self.note_types.entry(note.note_type().to_string()).or_insert(0) += 1;
        }

        let bans = self.note_count("BAN");
        if bans > 0 {
            return Ok(self.fail(format!("has {bans} ban(s). Skipped history collection.")));
        }
        let mutes = self.note_count("MUTE");
        if mutes > 0 {
            return Ok(self.fail(format!("has {mutes} mute(s). Skipped history collection.")));
        }
        Ok(true)
    }

    async fn check_comments<S: Service>(&mut self, service: &S) -> Result<bool> {
        log::info!("fetching comments for {}", self.username);
        for comment in service.comments(&self.username, MAX_LISTING).await? {
            self.found_comments += 1;
            self.subreddits.add(comment.subreddit());
            if comment.subreddit().eq_ignore_ascii_case(self.subreddit) {
                self.comments.push(comment);
            }
        }
        self.comments.sort_by_key(Comment::created_utc);

        let Some(oldest) = self.comments.first().map(Comment::created_utc) else {
            return Ok(self.fail(format!("has no r/{} history.", self.subreddit)));
        };

        if oldest > self.thresholds.positive_karma_date {
            let oldest = self.display(&oldest);
            return Ok(self.fail(format!(
                "oldest r/{} comment is too recent ({oldest})",
                self.subreddit
            )));
        }

        self.karma = self.comments.iter().map(Comment::score).sum();
        self.karma_average = self.karma as f64 / self.comments.len() as f64;

        if oldest > self.thresholds.history_date && self.karma_average < 1.0 {
            return Ok(self.fail("too low of karma average"));
        }
        Ok(true)
    }

    fn fail(&mut self, error: impl Into<String>) -> bool {
        self.error = Some(error.into());
        false
    }

    fn note_count(&self, note_type: &str) -> usize {
        self.note_types.get(note_type).copied().unwrap_or(0)
    }

    fn display(&self, date: &DateTime<Utc>) -> String {
        clock::display(date, self.thresholds.timezone)
    }

    /// A Reddit-markdown report of the verification.
    ///
    /// Failed verifications produce a short explanation; successful ones
    /// produce the account's history as an indented code block.
    pub fn report(&self) -> Result<String> {
        match self.verified {
            None => Err(Error::NotVerified),
            Some(true) => Ok(self.results()),
            Some(false) => Ok(format!(
                "u/{}: verification fail\n\nAccount {}",
                self.username,
                self.error.as_deref().unwrap_or_default()
            )),
        }
    }

    fn results(&self) -> String {
        let mut lines = Vec::new();
        lines.push(format!("                User: {}", self.username));
        if let Some(created) = &self.created {
            lines.push(format!("             Created: {}", self.display(created)));
        }
        lines.push(format!("Commented subreddits: {}", self.subreddits.len()));

        let to_show = self.thresholds.subreddits_to_show;
        let mut top_subreddits = self.subreddits.most_common();
        if self.subreddits.len() > to_show {
            top_subreddits.truncate(to_show);
            lines.push(format!("   Top {to_show} subreddits:"));
        }
        for (subreddit, count) in top_subreddits {
            lines.push(format!("                      - {subreddit} ({count} comments)"));
        }

        lines.push(format!("Total comments found: {}", self.found_comments));
        lines.push(String::new());
        lines.push(format!("r/{} specific", self.subreddit));
        lines.push(format!("            Comments: {}", self.comments.len()));

        if let (Some(oldest), Some(newest)) = (self.comments.first(), self.comments.last()) {
            lines.push(format!("       Comment karma: {}", self.karma));
            lines.push(format!("       Average karma: {:.2}", self.karma_average));
            lines.push(format!(
                "      Newest comment: {}",
                self.display(&newest.created_utc())
            ));
            lines.push(format!(
                "      Oldest comment: {}",
                self.display(&oldest.created_utc())
            ));
        }

        for (note_type, count) in self.note_types.iter().sorted() {
            lines.push(format!("{note_type:>14} count: {count}"));
        }

        lines
            .iter()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("    {line}")
                }
            })
            .join("\n")
    }
}
