// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! Moderator actions built on top of the Reddit service.
//!
//! Every action runs against a single subreddit through a [`Moderator`],
//! which bundles the service, the subreddit's settings, the task store,
//! and a clock.

use crate::clock::Clock;
use crate::conf::{SubredditSettings, Thresholds};
use crate::count::Tally;
use crate::reddit::service::{ConversationState, MAX_LISTING, Service};
use crate::store::{self, TaskStore};
use crate::verification::{self, Verification};
use chrono::Timelike;
use std::io::{self, BufRead};
use thiserror::Error;

/// Authors Reddit uses for comments whose account is gone.
const DELETED_AUTHORS: [&str; 2] = ["", "[deleted]"];

/// An error raised while carrying out a moderator action.
#[derive(Debug, Error)]
pub enum Error {
    /// Reddit rejected a request or could not be reached.
    #[error(transparent)]
    Reddit(#[from] crate::reddit::Error),

    /// An account could not be verified.
    #[error(transparent)]
    Verification(#[from] verification::Error),

    /// The task store failed.
    #[error(transparent)]
    Store(#[from] store::Error),

    /// A list of usernames could not be read.
    #[error("Could not read usernames: {0}")]
    Io(#[from] io::Error),
}

/// Standard result type for moderator actions.
pub type Result<T> = std::result::Result<T, Error>;

/// Seconds until the top of the next hour, when Reddit's hourly limit on
/// adding approved users resets.
///
/// Always between 1 and 3600; fractions of a second are ignored.
pub fn seconds_to_next_hour(clock: &impl Clock) -> u64 {
    let now = clock.now();
    3600 - u64::from(now.minute()) * 60 - u64::from(now.second())
}

/// Carries out moderator actions on a subreddit.
pub struct Moderator<'a, S, C> {
    service: &'a S,
    subreddit: &'a SubredditSettings,
    thresholds: &'a Thresholds,
    store: &'a TaskStore,
    clock: C,
}

impl<'a, S: Service, C: Clock> Moderator<'a, S, C> {
    /// Creates a new moderator.
    pub fn new(
        service: &'a S,
        subreddit: &'a SubredditSettings,
        thresholds: &'a Thresholds,
        store: &'a TaskStore,
        clock: C,
    ) -> Self {
        Self {
            service,
            subreddit,
            thresholds,
            store,
            clock,
        }
    }

    /// The service used to reach Reddit.
    pub fn service(&self) -> &S {
        self.service
    }

    /// The moderated subreddit's settings.
    pub fn subreddit(&self) -> &SubredditSettings {
        self.subreddit
    }

    /// Queue of deferred work.
    pub fn store(&self) -> &TaskStore {
        self.store
    }

    /// The moderator's clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Verifies `username` and acts on the result.
    ///
    /// Verified accounts are added as approved users. Failed verifications
    /// are reported to the failed-verification modmail conversation.
    /// Returns whether the account was verified along with the report.
    pub async fn process_redditor(&self, username: &str) -> Result<(bool, String)> {
        let mut verification = Verification::new(username, &self.subreddit.name, self.thresholds);
        let verified = verification.verify(self.service, &self.clock).await?;
        let report = verification.report()?;

        if verified {
            log::info!("u/{username} passed verification");
            self.add_contributor(username, &report, true).await?;
        } else {
            log::info!(
                "u/{username} failed verification: {}",
                verification.error().unwrap_or_default()
            );
            self.service
                .reply_to_conversation(
                    &self.subreddit.failed_verification_conversation,
                    &report,
                    false,
                )
                .await?;
        }

        Ok((verified, report))
    }

    /// Adds `username` as an approved user and attaches `report` to the
    /// modmail conversation in which they asked to join.
    ///
    /// Returns false if Reddit's rate limit prevented the add, in which case
    /// the add is queued for later if `save_to_db_on_failure` is set.
    pub async fn add_contributor(
        &self,
        username: &str,
        report: &str,
        save_to_db_on_failure: bool,
    ) -> Result<bool> {
        let subreddit = &self.subreddit.name;

        match self.service.add_contributor(subreddit, username).await {
            Ok(()) => log::info!("added u/{username} as an approved user of r/{subreddit}"),
            Err(err) if err.is_subreddit_ratelimit() => {
                log::info!("rate limited adding u/{username} to r/{subreddit}");
                if save_to_db_on_failure {
                    match self.store.insert(username, report) {
                        Ok(()) => log::info!("queued adding u/{username} for later"),
                        Err(store::Error::Duplicate(_)) => {
                            log::info!("adding u/{username} is already queued")
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                return Ok(false);
            }
            Err(err) => return Err(err.into()),
        }

        let conversations = self
            .service
            .modmail_conversations(subreddit, ConversationState::All)
            .await?;
        let request = conversations.iter().find(|conversation| {
            conversation.has_author(username)
                && conversation.has_author(&self.subreddit.bot)
                && conversation.num_messages() == 1
        });

        match request {
            Some(conversation) => {
                log::debug!(
                    "posting report for u/{username} to conversation {} ({:?})",
                    conversation.id(),
                    conversation.subject()
                );
                self.service
                    .reply_to_conversation(conversation.id(), report, true)
                    .await?;
            }
            None => log::info!("Failed to locate add contributor message for {username}:\n{report}"),
        }

        Ok(true)
    }

    /// Processes every username in `reader`, one per line.
    ///
    /// Blank lines and accounts that are already approved users are
    /// skipped. Returns each processed username with its verification
    /// result.
    pub async fn process_redditors_from_list(
        &self,
        reader: impl BufRead,
    ) -> Result<Vec<(String, bool)>> {
        let contributors = self.contributors().await?;
        let mut results = Vec::new();

        for line in reader.lines() {
            let line = line?;
            let username = line.trim();
            if username.is_empty() {
                continue;
            }
            if contributors
                .iter()
                .any(|name| name.eq_ignore_ascii_case(username))
            {
                log::info!("u/{username} is already an approved user");
                continue;
            }

            let (verified, _) = self.process_redditor(username).await?;
            results.push((username.to_string(), verified));
        }

        Ok(results)
    }

    /// Counts comments per author across the subreddit's newest posts.
    pub async fn list_active_redditors(&self) -> Result<Tally> {
        let subreddit = &self.subreddit.name;
        let submissions = self.service.new_submissions(subreddit, MAX_LISTING).await?;
        log::info!("counting commenters in {} posts", submissions.len());

        let mut tally = Tally::new();
        for submission in submissions {
            for comment in self.service.submission_comments(submission.id()).await? {
                if !DELETED_AUTHORS.contains(&comment.author()) {
                    tally.add(comment.author());
                }
            }
        }
        Ok(tally)
    }

    /// Counts, per author, the posts and comments Reddit's admins removed.
    pub async fn list_redditors_with_admin_removed_items(&self) -> Result<Tally> {
        let actions = self.service.mod_log(&self.subreddit.name, "a").await?;
        Ok(actions
            .iter()
            .filter(|action| action.is_removal())
            .filter_map(|action| action.target_author())
            .collect())
    }

    /// Every approved user of the subreddit.
    pub async fn contributors(&self) -> Result<Vec<String>> {
        Ok(self.service.contributors(&self.subreddit.name).await?)
    }
}
