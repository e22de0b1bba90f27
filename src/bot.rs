// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! The inbox bot.
//!
//! Moderators send the bot a private message with the subject `verify` and
//! a username as the body. The bot verifies the account and acts on the
//! result. While the inbox is quiet, the bot retries approved-user adds
//! that Reddit rate limited earlier.

use crate::actions::{self, Moderator, seconds_to_next_hour};
use crate::clock::Clock;
use crate::reddit::Service;
use crate::reddit::thing::InboxItem;
use indoc::formatdoc;
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tokio::signal;
use tokio::time::{self, Instant};

/// How long to wait between inbox checks when the inbox is empty.
pub const POLL_INTERVAL: Duration = Duration::from_secs(4);

/// How long to back off after an error.
pub const EXCEPTION_SLEEP_TIME: Duration = Duration::from_secs(60);

/// How many queued tasks to attempt each time the inbox is empty.
pub const QUEUED_TASK_LIMIT: usize = 20;

/// How many failed inbox items to remember.
pub const FAILED_ITEM_LIMIT: usize = 301;

const VALID_COMMAND: &str = "verify";

/// Fullnames of the most recent items that could not be handled.
///
/// Once full, remembering a new item forgets the oldest one.
#[derive(Debug)]
struct FailedItems {
    names: HashSet<String>,
    order: VecDeque<String>,
    limit: usize,
}

impl FailedItems {
    fn new(limit: usize) -> Self {
        Self {
            names: HashSet::new(),
            order: VecDeque::new(),
            limit,
        }
    }

    fn contains(&self, fullname: &str) -> bool {
        self.names.contains(fullname)
    }

    fn insert(&mut self, fullname: &str) {
        if !self.names.insert(fullname.to_string()) {
            return;
        }
        self.order.push_back(fullname.to_string());
        if self.order.len() > self.limit
            && let Some(oldest) = self.order.pop_front()
        {
            self.names.remove(&oldest);
        }
    }
}

/// Answers moderators' verification requests.
pub struct Bot<'a, S, C> {
    moderator: Moderator<'a, S, C>,
    user_agent: String,
    moderators: Option<Vec<String>>,
    next_task_time: Option<Instant>,
    failed: FailedItems,
    poll_interval: Duration,
    exception_sleep: Duration,
}

impl<'a, S: Service, C: Clock> Bot<'a, S, C> {
    /// Creates a bot that acts through `moderator`.
    ///
    /// `user_agent` identifies the bot in error reports and logs.
    pub fn new(moderator: Moderator<'a, S, C>, user_agent: impl Into<String>) -> Self {
        Self {
            moderator,
            user_agent: user_agent.into(),
            moderators: None,
            next_task_time: None,
            failed: FailedItems::new(FAILED_ITEM_LIMIT),
            poll_interval: POLL_INTERVAL,
            exception_sleep: EXCEPTION_SLEEP_TIME,
        }
    }

    /// Overrides how long the bot waits when idle and after errors.
    pub fn with_intervals(mut self, poll_interval: Duration, exception_sleep: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.exception_sleep = exception_sleep;
        self
    }

    async fn is_moderator(&mut self, username: &str) -> actions::Result<bool> {
        if self.moderators.is_none() {
            let moderators = self
                .moderator
                .service()
                .moderators(&self.moderator.subreddit().name)
                .await?;
            log::debug!("cached {} moderators", moderators.len());
            self.moderators = Some(moderators);
        }
        Ok(self
            .moderators
            .iter()
            .flatten()
            .any(|name| name.eq_ignore_ascii_case(username)))
    }

    /// Handles a single private message.
    pub async fn handle_message(&mut self, message: &InboxItem) -> actions::Result<()> {
        let author = message.author().unwrap_or_default();
        if !self.is_moderator(author).await? {
            log::info!("ignoring message from non-moderator user {author}");
            return Ok(());
        }

        let service = self.moderator.service();

        let subject = message.subject().trim();
        if subject != VALID_COMMAND {
            log::info!("invalid subject {subject:?} from {author}");
            let reply = format!("`{subject}` is not a valid command. Try `{VALID_COMMAND}`.");
            service.reply_to_message(message.fullname(), &reply).await?;
            return Ok(());
        }

        let body = message.body().trim();
        if body.split_whitespace().count() != 1 {
            log::info!("invalid body {body:?} from {author}");
            service
                .reply_to_message(
                    message.fullname(),
                    "Message body must contain only a username",
                )
                .await?;
            return Ok(());
        }

        let username = strip_user_prefix(body);
        log::info!("processing {username} ...");
        service
            .reply_to_message(message.fullname(), &format!("processing {username} ..."))
            .await?;
        self.moderator.process_redditor(username).await?;
        Ok(())
    }

    /// Retries up to `limit` queued approved-user adds.
    ///
    /// Does nothing until the top of the hour after the last rate limit.
    pub async fn handle_queued_tasks(&mut self, limit: usize) -> actions::Result<()> {
        if self
            .next_task_time
            .is_some_and(|next_time| next_time > Instant::now())
        {
            return Ok(());
        }

        for _ in 0..limit {
            let Some(task) = self.moderator.store().next_task()? else {
                log::info!("There are no queued tasks.");
                return Ok(());
            };

            log::info!("Attempting to add {} from saved task", task.username);
            if self
                .moderator
                .add_contributor(&task.username, &task.report, false)
                .await?
            {
                self.moderator.store().delete(&task.username)?;
            } else {
                let seconds = seconds_to_next_hour(self.moderator.clock());
                self.next_task_time = Some(Instant::now() + Duration::from_secs(seconds));
                log::info!("Next add contributor attempt in {seconds} seconds");
                break;
            }
        }
        Ok(())
    }

    async fn handle_item(&mut self, item: &InboxItem) -> actions::Result<()> {
        if item.was_comment() {
            return Ok(self.moderator.service().mark_read(item.fullname()).await?);
        }

        if let Err(err) = self.handle_message(item).await {
            log::error!("Exception processing the following item:\n{item:#?}\n{err}");
            self.failed.insert(item.fullname());
            self.report_exception(&err, item).await;
            time::sleep(self.exception_sleep).await;
            return Ok(());
        }

        Ok(self.moderator.service().mark_read(item.fullname()).await?)
    }

    async fn report_exception(&self, err: &actions::Error, item: &InboxItem) {
        let message = formatdoc! {"
            Exception
            {err}
            Item:
            {item:#?}"}
        .replace('\n', "\n\n");
        let subject = format!("{} exception", self.user_agent);
        let to = &self.moderator.subreddit().exception_user;
        if let Err(err) = self
            .moderator
            .service()
            .send_message(to, &subject, &message)
            .await
        {
            log::error!("could not notify u/{to} of the exception: {err}");
        }
    }

    /// Checks the inbox once.
    ///
    /// Items that failed before stay unread but are not handled again. An
    /// inbox with nothing new is used to catch up on queued tasks, followed
    /// by a short wait.
    pub async fn poll(&mut self) -> actions::Result<()> {
        let items: Vec<InboxItem> = self
            .moderator
            .service()
            .unread_messages()
            .await?
            .into_iter()
            .filter(|item| !self.failed.contains(item.fullname()))
            .collect();
        if items.is_empty() {
            self.handle_queued_tasks(QUEUED_TASK_LIMIT).await?;
            time::sleep(self.poll_interval).await;
            return Ok(());
        }

        for item in &items {
            self.handle_item(item).await?;
        }
        Ok(())
    }

    /// Runs until interrupted with Ctrl-C.
    ///
    /// Errors talking to Reddit are logged and retried after a pause.
    pub async fn run(&mut self) {
        log::info!("Waiting for inbox messages");
        let shutdown = signal::ctrl_c();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                result = self.poll() => {
                    if let Err(err) = result {
                        log::error!(
                            "{err} in run. Sleeping for {} seconds.",
                            self.exception_sleep.as_secs()
                        );
                        tokio::select! {
                            _ = &mut shutdown => break,
                            _ = time::sleep(self.exception_sleep) => {}
                        }
                    }
                }
            }
        }

        log::info!("{} stopped gracefully", self.user_agent);
    }
}

/// Strips a leading `u/` or `/u/` from a username, ignoring case.
fn strip_user_prefix(mut name: &str) -> &str {
    for prefix in ["u/", "/u/"] {
        if name
            .get(..prefix.len())
            .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
        {
            name = &name[prefix.len()..];
        }
    }
    name
}
