// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

use crate::clock::{Clock, DateTime, Utc};
use crate::reddit::error::SUBREDDIT_RATELIMIT;
use crate::reddit::service::{ConversationState, Service};
use crate::reddit::thing::{About, Comment, Conversation, InboxItem, ModAction, ModNote, Submission};
use crate::reddit::{Error, Result};
use log::Log;
use std::collections::HashMap;
use std::fs;
use std::sync::{Mutex, OnceLock};

static LOGGER: OnceLock<RecordingLogger> = OnceLock::new();

/// Keeps every log record so tests can check what was logged, and passes
/// records on to `env_logger` for display.
struct RecordingLogger {
    inner: env_logger::Logger,
    records: Mutex<Vec<(log::Level, String)>>,
}

impl Log for RecordingLogger {
    fn enabled(&self, _metadata: &log::Metadata) -> bool {
        true
    }

    fn log(&self, record: &log::Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
        self.inner.log(record);
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

pub fn do_logging() {
    let logger = LOGGER.get_or_init(|| RecordingLogger {
        inner: env_logger::Builder::new()
            .is_test(true)
            .parse_default_env()
            .build(),
        records: Mutex::default(),
    });
    if log::set_logger(logger).is_ok() {
        log::set_max_level(log::LevelFilter::Trace);
    }
}

/// True if `message` was logged at `level` since logging was set up.
///
/// Tests share one logger, so look for messages unique to the test.
pub fn was_logged(level: log::Level, message: &str) -> bool {
    LOGGER.get().is_some_and(|logger| {
        logger
            .records
            .lock()
            .unwrap()
            .iter()
            .any(|(lvl, msg)| *lvl == level && msg == message)
    })
}

pub fn load_data(file: &str) -> String {
    fs::read_to_string(format!("tests/data/{file}.json")).expect("could not find test data")
}

pub struct FrozenClock {
    datetime: DateTime<Utc>,
}

impl FrozenClock {
    pub fn new(datetime: DateTime<Utc>) -> Self {
        FrozenClock { datetime }
    }

    pub fn at(rfc3339: &str) -> Self {
        let datetime = DateTime::parse_from_rfc3339(rfc3339)
            .expect("invalid date supplied")
            .with_timezone(&Utc);
        Self::new(datetime)
    }
}

impl Default for FrozenClock {
    fn default() -> Self {
        Self::at("2025-05-23T10:13:00-07:00")
    }
}

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        self.datetime
    }
}

/// A write the fake service was asked to perform.
#[derive(Clone, Debug, PartialEq)]
pub enum Write {
    AddContributor(String),
    ConversationReply {
        id: String,
        body: String,
        internal: bool,
    },
    MessageReply {
        fullname: String,
        body: String,
    },
    MarkRead(String),
    Message {
        to: String,
        subject: String,
        body: String,
    },
}

/// An in-memory stand-in for Reddit that records every write.
#[derive(Default)]
pub struct FakeService {
    accounts: HashMap<String, About>,
    comments: HashMap<String, Vec<Comment>>,
    notes: HashMap<String, Vec<ModNote>>,
    moderators: Vec<String>,
    contributors: Mutex<Vec<String>>,
    conversations: Vec<Conversation>,
    inbox: Mutex<Vec<InboxItem>>,
    submissions: Vec<Submission>,
    submission_comments: HashMap<String, Vec<Comment>>,
    mod_log: Vec<ModAction>,
    rate_limits: Mutex<usize>,
    failing_replies: Mutex<usize>,
    writes: Mutex<Vec<Write>>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(mut self, about: About) -> Self {
        self.accounts.insert(about.name().to_lowercase(), about);
        self
    }

    pub fn with_comments(mut self, username: &str, comments: Vec<Comment>) -> Self {
        self.comments.insert(username.to_lowercase(), comments);
        self
    }

    pub fn with_notes(mut self, username: &str, notes: &[&str]) -> Self {
        self.notes.insert(
            username.to_lowercase(),
            notes.iter().map(|t| ModNote::new(*t)).collect(),
        );
        self
    }

    pub fn with_moderators(mut self, moderators: &[&str]) -> Self {
        self.moderators = moderators.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn with_contributors(self, contributors: &[&str]) -> Self {
        *self.contributors.lock().unwrap() = contributors.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_conversations(mut self, conversations: Vec<Conversation>) -> Self {
        self.conversations = conversations;
        self
    }

    pub fn with_inbox(self, items: Vec<InboxItem>) -> Self {
        *self.inbox.lock().unwrap() = items;
        self
    }

    pub fn with_submission(mut self, submission: Submission, comments: Vec<Comment>) -> Self {
        self.submission_comments
            .insert(submission.id().to_string(), comments);
        self.submissions.push(submission);
        self
    }

    pub fn with_mod_log(mut self, actions: Vec<ModAction>) -> Self {
        self.mod_log = actions;
        self
    }

    /// The next `count` contributor adds fail with `SUBREDDIT_RATELIMIT`.
    pub fn with_rate_limits(self, count: usize) -> Self {
        *self.rate_limits.lock().unwrap() = count;
        self
    }

    /// The next `count` message replies fail with a server error.
    pub fn with_failing_replies(self, count: usize) -> Self {
        *self.failing_replies.lock().unwrap() = count;
        self
    }

    /// Delivers another item to the inbox.
    pub fn push_unread(&self, item: InboxItem) {
        self.inbox.lock().unwrap().push(item);
    }

    pub fn set_rate_limits(&self, count: usize) {
        *self.rate_limits.lock().unwrap() = count;
    }

    pub fn writes(&self) -> Vec<Write> {
        self.writes.lock().unwrap().clone()
    }

    pub fn contributor_list(&self) -> Vec<String> {
        self.contributors.lock().unwrap().clone()
    }

    pub fn unread(&self) -> Vec<String> {
        self.inbox
            .lock()
            .unwrap()
            .iter()
            .map(|item| item.fullname().to_string())
            .collect()
    }

    fn record(&self, write: Write) {
        self.writes.lock().unwrap().push(write);
    }
}

impl Service for FakeService {
    async fn about(&self, username: &str) -> Result<About> {
        match self.accounts.get(&username.to_lowercase()) {
            Some(about) => Ok(About::new(
                about.name(),
                about.created_utc(),
                about.is_suspended(),
            )),
            None => Err(Error::NotFound(format!("/user/{username}/about"))),
        }
    }

    async fn comments(&self, username: &str, limit: usize) -> Result<Vec<Comment>> {
        let mut comments = self
            .comments
            .get(&username.to_lowercase())
            .cloned()
            .unwrap_or_default();
        comments.truncate(limit);
        Ok(comments)
    }

    async fn mod_notes(&self, _subreddit: &str, username: &str) -> Result<Vec<ModNote>> {
        Ok(self
            .notes
            .get(&username.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    async fn moderators(&self, _subreddit: &str) -> Result<Vec<String>> {
        Ok(self.moderators.clone())
    }

    async fn contributors(&self, _subreddit: &str) -> Result<Vec<String>> {
        Ok(self.contributor_list())
    }

    async fn add_contributor(&self, _subreddit: &str, username: &str) -> Result<()> {
        {
            let mut rate_limits = self.rate_limits.lock().unwrap();
            if *rate_limits > 0 {
                *rate_limits -= 1;
                return Err(Error::Api {
                    kind: SUBREDDIT_RATELIMIT.to_string(),
                    message: "you are doing that too much".to_string(),
                });
            }
        }
        self.contributors.lock().unwrap().push(username.to_string());
        self.record(Write::AddContributor(username.to_string()));
        Ok(())
    }

    async fn modmail_conversations(
        &self,
        _subreddit: &str,
        _state: ConversationState,
    ) -> Result<Vec<Conversation>> {
        Ok(self.conversations.clone())
    }

    async fn reply_to_conversation(&self, id: &str, body: &str, internal: bool) -> Result<()> {
        self.record(Write::ConversationReply {
            id: id.to_string(),
            body: body.to_string(),
            internal,
        });
        Ok(())
    }

    async fn unread_messages(&self) -> Result<Vec<InboxItem>> {
        Ok(self.inbox.lock().unwrap().clone())
    }

    async fn reply_to_message(&self, fullname: &str, body: &str) -> Result<()> {
        {
            let mut failing = self.failing_replies.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(Error::Http(crate::http::HTTPError::Http(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                )));
            }
        }
        self.record(Write::MessageReply {
            fullname: fullname.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn mark_read(&self, fullname: &str) -> Result<()> {
        self.inbox
            .lock()
            .unwrap()
            .retain(|item| item.fullname() != fullname);
        self.record(Write::MarkRead(fullname.to_string()));
        Ok(())
    }

    async fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.record(Write::Message {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn new_submissions(&self, _subreddit: &str, limit: usize) -> Result<Vec<Submission>> {
        Ok(self.submissions.iter().take(limit).cloned().collect())
    }

    async fn submission_comments(&self, id: &str) -> Result<Vec<Comment>> {
        Ok(self
            .submission_comments
            .get(id)
            .cloned()
            .unwrap_or_default())
    }

    async fn mod_log(&self, _subreddit: &str, moderator: &str) -> Result<Vec<ModAction>> {
        Ok(self
            .mod_log
            .iter()
            .filter(|action| moderator != "a" || action.moderator() != "reddit")
            .cloned()
            .collect())
    }
}
