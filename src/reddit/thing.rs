// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! A "thing" in the Reddit sense.
//!
//! Historically in the Reddit API and its old source code, a "Thing" was
//! any element of the Reddit system: users, posts, comments, etc. This
//! module holds the handful of things a moderator tool needs and the
//! envelopes the API wraps them in.

use crate::clock::{self, DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

fn timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = f64::deserialize(deserializer)?;
    clock::from_timestamp(secs)
        .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}")))
}

fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<f64>::deserialize(deserializer)? {
        Some(secs) => clock::from_timestamp(secs)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp out of range: {secs}"))),
        None => Ok(None),
    }
}

/// A `{"kind": ..., "data": ...}` envelope.
#[derive(Debug, Deserialize)]
pub struct Thing<T> {
    /// Type prefix, such as `t1` for comments.
    pub kind: String,

    /// The thing itself.
    pub data: T,
}

/// A page of things along with the cursor for the next page.
#[derive(Clone, Debug, Deserialize)]
pub struct Listing<T> {
    /// The `Listing` envelope's payload.
    pub data: ListingData<T>,
}

/// Payload of a [`Listing`].
#[derive(Clone, Debug, Deserialize)]
pub struct ListingData<T> {
    /// Fullname of the last item on this page, if there are more pages.
    pub after: Option<String>,

    /// Items on this page.
    pub children: Vec<T>,
}

impl<T> Listing<T> {
    /// Cursor for the next page.
    pub fn after(&self) -> Option<&str> {
        self.data.after.as_deref()
    }

    /// Consumes the listing, returning its items.
    pub fn into_children(self) -> Vec<T> {
        self.data.children
    }
}

/// Reddit user account data, as returned by `/user/<name>/about`.
#[derive(Debug, Deserialize)]
pub struct About {
    name: String,

    #[serde(default, deserialize_with = "optional_timestamp")]
    created_utc: Option<DateTime<Utc>>,

    #[serde(default)]
    is_suspended: bool,
}

impl About {
    /// Creates account data; mostly useful for tests and fakes.
    pub fn new(
        name: impl Into<String>,
        created_utc: Option<DateTime<Utc>>,
        is_suspended: bool,
    ) -> Self {
        Self {
            name: name.into(),
            created_utc,
            is_suspended,
        }
    }

    /// The account's username.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The date on which the account was created.
    ///
    /// Suspended accounts do not expose a creation date.
    pub fn created_utc(&self) -> Option<DateTime<Utc>> {
        self.created_utc
    }

    /// True if Reddit has suspended the account.
    pub fn is_suspended(&self) -> bool {
        self.is_suspended
    }
}

/// A Reddit comment.
#[derive(Clone, Debug, Deserialize)]
pub struct Comment {
    id: String,

    #[serde(default)]
    author: String,

    subreddit: String,

    #[serde(default)]
    score: i64,

    #[serde(deserialize_with = "timestamp")]
    created_utc: DateTime<Utc>,

    #[serde(default)]
    replies: Replies,
}

impl Comment {
    /// Creates a comment with no replies; mostly useful for tests and fakes.
    pub fn new(
        id: impl Into<String>,
        author: impl Into<String>,
        subreddit: impl Into<String>,
        score: i64,
        created_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            subreddit: subreddit.into(),
            score,
            created_utc,
            replies: Replies::default(),
        }
    }

    /// The comment's ID, without a type prefix.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The comment's author, or `[deleted]`.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// The subreddit the comment was posted in, without the `r/` prefix.
    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }

    /// The comment's score.
    pub fn score(&self) -> i64 {
        self.score
    }

    /// The date on which the comment was posted.
    pub fn created_utc(&self) -> DateTime<Utc> {
        self.created_utc
    }

    /// Flattens this comment and all of its loaded replies into a list,
    /// parents before children.
    ///
    /// "Load more" stubs are dropped.
    pub fn flatten(self) -> Vec<Comment> {
        let mut comments = Vec::new();
        let mut stack = vec![self];
        while let Some(mut comment) = stack.pop() {
            let replies = std::mem::take(&mut comment.replies).into_comments();
            comments.push(comment);
            stack.extend(replies.into_iter().rev());
        }
        comments
    }
}

/// Replies attached to a comment in a comment tree.
///
/// Reddit sends an empty string when a comment has no replies.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum Replies {
    /// A listing of replies.
    Listing(Listing<CommentNode>),

    /// No replies; usually `""`.
    Empty(serde_json::Value),
}

impl Default for Replies {
    fn default() -> Self {
        Replies::Empty(serde_json::Value::Null)
    }
}

impl Replies {
    fn into_comments(self) -> Vec<Comment> {
        match self {
            Replies::Listing(listing) => CommentNode::comments(listing.into_children()),
            Replies::Empty(_) => Vec::new(),
        }
    }
}

/// One node in a comment tree: either a comment or a "load more" stub.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum CommentNode {
    /// A loaded comment.
    #[serde(rename = "t1")]
    Comment(Comment),

    /// A "load more comments" stub.
    #[serde(rename = "more")]
    More(serde_json::Value),
}

impl CommentNode {
    /// Flattens a list of top-level nodes into every loaded comment.
    pub fn comments(nodes: Vec<CommentNode>) -> Vec<Comment> {
        nodes
            .into_iter()
            .filter_map(|node| match node {
                CommentNode::Comment(comment) => Some(comment),
                CommentNode::More(_) => None,
            })
            .flat_map(Comment::flatten)
            .collect()
    }
}

/// A Reddit post.
#[derive(Clone, Debug, Deserialize)]
pub struct Submission {
    id: String,
    subreddit: String,

    #[serde(deserialize_with = "timestamp")]
    created_utc: DateTime<Utc>,
}

impl Submission {
    /// Creates a post; mostly useful for tests and fakes.
    pub fn new(
        id: impl Into<String>,
        subreddit: impl Into<String>,
        created_utc: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subreddit: subreddit.into(),
            created_utc,
        }
    }

    /// The post's ID, without a type prefix.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The subreddit the post was submitted to.
    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }

    /// The date on which the post was submitted.
    pub fn created_utc(&self) -> DateTime<Utc> {
        self.created_utc
    }
}

/// A moderator note attached to a user.
#[derive(Clone, Debug, Deserialize)]
pub struct ModNote {
    #[serde(rename = "type")]
    note_type: String,
}

impl ModNote {
    /// Creates a note of the given type.
    pub fn new(note_type: impl Into<String>) -> Self {
        Self {
            note_type: note_type.into(),
        }
    }

    /// The kind of note, such as `BAN`, `MUTE`, or `NOTE`.
    pub fn note_type(&self) -> &str {
        &self.note_type
    }
}

/// A page of mod notes.
#[derive(Debug, Deserialize)]
pub struct ModNotePage {
    /// Notes on this page.
    #[serde(default)]
    pub mod_notes: Vec<ModNote>,

    /// Cursor to pass as `before` for the next page.
    pub end_cursor: Option<String>,

    /// True if there are more pages.
    #[serde(default)]
    pub has_next_page: bool,
}

/// A participant in a modmail conversation.
#[derive(Clone, Debug, Deserialize)]
pub struct ConversationAuthor {
    /// The participant's username.
    pub name: String,
}

/// A modmail conversation.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    id: String,

    #[serde(default)]
    subject: String,

    #[serde(default)]
    authors: Vec<ConversationAuthor>,

    #[serde(default)]
    num_messages: u32,
}

impl Conversation {
    /// Creates a conversation; mostly useful for tests and fakes.
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        authors: &[&str],
        num_messages: u32,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            authors: authors
                .iter()
                .map(|name| ConversationAuthor {
                    name: name.to_string(),
                })
                .collect(),
            num_messages,
        }
    }

    /// The conversation's ID.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The conversation's subject line.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Number of messages in the conversation, including internal notes.
    pub fn num_messages(&self) -> u32 {
        self.num_messages
    }

    /// True if `username` has participated in the conversation.
    ///
    /// Usernames are compared case-insensitively.
    pub fn has_author(&self, username: &str) -> bool {
        self.authors
            .iter()
            .any(|author| author.name.eq_ignore_ascii_case(username))
    }
}

/// A page of modmail conversations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationPage {
    /// Conversations keyed by ID.
    #[serde(default)]
    pub conversations: HashMap<String, Conversation>,

    /// Conversation IDs in display order.
    #[serde(default)]
    pub conversation_ids: Vec<String>,
}

impl ConversationPage {
    /// Consumes the page, returning its conversations in display order.
    pub fn into_ordered(mut self) -> Vec<Conversation> {
        self.conversation_ids
            .iter()
            .filter_map(|id| self.conversations.remove(id))
            .collect()
    }
}

/// A private message or comment reply in the bot's inbox.
#[derive(Clone, Debug, Deserialize)]
pub struct InboxItem {
    name: String,

    #[serde(default)]
    author: Option<String>,

    #[serde(default)]
    subject: String,

    #[serde(default)]
    body: String,

    #[serde(default)]
    was_comment: bool,
}

impl InboxItem {
    /// Creates an inbox item; mostly useful for tests and fakes.
    pub fn new(
        name: impl Into<String>,
        author: Option<&str>,
        subject: impl Into<String>,
        body: impl Into<String>,
        was_comment: bool,
    ) -> Self {
        Self {
            name: name.into(),
            author: author.map(String::from),
            subject: subject.into(),
            body: body.into(),
            was_comment,
        }
    }

    /// The item's fullname, such as `t4_2abcd`.
    pub fn fullname(&self) -> &str {
        &self.name
    }

    /// The sender, if the sender is a user rather than a subreddit or Reddit itself.
    pub fn author(&self) -> Option<&str> {
        self.author.as_deref()
    }

    /// The message subject.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The message body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// True if the item is a reply to a comment or post rather than a
    /// private message.
    pub fn was_comment(&self) -> bool {
        self.was_comment
    }
}

/// An entry in a subreddit's moderation log.
#[derive(Clone, Debug, Deserialize)]
pub struct ModAction {
    action: String,

    #[serde(rename = "mod", default)]
    moderator: String,

    #[serde(default)]
    target_author: Option<String>,
}

impl ModAction {
    /// Creates a log entry; mostly useful for tests and fakes.
    pub fn new(
        action: impl Into<String>,
        moderator: impl Into<String>,
        target_author: Option<&str>,
    ) -> Self {
        Self {
            action: action.into(),
            moderator: moderator.into(),
            target_author: target_author.map(String::from),
        }
    }

    /// The action taken, such as `removecomment`.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The moderator who took the action.
    pub fn moderator(&self) -> &str {
        &self.moderator
    }

    /// The author of the item acted on, if any.
    pub fn target_author(&self) -> Option<&str> {
        self.target_author.as_deref().filter(|name| !name.is_empty())
    }

    /// True if the action removed a post or comment.
    pub fn is_removal(&self) -> bool {
        matches!(
            self.action.as_str(),
            "removelink" | "removecomment" | "spamlink" | "spamcomment"
        )
    }
}

/// A user in a moderator or contributor list.
#[derive(Clone, Debug, Deserialize)]
pub struct UserRelation {
    /// The user's name.
    pub name: String,
}

/// Errors attached to the response of a POST made with `api_type=json`.
#[derive(Debug, Default, Deserialize)]
pub struct JsonResponse {
    /// The response's `json` object.
    #[serde(default)]
    pub json: JsonErrors,
}

/// The `json` object of a [`JsonResponse`].
#[derive(Debug, Default, Deserialize)]
pub struct JsonErrors {
    /// `[error_type, message, field]` triples.
    #[serde(default)]
    pub errors: Vec<Vec<serde_json::Value>>,
}

impl JsonResponse {
    /// The first error as `(error_type, message)`, if there is one.
    pub fn first_error(&self) -> Option<(String, String)> {
        let error = self.json.errors.first()?;
        let text = |i: usize| {
            error
                .get(i)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };
        Some((text(0), text(1)))
    }
}
