// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

//! HTTPS connector for the Reddit API.
//!
//! Service structures in this module provide a low-level way to interact
//! with the Reddit API over HTTPS, essentially a specialized HTTPS client
//! specifically for moderating a subreddit.

use crate::http::{self, HTTPError};
use crate::reddit::auth::{self, Credentials, Token};
use crate::reddit::error::{Error, Result};
use crate::reddit::thing::{
    About, Comment, CommentNode, Conversation, ConversationPage, InboxItem, JsonResponse, Listing,
    ModAction, ModNote, ModNotePage, Submission, Thing, UserRelation,
};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::sync::{Mutex, PoisonError};

/// Reddit never returns more than this many items from a listing, no matter
/// how many pages are requested.
pub const MAX_LISTING: usize = 1000;

const PAGE_SIZE: usize = 100;

/// Which modmail conversations to list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConversationState {
    /// Every conversation except those that were archived.
    #[default]
    All,

    /// Conversations nobody has replied to yet.
    New,

    /// Conversations a moderator has replied to.
    InProgress,

    /// Archived conversations.
    Archived,
}

impl ConversationState {
    /// The value Reddit expects in the `state` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationState::All => "all",
            ConversationState::New => "new",
            ConversationState::InProgress => "inprogress",
            ConversationState::Archived => "archived",
        }
    }
}

/// A service for moderating a subreddit.
///
/// Using this trait, clients can implement different ways of connecting
/// to the Reddit API, such as an actual connector for production code,
/// and an in-memory fake for testing purposes.
pub trait Service: Send + Sync {
    /// Account information for `username`.
    ///
    /// Returns [`Error::NotFound`] if the account does not exist.
    fn about(&self, username: &str) -> impl Future<Output = Result<About>> + Send;

    /// Up to `limit` of the user's newest comments, newest first.
    fn comments(
        &self,
        username: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// Every mod note the subreddit's moderators have attached to `username`.
    fn mod_notes(
        &self,
        subreddit: &str,
        username: &str,
    ) -> impl Future<Output = Result<Vec<ModNote>>> + Send;

    /// Usernames of the subreddit's moderators.
    fn moderators(&self, subreddit: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Usernames of the subreddit's approved users.
    fn contributors(&self, subreddit: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Makes `username` an approved user of the subreddit.
    fn add_contributor(
        &self,
        subreddit: &str,
        username: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// The subreddit's modmail conversations in the given state, most
    /// recently active first.
    fn modmail_conversations(
        &self,
        subreddit: &str,
        state: ConversationState,
    ) -> impl Future<Output = Result<Vec<Conversation>>> + Send;

    /// Replies to a modmail conversation, optionally as a private
    /// moderator note.
    fn reply_to_conversation(
        &self,
        id: &str,
        body: &str,
        internal: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Unread items in the authenticated account's inbox.
    fn unread_messages(&self) -> impl Future<Output = Result<Vec<InboxItem>>> + Send;

    /// Replies to an inbox item identified by its fullname.
    fn reply_to_message(
        &self,
        fullname: &str,
        body: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Marks an inbox item as read.
    fn mark_read(&self, fullname: &str) -> impl Future<Output = Result<()>> + Send;

    /// Sends a private message.
    fn send_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Up to `limit` of the subreddit's newest posts, newest first.
    fn new_submissions(
        &self,
        subreddit: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Submission>>> + Send;

    /// Every loaded comment on a post, with "load more" stubs dropped.
    fn submission_comments(&self, id: &str) -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// Moderation log entries made by `moderator` (`a` means Reddit admins).
    fn mod_log(
        &self,
        subreddit: &str,
        moderator: &str,
    ) -> impl Future<Output = Result<Vec<ModAction>>> + Send;
}

/// Base URLs for the Reddit API.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    auth_url: String,
    api_url: String,
}

impl Endpoints {
    /// Creates a new set of endpoints; trailing slashes are ignored.
    pub fn new(auth_url: impl Into<String>, api_url: impl Into<String>) -> Self {
        let trim = |url: String| url.trim_end_matches('/').to_string();
        Self {
            auth_url: trim(auth_url.into()),
            api_url: trim(api_url.into()),
        }
    }

    /// Where access tokens are requested.
    pub fn auth_url(&self) -> &str {
        &self.auth_url
    }

    /// Where authenticated API calls are sent.
    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new("https://www.reddit.com", "https://oauth.reddit.com")
    }
}

/// A service that contacts the Reddit API directly.
#[derive(Debug)]
pub struct RedditService {
    client: Client,
    endpoints: Endpoints,
    api_base: Url,
    credentials: Credentials,
    token: Mutex<Option<Token>>,
}

impl RedditService {
    /// Authenticates with Reddit and returns a connected service.
    ///
    /// Authentication happens up front so that bad credentials are
    /// reported before anything else is attempted.
    pub async fn connect(
        credentials: Credentials,
        endpoints: Endpoints,
        user_agent: &str,
    ) -> Result<Self> {
        let api_base = Url::parse(endpoints.api_url())
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| Error::Endpoint(endpoints.api_url().to_string()))?;
        let client = http::client(user_agent)?;
        let token = auth::request_token(&client, endpoints.auth_url(), &credentials).await?;
        log::info!("authenticated as u/{}", credentials.username());
        Ok(Self {
            client,
            endpoints,
            api_base,
            credentials,
            token: Mutex::new(Some(token)),
        })
    }

    fn cached_token(&self) -> Option<String> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|token| token.is_fresh())
            .map(|token| token.value().to_string())
    }

    fn invalidate_token(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.cached_token() {
            return Ok(token);
        }
        let token =
            auth::request_token(&self.client, self.endpoints.auth_url(), &self.credentials).await?;
        let value = token.value().to_string();
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(value)
    }

    async fn attempt(
        &self,
        method: &Method,
        url: &Url,
        query: &[(&str, String)],
        form: Option<&[(&str, &str)]>,
    ) -> Result<Response> {
        let token = self.access_token().await?;
        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .bearer_auth(token)
            .query(&[("raw_json", "1")])
            .query(query);
        if let Some(form) = form {
            request = request.form(form);
        }
        Ok(request.send().await.map_err(HTTPError::from)?)
    }

    async fn send(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, String)],
        form: Option<&[(&str, &str)]>,
    ) -> Result<String> {
        let url = endpoint_url(&self.api_base, path);
        log::debug!("{method} {}", url.path());

        let mut resp = self.attempt(&method, &url, query, form).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            log::debug!("access token rejected; requesting a new one");
            self.invalidate_token();
            resp = self.attempt(&method, &url, query, form).await?;
        }

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(url.path().to_string()));
        }
        Ok(http::json_body(resp).await?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &[&str], query: &[(&str, String)]) -> Result<T> {
        let body = self.send(Method::GET, path, query, None).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn post(&self, path: &[&str], form: &[(&str, &str)]) -> Result<()> {
        let body = self.send(Method::POST, path, &[], Some(form)).await?;
        let resp: JsonResponse = serde_json::from_str(&body)?;
        match resp.first_error() {
            Some((kind, message)) => Err(Error::Api { kind, message }),
            None => Ok(()),
        }
    }

    /// Follows `after` cursors until `limit` items are collected or the
    /// listing runs out.
    async fn paginate<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, String)],
        limit: usize,
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut after: Option<String> = None;

        while items.len() < limit {
            let mut params = query.to_vec();
            params.push(("limit", PAGE_SIZE.min(limit - items.len()).to_string()));
            if let Some(after) = &after {
                params.push(("after", after.clone()));
            }

            let page: Listing<T> = self.get(path, &params).await?;
            after = page.after().map(String::from);
            let children = page.into_children();
            if children.is_empty() {
                break;
            }
            items.extend(children);
            if after.is_none() {
                break;
            }
        }

        items.truncate(limit);
        Ok(items)
    }
}

/// Appends `segments` to `base`, percent-encoding each one so that names
/// cannot add path components or a query string.
fn endpoint_url(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

impl Service for RedditService {
    async fn about(&self, username: &str) -> Result<About> {
        let about: Thing<About> = self.get(&["user", username, "about"], &[]).await?;
        Ok(about.data)
    }

    async fn comments(&self, username: &str, limit: usize) -> Result<Vec<Comment>> {
        let query = [("sort", "new".to_string())];
        let things: Vec<Thing<Comment>> = self
            .paginate(&["user", username, "comments"], &query, limit)
            .await?;
        Ok(things.into_iter().map(|thing| thing.data).collect())
    }

    async fn mod_notes(&self, subreddit: &str, username: &str) -> Result<Vec<ModNote>> {
        let mut notes = Vec::new();
        let mut before: Option<String> = None;

        loop {
            let mut query = vec![
                ("subreddit", subreddit.to_string()),
                ("user", username.to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(before) = &before {
                query.push(("before", before.clone()));
            }

            let page: ModNotePage = self.get(&["api", "mod", "notes"], &query).await?;
            notes.extend(page.mod_notes);
            match page.end_cursor {
                Some(cursor) if page.has_next_page => before = Some(cursor),
                _ => break,
            }
        }

        Ok(notes)
    }

    async fn moderators(&self, subreddit: &str) -> Result<Vec<String>> {
        let list: Listing<UserRelation> = self
            .get(&["r", subreddit, "about", "moderators"], &[])
            .await?;
        Ok(list.into_children().into_iter().map(|m| m.name).collect())
    }

    async fn contributors(&self, subreddit: &str) -> Result<Vec<String>> {
        let users: Vec<UserRelation> = self
            .paginate(&["r", subreddit, "about", "contributors"], &[], usize::MAX)
            .await?;
        Ok(users.into_iter().map(|user| user.name).collect())
    }

    async fn add_contributor(&self, subreddit: &str, username: &str) -> Result<()> {
        self.post(
            &["r", subreddit, "api", "friend"],
            &[
                ("api_type", "json"),
                ("name", username),
                ("type", "contributor"),
            ],
        )
        .await
    }

    async fn modmail_conversations(
        &self,
        subreddit: &str,
        state: ConversationState,
    ) -> Result<Vec<Conversation>> {
        let mut conversations = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let mut query = vec![
                ("entity", subreddit.to_string()),
                ("state", state.as_str().to_string()),
                ("sort", "recent".to_string()),
                ("limit", PAGE_SIZE.to_string()),
            ];
            if let Some(after) = &after {
                query.push(("after", after.clone()));
            }

            let page: ConversationPage = self.get(&["api", "mod", "conversations"], &query).await?;
            let batch = page.into_ordered();
            let full_page = batch.len() >= PAGE_SIZE;
            after = batch.last().map(|c| c.id().to_string());
            conversations.extend(batch);
            if !full_page || after.is_none() {
                break;
            }
        }

        Ok(conversations)
    }

    async fn reply_to_conversation(&self, id: &str, body: &str, internal: bool) -> Result<()> {
        let internal = if internal { "true" } else { "false" };
        let form = [
            ("body", body),
            ("isAuthorHidden", "false"),
            ("isInternal", internal),
        ];
        self.send(
            Method::POST,
            &["api", "mod", "conversations", id],
            &[],
            Some(&form[..]),
        )
        .await?;
        Ok(())
    }

    async fn unread_messages(&self) -> Result<Vec<InboxItem>> {
        let query = [("mark", "false".to_string())];
        let things: Vec<Thing<InboxItem>> =
            self.paginate(&["message", "unread"], &query, MAX_LISTING).await?;
        Ok(things.into_iter().map(|thing| thing.data).collect())
    }

    async fn reply_to_message(&self, fullname: &str, body: &str) -> Result<()> {
        self.post(
            &["api", "comment"],
            &[("api_type", "json"), ("thing_id", fullname), ("text", body)],
        )
        .await
    }

    async fn mark_read(&self, fullname: &str) -> Result<()> {
        self.post(&["api", "read_message"], &[("id", fullname)]).await
    }

    async fn send_message(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        self.post(
            &["api", "compose"],
            &[
                ("api_type", "json"),
                ("to", to),
                ("subject", subject),
                ("text", body),
            ],
        )
        .await
    }

    async fn new_submissions(&self, subreddit: &str, limit: usize) -> Result<Vec<Submission>> {
        let things: Vec<Thing<Submission>> = self
            .paginate(&["r", subreddit, "new"], &[], limit)
            .await?;
        Ok(things.into_iter().map(|thing| thing.data).collect())
    }

    async fn submission_comments(&self, id: &str) -> Result<Vec<Comment>> {
        let query = [("limit", "500".to_string())];
        let (_, comments): (Listing<serde_json::Value>, Listing<CommentNode>) =
            self.get(&["comments", id], &query).await?;
        Ok(CommentNode::comments(comments.into_children()))
    }

    async fn mod_log(&self, subreddit: &str, moderator: &str) -> Result<Vec<ModAction>> {
        let query = [("mod", moderator.to_string())];
        let things: Vec<Thing<ModAction>> = self
            .paginate(&["r", subreddit, "about", "log"], &query, MAX_LISTING)
            .await?;
        Ok(things.into_iter().map(|thing| thing.data).collect())
    }
}
