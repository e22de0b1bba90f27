// SPDX-License-Identifier: Apache-2.0
// Copyright (C) 2026 sbmod contributors

use httpmock::prelude::*;
use sbmod::reddit::service::{ConversationState, Endpoints};
use sbmod::reddit::{Credentials, Error, RedditService, Service};
use serde_json::{Value, json};
use std::fs;

const USER_AGENT: &str = "sbmod-test v0.0.0 by u/sbmodbot";

fn load_data(file: &str) -> Value {
    let text = fs::read_to_string(format!("tests/data/{file}.json")).expect("could not find test data");
    serde_json::from_str(&text).expect("invalid test data")
}

fn credentials() -> Credentials {
    Credentials::new("app-id", "app-secret", "sbmodbot", "hunter2")
}

fn endpoints(server: &MockServer) -> Endpoints {
    Endpoints::new(server.base_url(), server.base_url())
}

async fn token_mock(server: &MockServer) -> httpmock::Mock<'_> {
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/access_token")
                .body_contains("grant_type=password")
                .body_contains("username=sbmodbot");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(json!({
                    "access_token": "tok",
                    "token_type": "bearer",
                    "expires_in": 86400,
                    "scope": "*"
                }));
        })
        .await
}

async fn connect(server: &MockServer) -> RedditService {
    RedditService::connect(credentials(), endpoints(server), USER_AGENT)
        .await
        .expect("could not connect")
}

mod auth {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn it_authenticates_with_a_password_grant() {
        let server = MockServer::start_async().await;
        let token = token_mock(&server).await;
        connect(&server).await;
        token.assert_async().await;
    }

    #[tokio::test]
    async fn it_rejects_bad_client_credentials() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/access_token");
                then.status(401)
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "Unauthorized", "error": 401}));
            })
            .await;

        let err = RedditService::connect(credentials(), endpoints(&server), USER_AGENT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(_)), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn it_rejects_bad_passwords() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/access_token");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"error": "invalid_grant"}));
            })
            .await;

        let err = RedditService::connect(credentials(), endpoints(&server), USER_AGENT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Auth(ref message) if message == "invalid_grant"));
    }

    #[tokio::test]
    async fn it_sends_the_bearer_token_and_raw_json() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        let about = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/user/sb_local/about")
                    .header("authorization", "Bearer tok")
                    .header("user-agent", USER_AGENT)
                    .query_param("raw_json", "1");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(load_data("about_active"));
            })
            .await;

        let service = connect(&server).await;
        let account = service.about("sb_local").await.unwrap();
        about.assert_async().await;
        assert_eq!(account.name(), "sb_local");
        assert_eq!(account.created_utc().unwrap().timestamp(), 1577836800);
    }

    #[tokio::test]
    async fn it_fetches_a_fresh_token_after_a_401() {
        let server = MockServer::start_async().await;
        let first_token = token_mock(&server).await;
        let service = connect(&server).await;
        first_token.delete_async().await;

        let fresh_token = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/v1/access_token");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "access_token": "tok2",
                        "token_type": "bearer",
                        "expires_in": 86400,
                        "scope": "*"
                    }));
            })
            .await;
        let stale = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/user/sb_local/about")
                    .header("authorization", "Bearer tok");
                then.status(401)
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "Unauthorized", "error": 401}));
            })
            .await;
        let fresh = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/user/sb_local/about")
                    .header("authorization", "Bearer tok2");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(load_data("about_active"));
            })
            .await;

        let account = service.about("sb_local").await.unwrap();
        stale.assert_async().await;
        fresh_token.assert_async().await;
        fresh.assert_async().await;
        assert_eq!(account.name(), "sb_local");
    }

    #[tokio::test]
    async fn it_rejects_an_unusable_api_url() {
        let server = MockServer::start_async().await;
        let endpoints = Endpoints::new(server.base_url(), "not a url");
        let err = RedditService::connect(credentials(), endpoints, USER_AGENT)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Endpoint(ref url) if url == "not a url"));
    }
}

fn without_query_param(req: &HttpMockRequest, name: &str) -> bool {
    req.query_params
        .as_ref()
        .is_none_or(|params| params.iter().all(|(key, _)| key != name))
}

fn without_before(req: &HttpMockRequest) -> bool {
    without_query_param(req, "before")
}

fn without_after(req: &HttpMockRequest) -> bool {
    without_query_param(req, "after")
}

fn conversation_page(ids: &[String]) -> Value {
    let conversations: serde_json::Map<String, Value> = ids
        .iter()
        .map(|id| {
            let conversation = json!({
                "id": id,
                "subject": "Request to join r/SantaBarbara",
                "numMessages": 1,
                "authors": [{"name": format!("user_{id}")}]
            });
            (id.clone(), conversation)
        })
        .collect();
    json!({
        "conversations": conversations,
        "conversationIds": ids,
        "messages": {}
    })
}

mod reads {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn it_reports_missing_accounts() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/user/ghost/about");
                then.status(404)
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "Not Found", "error": 404}));
            })
            .await;

        let service = connect(&server).await;
        let err = service.about("ghost").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(ref path) if path == "/user/ghost/about"));
    }

    #[tokio::test]
    async fn it_follows_listing_cursors() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/user/sb_local/comments")
                    .query_param("sort", "new")
                    .query_param("limit", "5");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(load_data("comments_sb_local"));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/user/sb_local/comments")
                    .query_param("limit", "2")
                    .query_param("after", "t1_c3");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "kind": "Listing",
                        "data": {"after": null, "children": []}
                    }));
            })
            .await;

        let service = connect(&server).await;
        let comments = service.comments("sb_local", 5).await.unwrap();
        first.assert_async().await;
        second.assert_async().await;

        let ids: Vec<&str> = comments.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3"]);
    }

    #[tokio::test]
    async fn it_reads_mod_notes() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/mod/notes")
                    .query_param("subreddit", "santabarbara")
                    .query_param("user", "sb_local");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(load_data("mod_notes"));
            })
            .await;

        let service = connect(&server).await;
        let notes = service.mod_notes("santabarbara", "sb_local").await.unwrap();
        let types: Vec<&str> = notes.iter().map(|n| n.note_type()).collect();
        assert_eq!(types, vec!["APPROVAL", "REMOVAL", "NOTE"]);
    }

    #[tokio::test]
    async fn it_pages_through_mod_notes() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/mod/notes")
                    .query_param("subreddit", "santabarbara")
                    .query_param("user", "sb_local")
                    .matches(without_before);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "mod_notes": [{"type": "BAN"}, {"type": "NOTE"}],
                        "end_cursor": "cursor1",
                        "has_next_page": true
                    }));
            })
            .await;
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/mod/notes")
                    .query_param("subreddit", "santabarbara")
                    .query_param("user", "sb_local")
                    .query_param("before", "cursor1");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({
                        "mod_notes": [{"type": "MUTE"}],
                        "end_cursor": "cursor2",
                        "has_next_page": false
                    }));
            })
            .await;

        let service = connect(&server).await;
        let notes = service.mod_notes("santabarbara", "sb_local").await.unwrap();
        first.assert_async().await;
        second.assert_async().await;

        let types: Vec<&str> = notes.iter().map(|n| n.note_type()).collect();
        assert_eq!(types, vec!["BAN", "NOTE", "MUTE"]);
    }

    #[tokio::test]
    async fn it_lists_modmail_in_display_order() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/mod/conversations")
                    .query_param("entity", "santabarbara")
                    .query_param("state", "all");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(load_data("conversations"));
            })
            .await;

        let service = connect(&server).await;
        let conversations = service
            .modmail_conversations("santabarbara", ConversationState::All)
            .await
            .unwrap();
        let ids: Vec<&str> = conversations.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["2i4snm", "2k9aaa"]);
        assert!(conversations[1].has_author("sb_local"));
        assert_eq!(conversations[1].num_messages(), 1);
    }

    #[tokio::test]
    async fn it_requests_another_page_after_a_full_page_of_modmail() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        let full: Vec<String> = (0..100).map(|n| format!("c{n:03}")).collect();
        let rest: Vec<String> = vec!["c100".to_string(), "c101".to_string()];

        let first_body = conversation_page(&full);
        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/mod/conversations")
                    .query_param("entity", "santabarbara")
                    .query_param("limit", "100")
                    .matches(without_after);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(first_body);
            })
            .await;
        let second_body = conversation_page(&rest);
        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/mod/conversations")
                    .query_param("entity", "santabarbara")
                    .query_param("after", "c099");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(second_body);
            })
            .await;

        let service = connect(&server).await;
        let conversations = service
            .modmail_conversations("santabarbara", ConversationState::All)
            .await
            .unwrap();
        first.assert_async().await;
        second.assert_async().await;

        assert_eq!(conversations.len(), 102);
        assert_eq!(conversations[0].id(), "c000");
        assert_eq!(conversations[99].id(), "c099");
        assert_eq!(conversations[101].id(), "c101");
        assert!(conversations[101].has_author("user_c101"));
    }

    #[tokio::test]
    async fn it_encodes_usernames_in_request_paths() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        let about = server
            .mock_async(|when, then| {
                when.method(GET).path("/user/we%3Fird%2Fname/about");
                then.status(404)
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "Not Found", "error": 404}));
            })
            .await;

        let service = connect(&server).await;
        let err = service.about("we?ird/name").await.unwrap_err();
        about.assert_async().await;
        assert!(
            matches!(err, Error::NotFound(ref path) if path == "/user/we%3Fird%2Fname/about"),
            "unexpected error: {err:?}"
        );
    }

    #[tokio::test]
    async fn it_flattens_submission_comment_trees() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/comments/p1");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(load_data("submission_comments"));
            })
            .await;

        let service = connect(&server).await;
        let comments = service.submission_comments("p1").await.unwrap();
        let authors: Vec<&str> = comments.iter().map(|c| c.author()).collect();
        assert_eq!(authors, vec!["alice", "bob", "alice", "carol"]);
    }
}

mod writes {
    use super::*;

    #[tokio::test]
    async fn it_adds_contributors() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        let friend = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/r/santabarbara/api/friend")
                    .body_contains("name=sb_local")
                    .body_contains("type=contributor");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"json": {"errors": []}}));
            })
            .await;

        let service = connect(&server).await;
        service
            .add_contributor("santabarbara", "sb_local")
            .await
            .unwrap();
        friend.assert_async().await;
    }

    #[tokio::test]
    async fn it_reports_subreddit_rate_limits() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/r/santabarbara/api/friend");
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"json": {"errors": [[
                        "SUBREDDIT_RATELIMIT",
                        "you are doing that too much. try again later.",
                        "ratelimit"
                    ]]}}));
            })
            .await;

        let service = connect(&server).await;
        let err = service
            .add_contributor("santabarbara", "sb_local")
            .await
            .unwrap_err();
        assert!(err.is_subreddit_ratelimit(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn it_reports_missing_permissions() {
        let server = MockServer::start_async().await;
        token_mock(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/mod/conversations/2i4snm");
                then.status(403)
                    .header("content-type", "application/json")
                    .json_body(json!({"message": "Forbidden", "error": 403}));
            })
            .await;

        let service = connect(&server).await;
        let err = service
            .reply_to_conversation("2i4snm", "report", false)
            .await
            .unwrap_err();
        assert!(err.is_forbidden(), "unexpected error: {err:?}");
    }
}
