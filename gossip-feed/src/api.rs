//! Calls to the gossip server.
//!
//! Server responses are read leniently: the post list may arrive bare or wrapped, and any
//! field that is missing or malformed falls back to a default instead of failing the call.

use std::future::Future;

use api_client::{ApiClient, ApiError};
use serde_json::{Value, json};

use crate::post::{Post, ReactionKind, normalize_value};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

impl PageQuery {
    pub fn first(limit: u32) -> Self {
        Self { page: 1, limit }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PostsPage {
    pub page: u32,
    pub posts: Vec<Post>,
    /// Best effort unless the server reported it.
    pub has_more: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactOutcome {
    pub success: bool,
    /// The server's copy of the post after the reaction. Its counters are authoritative.
    pub post: Option<Post>,
}

impl ReactOutcome {
    /// The updated post, if the reaction went through.
    pub fn confirmed_post(self) -> Option<Post> {
        if self.success { self.post } else { None }
    }
}

/// Where the feed controller gets its posts from.
pub trait FeedSource {
    fn get_posts(&self, query: PageQuery) -> impl Future<Output = Result<PostsPage, ApiError>>;

    fn react_to_post(
        &self,
        post_id: &str,
        kind: ReactionKind,
    ) -> impl Future<Output = Result<ReactOutcome, ApiError>>;
}

#[derive(Debug, Clone)]
pub struct GossipApi {
    client: ApiClient,
}

impl GossipApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut ApiClient {
        &mut self.client
    }

    /// Check if the gossip server is up.
    pub async fn health_check(&self) -> Result<HealthResponse, ApiError> {
        self.client.get_json("/health").await
    }

    pub async fn get_posts(&self, query: PageQuery) -> Result<PostsPage, ApiError> {
        let path = format!("/api/posts?page={}&limit={}", query.page, query.limit);
        let body = self.client.get(&path).await?;
        let page = parse_posts_page(body, query);
        log::info!(
            "Fetched {} posts for page {} (has_more: {})",
            page.posts.len(),
            page.page,
            page.has_more
        );
        Ok(page)
    }

    pub async fn react_to_post(
        &self,
        post_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactOutcome, ApiError> {
        let url = self
            .client
            .url_for_segments(&["api", "posts", post_id, "react"])?;
        let body = self
            .client
            .post(url.as_str(), &json!({ "reaction": kind.to_server() }))
            .await?;
        let outcome = parse_react_outcome(body);
        if !outcome.success {
            log::info!("Server declined {kind} reaction on post {post_id}");
        }
        Ok(outcome)
    }
}

impl FeedSource for GossipApi {
    async fn get_posts(&self, query: PageQuery) -> Result<PostsPage, ApiError> {
        GossipApi::get_posts(self, query).await
    }

    async fn react_to_post(
        &self,
        post_id: &str,
        kind: ReactionKind,
    ) -> Result<ReactOutcome, ApiError> {
        GossipApi::react_to_post(self, post_id, kind).await
    }
}

/// Accepts a bare array or `{ "posts": [...] }`. Anything else is an empty page.
///
/// A `hasMore`/`has_more` flag from the server wins over the length heuristic.
pub fn parse_posts_page(body: Value, query: PageQuery) -> PostsPage {
    let (items, reported_has_more) = match body {
        Value::Array(items) => (items, None),
        Value::Object(mut object) => {
            let reported = object
                .get("hasMore")
                .or_else(|| object.get("has_more"))
                .and_then(Value::as_bool);
            let items = match object.remove("posts") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (items, reported)
        }
        _ => (Vec::new(), None),
    };

    let posts: Vec<Post> = items.into_iter().filter_map(normalize_value).collect();
    let has_more =
        reported_has_more.unwrap_or_else(|| posts.len() >= query.limit as usize);

    PostsPage {
        page: query.page,
        posts,
        has_more,
    }
}

pub fn parse_react_outcome(body: Value) -> ReactOutcome {
    let success = body
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let post = match body {
        Value::Object(mut object) => object.remove("post").and_then(normalize_value),
        _ => None,
    };
    ReactOutcome { success, post }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post::ReactionCounts;

    #[test]
    fn test_bare_array_short_page_has_no_more() {
        let body = json!([{ "id": 1, "title": "A", "thumbs_up_count": 3 }]);
        let page = parse_posts_page(body, PageQuery::first(10));

        assert_eq!(page.page, 1);
        assert_eq!(page.posts.len(), 1);
        assert_eq!(page.posts[0].id, "1");
        assert_eq!(page.posts[0].counts, ReactionCounts::new(3, 0, 0));
        assert!(!page.has_more);
    }

    #[test]
    fn test_full_page_has_more() {
        let body = json!({ "posts": [{ "id": 1 }, { "id": 2 }] });
        let page = parse_posts_page(body, PageQuery { page: 3, limit: 2 });

        assert_eq!(page.page, 3);
        assert_eq!(page.posts.len(), 2);
        assert!(page.has_more);
    }

    #[test]
    fn test_server_has_more_wins_over_heuristic() {
        let body = json!({ "posts": [{ "id": 1 }, { "id": 2 }], "hasMore": false });
        assert!(!parse_posts_page(body, PageQuery { page: 1, limit: 2 }).has_more);

        let body = json!({ "posts": [{ "id": 1 }], "has_more": true });
        assert!(parse_posts_page(body, PageQuery { page: 1, limit: 10 }).has_more);
    }

    #[test]
    fn test_unexpected_shapes_are_empty() {
        for body in [
            Value::Null,
            json!("oops"),
            json!({ "posts": "nope" }),
            json!({ "items": [] }),
        ] {
            let page = parse_posts_page(body, PageQuery::first(10));
            assert!(page.posts.is_empty());
            assert!(!page.has_more);
        }
    }

    #[test]
    fn test_malformed_items_are_skipped() {
        let body = json!([{ "id": 1 }, { "title": "no id" }, 42, { "id": "x" }]);
        let page = parse_posts_page(body, PageQuery::first(10));
        let ids: Vec<&str> = page.posts.iter().map(|post| post.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "x"]);
    }

    #[test]
    fn test_bad_counters_keep_the_post() {
        let body = json!([
            { "id": 1, "thumbs_up_count": "3" },
            { "id": 2, "thumbs_down_count": 2.5 },
            { "id": 3, "heart_count": -1 }
        ]);
        let page = parse_posts_page(body, PageQuery::first(10));

        let counts: Vec<ReactionCounts> = page.posts.iter().map(|post| post.counts).collect();
        assert_eq!(
            counts,
            vec![
                ReactionCounts::new(3, 0, 0),
                ReactionCounts::default(),
                ReactionCounts::default(),
            ]
        );
    }

    #[test]
    fn test_bad_counters_still_confirm_the_reaction() {
        let outcome = parse_react_outcome(json!({
            "success": true,
            "post": { "id": 5, "thumbs_up_count": "4", "thumbs_down_count": -2, "heart_count": 1.5 }
        }));
        let post = outcome.confirmed_post().unwrap();
        assert_eq!(post.id, "5");
        assert_eq!(post.counts, ReactionCounts::new(4, 0, 0));
    }

    #[test]
    fn test_react_outcome() {
        let outcome = parse_react_outcome(json!({
            "success": true,
            "post": { "id": 5, "thumbs_up_count": 4, "heart_count": 1 }
        }));
        assert!(outcome.success);
        let post = outcome.confirmed_post().unwrap();
        assert_eq!(post.id, "5");
        assert_eq!(post.counts, ReactionCounts::new(4, 0, 1));
    }

    #[test]
    fn test_declined_or_malformed_reaction_is_unconfirmed() {
        let declined = parse_react_outcome(json!({ "success": false, "post": { "id": 5 } }));
        assert!(!declined.success);
        assert_eq!(declined.confirmed_post(), None);

        let missing_post = parse_react_outcome(json!({ "success": true }));
        assert_eq!(missing_post.confirmed_post(), None);

        let garbage = parse_react_outcome(Value::String("ok".to_string()));
        assert_eq!(
            garbage,
            ReactOutcome {
                success: false,
                post: None
            }
        );
    }
}
