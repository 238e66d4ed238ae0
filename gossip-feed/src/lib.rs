//! Client side of the gossip feed: fetching pages of posts, reacting to them, and keeping
//! the visible feed consistent with what the server says.
//!
//! Nothing here is global. Build an [`ApiClient`](api_client::ApiClient) from an
//! [`ApiConfig`](api_client::ApiConfig), wrap it in a [`GossipApi`], create a
//! [`PostCache`], and hand both to a [`FeedController`].

pub mod api;
pub mod cache;
pub mod controller;
pub mod placeholder;
pub mod post;
pub mod reaction;

pub use api::{
    DEFAULT_PAGE_SIZE, FeedSource, GossipApi, HealthResponse, PageQuery, PostsPage, ReactOutcome,
};
pub use cache::{DEFAULT_CACHE_SIZE, PostCache, SharedPostCache};
pub use controller::{
    FeedController, FeedState, FeedStatus, FetchCompletion, PageCursor, ReactionCompletion,
};
pub use post::{Post, ReactionCounts, ReactionKind, ServerReaction, to_sixty_words};
pub use reaction::{ActiveReactionPolicy, CounterDeltaPolicy, ReactionState};
