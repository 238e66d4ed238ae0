//! Feed screen state: the visible posts, the page cursor, and per-post reaction state.
//!
//! [`FeedState`] is the state machine on its own, with no IO. Each fetch is split into a
//! `begin_*` call that hands out a ticket and a `finish_*` call that applies the response.
//! A response whose ticket has since been superseded is dropped, so responses that
//! arrive out of order can't overwrite newer state.
//!
//! [`FeedController`] drives a [`FeedState`] against a [`FeedSource`] and keeps the post cache
//! up to date. It is meant to live on a single thread. Several of its operations can be in
//! flight at once, because no borrow of the state is ever held across an `.await`.

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet};

use api_client::ApiError;

use crate::api::{FeedSource, PageQuery, PostsPage, ReactOutcome};
use crate::cache::SharedPostCache;
use crate::placeholder::placeholder_posts;
use crate::post::{Post, ReactionKind};
use crate::reaction::{ActiveReactionPolicy, CounterDeltaPolicy, ReactionState};

/// What the feed is doing right now. At most one fetch runs at a time.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum FeedStatus {
    #[default]
    Idle,
    LoadingFirst,
    LoadingMore,
    /// The last first-page load failed. A retry is still possible.
    Failed { message: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PageCursor {
    /// The last page applied to the feed, 0 until the first page arrives.
    pub page: u32,
    /// Once false it stays false until the next first-page load.
    pub has_more: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            page: 0,
            has_more: true,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FetchKind {
    FirstPage,
    NextPage,
}

/// Handed out when a fetch is dispatched and checked again when its response arrives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    kind: FetchKind,
    generation: u64,
    seq: u64,
    page: u32,
}

impl FetchTicket {
    pub fn kind(&self) -> FetchKind {
        self.kind
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn query(&self, limit: u32) -> PageQuery {
        PageQuery {
            page: self.page,
            limit,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReactionTicket {
    post_id: String,
    kind: ReactionKind,
    generation: u64,
    seq: u64,
}

impl ReactionTicket {
    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn kind(&self) -> ReactionKind {
        self.kind
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FetchCompletion {
    Applied,
    /// The fetch failed; the feed keeps what it had (or the placeholder feed).
    Failed,
    /// A newer fetch, or a reset, superseded this one.
    Stale,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReactionCompletion {
    /// The server confirmed the reaction and its copy of the post replaced ours.
    Confirmed,
    /// The server answered but didn't apply the reaction. Nothing changed.
    Declined,
    /// The server couldn't be reached; the reaction was toggled locally.
    ToggledLocally,
    Stale,
}

#[derive(Clone, Debug, Default)]
pub struct FeedState {
    posts: Vec<Post>,
    reactions: HashMap<String, ReactionState>,
    cursor: PageCursor,
    status: FeedStatus,
    /// Restored when the running append finishes.
    status_before_append: FeedStatus,
    generation: u64,
    next_seq: u64,
    latest_first_page: u64,
    latest_next_page: u64,
    latest_reaction: HashMap<String, u64>,
}

impl FeedState {
    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn post(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|post| post.id == post_id)
    }

    pub fn reaction(&self, post_id: &str) -> Option<&ReactionState> {
        self.reactions.get(post_id)
    }

    pub fn reactions(&self) -> &HashMap<String, ReactionState> {
        &self.reactions
    }

    pub fn cursor(&self) -> PageCursor {
        self.cursor
    }

    pub fn has_more(&self) -> bool {
        self.cursor.has_more
    }

    pub fn status(&self) -> &FeedStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            FeedStatus::Failed { message } => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, FeedStatus::LoadingFirst)
    }

    pub fn is_loading_more(&self) -> bool {
        matches!(self.status, FeedStatus::LoadingMore)
    }

    /// Shows `posts` (normally the cached head of the feed) until the first page arrives.
    pub fn seed(&mut self, posts: Vec<Post>) {
        if posts.is_empty() {
            return;
        }
        self.posts = dedup_by_id(posts);
        self.rebuild_reactions();
    }

    /// Drops everything. Responses to fetches dispatched before the reset are ignored.
    pub fn reset(&mut self) {
        *self = FeedState {
            generation: self.generation + 1,
            next_seq: self.next_seq,
            ..FeedState::default()
        };
    }

    fn take_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        let latest = match ticket.kind {
            FetchKind::FirstPage => self.latest_first_page,
            FetchKind::NextPage => self.latest_next_page,
        };
        ticket.generation == self.generation && ticket.seq == latest
    }

    fn rebuild_reactions(&mut self) {
        self.reactions = self
            .posts
            .iter()
            .map(|post| (post.id.clone(), ReactionState::from_post(post)))
            .collect();
    }

    /// Returns `None` while another fetch is in flight.
    pub fn begin_first_page(&mut self) -> Option<FetchTicket> {
        if matches!(
            self.status,
            FeedStatus::LoadingFirst | FeedStatus::LoadingMore
        ) {
            log::debug!("Ignoring first page load while {:?}", self.status);
            return None;
        }

        // a first-page load starts a new generation: nothing dispatched before it applies
        self.generation += 1;
        let seq = self.take_seq();
        self.latest_first_page = seq;
        self.status = FeedStatus::LoadingFirst;

        Some(FetchTicket {
            kind: FetchKind::FirstPage,
            generation: self.generation,
            seq,
            page: 1,
        })
    }

    pub fn finish_first_page(
        &mut self,
        ticket: FetchTicket,
        result: Result<PostsPage, ApiError>,
    ) -> FetchCompletion {
        if !self.is_current(&ticket) {
            log::info!("Dropping stale first page response");
            return FetchCompletion::Stale;
        }

        match result {
            Ok(page) => {
                self.posts = dedup_by_id(page.posts);
                self.rebuild_reactions();
                self.cursor = PageCursor {
                    page: 1,
                    has_more: page.has_more,
                };
                self.status = FeedStatus::Idle;
                FetchCompletion::Applied
            }
            Err(e) => {
                log::warn!("Loading the feed failed: {e}");
                if self.posts.is_empty() {
                    log::info!("Nothing to show, falling back to the bundled feed");
                    self.posts = placeholder_posts();
                    self.rebuild_reactions();
                }
                self.status = FeedStatus::Failed {
                    message: e.to_string(),
                };
                FetchCompletion::Failed
            }
        }
    }

    /// Returns `None` while another fetch is in flight, before any page has loaded, or once
    /// the feed is exhausted. A failed first-page retry doesn't block appends.
    pub fn begin_load_more(&mut self) -> Option<FetchTicket> {
        let settled = matches!(self.status, FeedStatus::Idle | FeedStatus::Failed { .. });
        if !settled || !self.cursor.has_more || self.cursor.page == 0 {
            log::debug!(
                "Ignoring load more (status: {:?}, cursor: {:?})",
                self.status,
                self.cursor
            );
            return None;
        }

        let seq = self.take_seq();
        self.latest_next_page = seq;
        self.status_before_append = std::mem::replace(&mut self.status, FeedStatus::LoadingMore);

        Some(FetchTicket {
            kind: FetchKind::NextPage,
            generation: self.generation,
            seq,
            page: self.cursor.page + 1,
        })
    }

    pub fn finish_load_more(
        &mut self,
        ticket: FetchTicket,
        result: Result<PostsPage, ApiError>,
    ) -> FetchCompletion {
        if !self.is_current(&ticket) {
            log::info!("Dropping stale response for page {}", ticket.page);
            return FetchCompletion::Stale;
        }
        self.status = std::mem::take(&mut self.status_before_append);

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                // the cursor stays put, so the next attempt asks for the same page
                log::warn!("Loading page {} failed: {e}", ticket.page);
                return FetchCompletion::Failed;
            }
        };

        if page.posts.is_empty() {
            self.cursor.has_more = false;
            return FetchCompletion::Applied;
        }

        let mut known: HashSet<String> = self.posts.iter().map(|post| post.id.clone()).collect();
        let mut added = 0;
        for post in page.posts {
            if known.insert(post.id.clone()) {
                self.reactions
                    .insert(post.id.clone(), ReactionState::from_post(&post));
                self.posts.push(post);
                added += 1;
            }
        }
        log::info!("Appended {added} posts from page {}", ticket.page);

        self.cursor = PageCursor {
            page: ticket.page,
            has_more: page.has_more,
        };
        FetchCompletion::Applied
    }

    pub fn begin_reaction(&mut self, post_id: &str, kind: ReactionKind) -> ReactionTicket {
        let seq = self.take_seq();
        self.latest_reaction.insert(post_id.to_string(), seq);
        ReactionTicket {
            post_id: post_id.to_string(),
            kind,
            generation: self.generation,
            seq,
        }
    }

    /// Applies the server's answer to a reaction, or the local toggle if there was none.
    ///
    /// Only the newest confirmed reaction per post is applied. Local toggles always
    /// apply, so two taps while offline cancel out.
    pub fn finish_reaction(
        &mut self,
        ticket: ReactionTicket,
        result: Result<ReactOutcome, ApiError>,
        policy: &impl ActiveReactionPolicy,
    ) -> ReactionCompletion {
        if ticket.generation != self.generation {
            log::info!("Dropping reaction response for post {} after reset", ticket.post_id);
            return ReactionCompletion::Stale;
        }

        match result {
            Ok(outcome) => {
                let Some(mut updated) = outcome.confirmed_post() else {
                    return ReactionCompletion::Declined;
                };
                if self.latest_reaction.get(&ticket.post_id) != Some(&ticket.seq) {
                    log::info!("Dropping stale reaction response for post {}", ticket.post_id);
                    return ReactionCompletion::Stale;
                }
                if updated.id != ticket.post_id {
                    log::warn!(
                        "Server answered for post {} as {}, keeping our id",
                        ticket.post_id,
                        updated.id
                    );
                    updated.id = ticket.post_id.clone();
                }

                let previous = self
                    .post(&ticket.post_id)
                    .map(|post| post.counts)
                    .or_else(|| self.reactions.get(&ticket.post_id).map(|state| state.counts))
                    .unwrap_or_default();
                let active = policy.infer(ticket.kind, &previous, &updated);

                self.reactions.insert(
                    ticket.post_id.clone(),
                    ReactionState::from_post(&updated).with_active(active),
                );
                if let Some(slot) = self.posts.iter_mut().find(|post| post.id == ticket.post_id) {
                    *slot = updated;
                }
                ReactionCompletion::Confirmed
            }
            Err(e) => {
                log::warn!(
                    "Reacting to post {} failed, toggling locally: {e}",
                    ticket.post_id
                );
                let fallback = self
                    .post(&ticket.post_id)
                    .map(ReactionState::from_post)
                    .unwrap_or_default();
                self.reactions
                    .entry(ticket.post_id)
                    .or_insert(fallback)
                    .toggle(ticket.kind);
                ReactionCompletion::ToggledLocally
            }
        }
    }
}

/// Keeps the first occurrence of every id, in arrival order.
fn dedup_by_id(posts: Vec<Post>) -> Vec<Post> {
    let mut seen = HashSet::new();
    posts
        .into_iter()
        .filter(|post| seen.insert(post.id.clone()))
        .collect()
}

pub struct FeedController<S, P = CounterDeltaPolicy> {
    source: S,
    cache: SharedPostCache,
    policy: P,
    page_size: u32,
    state: RefCell<FeedState>,
}

impl<S: FeedSource> FeedController<S> {
    /// Mounts a feed: the cached posts are visible right away. Call
    /// [`load_first_page`](Self::load_first_page) next.
    pub fn new(source: S, cache: SharedPostCache, page_size: u32) -> Self {
        Self::with_policy(source, cache, page_size, CounterDeltaPolicy)
    }
}

impl<S: FeedSource, P: ActiveReactionPolicy> FeedController<S, P> {
    pub fn with_policy(source: S, cache: SharedPostCache, page_size: u32, policy: P) -> Self {
        let mut state = FeedState::default();
        state.seed(cache.borrow().cached_posts());
        Self {
            source,
            cache,
            policy,
            page_size,
            state: RefCell::new(state),
        }
    }

    /// Don't hold on to this across an `.await`.
    pub fn state(&self) -> Ref<'_, FeedState> {
        self.state.borrow()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Loads (or reloads) page 1. Also the retry after a failure.
    ///
    /// Returns `None` if another fetch was already in flight.
    pub async fn load_first_page(&self) -> Option<FetchCompletion> {
        let ticket = self.state.borrow_mut().begin_first_page()?;
        let result = self.source.get_posts(ticket.query(self.page_size)).await;

        let completion = self.state.borrow_mut().finish_first_page(ticket, result);
        if completion == FetchCompletion::Applied {
            self.cache
                .borrow_mut()
                .set_cached_posts(self.state.borrow().posts());
        }
        Some(completion)
    }

    /// Appends the next page. Returns `None` if the request was dropped.
    pub async fn load_more(&self) -> Option<FetchCompletion> {
        let ticket = self.state.borrow_mut().begin_load_more()?;
        let result = self.source.get_posts(ticket.query(self.page_size)).await;
        Some(self.state.borrow_mut().finish_load_more(ticket, result))
    }

    pub async fn react(&self, post_id: &str, kind: ReactionKind) -> ReactionCompletion {
        let ticket = self.state.borrow_mut().begin_reaction(post_id, kind);
        let result = self.source.react_to_post(post_id, kind).await;
        self.state
            .borrow_mut()
            .finish_reaction(ticket, result, &self.policy)
    }

    /// Unmounts the feed state. The cache is left alone.
    pub fn reset(&self) {
        self.state.borrow_mut().reset();
    }
}
