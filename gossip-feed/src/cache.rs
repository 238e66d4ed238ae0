//! In-memory cache of the newest posts, used to paint the feed before the network answers.
//!
//! The cache only ever holds the head of the most recent first page. It is replaced
//! wholesale on every store and never merged, has no TTL, and is gone when the process exits.

use std::cell::RefCell;
use std::rc::Rc;

use crate::post::Post;

pub const DEFAULT_CACHE_SIZE: usize = 2;

/// The cache is owned by whoever builds the app and handed to each feed controller.
pub type SharedPostCache = Rc<RefCell<PostCache>>;

#[derive(Debug, Clone)]
pub struct PostCache {
    size: usize,
    posts: Vec<Post>,
}

impl Default for PostCache {
    fn default() -> Self {
        Self::with_size(DEFAULT_CACHE_SIZE)
    }
}

impl PostCache {
    pub fn with_size(size: usize) -> Self {
        Self {
            size,
            posts: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedPostCache {
        Rc::new(RefCell::new(self))
    }

    pub fn cache_size(&self) -> usize {
        self.size
    }

    /// Takes effect on the next store or read; stored posts are left as they are.
    pub fn set_cache_size(&mut self, size: usize) {
        self.size = size;
    }

    /// For sizes coming from signed configuration. Negative sizes clamp to zero.
    pub fn set_cache_size_clamped(&mut self, size: i64) {
        self.set_cache_size(usize::try_from(size.max(0)).unwrap_or(usize::MAX));
    }

    pub fn set_cached_posts(&mut self, posts: &[Post]) {
        self.posts = posts.iter().take(self.size).cloned().collect();
    }

    pub fn cached_posts(&self) -> Vec<Post> {
        self.posts.iter().take(self.size).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.posts.clear();
    }
}
