//! Client-side reaction state for a post.
//!
//! A [`ReactionState`] is derived data: the counters as last known to the client plus which
//! reaction (if any) the user is considered to have toggled on. It can always be rebuilt
//! from a [`Post`]; only `active` is information the server doesn't hold.

use crate::post::{Post, ReactionCounts, ReactionKind};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct ReactionState {
    pub counts: ReactionCounts,
    pub active: Option<ReactionKind>,
}

impl ReactionState {
    pub fn from_post(post: &Post) -> Self {
        Self {
            counts: post.counts,
            active: None,
        }
    }

    pub fn with_active(mut self, active: Option<ReactionKind>) -> Self {
        self.active = active;
        self
    }

    /// The local toggle used when the server can't be reached.
    ///
    /// Toggling the active reaction turns it off. Toggling another one moves the user's
    /// reaction over to it. Counters never go below zero.
    pub fn toggle(&mut self, kind: ReactionKind) {
        if self.active == Some(kind) {
            let count = self.counts.get_mut(kind);
            *count = count.saturating_sub(1);
            self.active = None;
            return;
        }

        if let Some(previous) = self.active {
            let count = self.counts.get_mut(previous);
            *count = count.saturating_sub(1);
        }
        *self.counts.get_mut(kind) += 1;
        self.active = Some(kind);
    }
}

/// Decides which reaction is active after the server confirmed a reaction.
///
/// The server doesn't say what the caller's own reaction is, so this has to be inferred.
/// Implement this to swap the inference out, e.g. once the endpoint reports it explicitly.
pub trait ActiveReactionPolicy {
    fn infer(
        &self,
        kind: ReactionKind,
        previous: &ReactionCounts,
        updated: &Post,
    ) -> Option<ReactionKind>;
}

/// `kind` is active if and only if its counter strictly increased.
///
/// Can misfire when other users react to the same post at the same time.
#[derive(Copy, Clone, Debug, Default)]
pub struct CounterDeltaPolicy;

impl ActiveReactionPolicy for CounterDeltaPolicy {
    fn infer(
        &self,
        kind: ReactionKind,
        previous: &ReactionCounts,
        updated: &Post,
    ) -> Option<ReactionKind> {
        (updated.counts.get(kind) > previous.get(kind)).then_some(kind)
    }
}

impl<F> ActiveReactionPolicy for F
where
    F: Fn(ReactionKind, &ReactionCounts, &Post) -> Option<ReactionKind>,
{
    fn infer(
        &self,
        kind: ReactionKind,
        previous: &ReactionCounts,
        updated: &Post,
    ) -> Option<ReactionKind> {
        self(kind, previous, updated)
    }
}
