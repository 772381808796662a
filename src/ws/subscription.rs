//! Per-connection subscription manager.
//!
//! Tracks which principals a WebSocket client follows and decides which
//! feed events it receives.

use std::collections::HashSet;

use crate::domain::{FeedEvent, UserPrincipal};

/// Manages the set of followed principals for a single connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Followed principals. Ignored when `subscribe_all` is set.
    principals: HashSet<UserPrincipal>,
    /// Whether the client follows every user (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Follows `principals`; `wildcard` follows everyone.
    pub fn subscribe(&mut self, principals: &[UserPrincipal], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.principals.extend(principals.iter().cloned());
    }

    /// Stops following `principals`.
    pub fn unsubscribe(&mut self, principals: &[UserPrincipal]) {
        for principal in principals {
            self.principals.remove(principal);
        }
    }

    /// Returns `true` if the client should receive `event`.
    ///
    /// User-scoped events go to clients following that user or the
    /// wildcard. Market-wide events go to any client with at least one
    /// subscription.
    #[must_use]
    pub fn matches(&self, event: &FeedEvent) -> bool {
        match event.user() {
            Some(user) => self.subscribe_all || self.principals.contains(user),
            None => self.is_active(),
        }
    }

    /// Returns `true` if the client follows anyone.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.subscribe_all || !self.principals.is_empty()
    }

    /// Returns the number of explicitly followed principals.
    #[must_use]
    pub fn count(&self) -> usize {
        self.principals.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}
