//! Per-connection subscription manager.
//!
//! Tracks which collections a WebSocket client is subscribed to and
//! provides server-side event filtering.

use std::collections::HashSet;

use crate::domain::Collection;

/// Manages the set of collection subscriptions for a single connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed collections. Ignored while `subscribe_all` is set.
    collections: HashSet<Collection>,
    /// Whether the client subscribed with the wildcard `"*"`.
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds collections to the subscription set.
    pub fn subscribe(&mut self, collections: &[Collection], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.collections.extend(collections.iter().copied());
    }

    /// Removes collections from the subscription set. The wildcard is
    /// cleared when `wildcard` is set.
    pub fn unsubscribe(&mut self, collections: &[Collection], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for collection in collections {
            self.collections.remove(collection);
        }
    }

    /// Returns `true` if events for `collection` should be forwarded.
    #[must_use]
    pub fn matches(&self, collection: Collection) -> bool {
        self.subscribe_all || self.collections.contains(&collection)
    }

    /// Explicitly subscribed collections, in reconciliation order.
    #[must_use]
    pub fn collections(&self) -> Vec<Collection> {
        Collection::ALL
            .into_iter()
            .filter(|collection| self.collections.contains(collection))
            .collect()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(Collection::ALL.iter().all(|c| !mgr.matches(*c)));
    }

    #[test]
    fn subscribe_specific_collection() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[Collection::Expenses], false);
        assert!(mgr.matches(Collection::Expenses));
        assert!(!mgr.matches(Collection::Groups));
        assert_eq!(mgr.collections(), vec![Collection::Expenses]);
    }

    #[test]
    fn wildcard_matches_everything_until_removed() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.matches(Collection::ActiveGroup));
        mgr.unsubscribe(&[], true);
        assert!(!mgr.matches(Collection::ActiveGroup));
    }

    #[test]
    fn unsubscribe_removes_collection() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[Collection::Groups, Collection::Expenses], false);
        mgr.unsubscribe(&[Collection::Groups], false);
        assert!(!mgr.matches(Collection::Groups));
        assert!(mgr.matches(Collection::Expenses));
    }
}
