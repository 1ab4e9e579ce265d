//! Connection registry: user identity → set of live connections.
//!
//! Source of truth for "is this user online". Per-user mutations run under
//! the owning DashMap shard lock, so a concurrent register and unregister
//! for the same user can never leave an empty set behind.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::debug;

use super::entities::{is_valid_identity, ConnectionId, UserId};

/// Result of removing a connection from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// The user or connection was not registered.
    NotRegistered,
    /// The user still owns other connections.
    StillOnline { remaining: usize },
    /// That was the user's last connection; the user key is gone.
    WentOffline,
}

impl UnregisterOutcome {
    /// Whether the registry changed.
    pub fn mutated(&self) -> bool {
        !matches!(self, UnregisterOutcome::NotRegistered)
    }
}

/// Registry of live connections per user.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    users: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection_id` to the user's set, creating the set if absent.
    ///
    /// Returns `false` without touching the registry when the identity is
    /// empty or a sentinel value, or when the connection was already present.
    pub fn register(&self, user_id: &str, connection_id: ConnectionId) -> bool {
        if !is_valid_identity(user_id) {
            debug!(user_id = %user_id, "Ignoring registration for invalid identity");
            return false;
        }

        let mut connections = self.users.entry(user_id.to_string()).or_default();
        let inserted = connections.insert(connection_id);

        debug!(
            user_id = %user_id,
            connection_id = %connection_id,
            connections = connections.len(),
            "Connection registered"
        );

        inserted
    }

    /// Remove `connection_id`; removes the user entirely when the set empties.
    pub fn unregister(&self, user_id: &str, connection_id: &ConnectionId) -> UnregisterOutcome {
        match self.users.entry(user_id.to_string()) {
            Entry::Vacant(_) => UnregisterOutcome::NotRegistered,
            Entry::Occupied(mut entry) => {
                if !entry.get_mut().remove(connection_id) {
                    return UnregisterOutcome::NotRegistered;
                }

                if entry.get().is_empty() {
                    entry.remove();
                    debug!(user_id = %user_id, "Last connection closed, user offline");
                    UnregisterOutcome::WentOffline
                } else {
                    let remaining = entry.get().len();
                    debug!(
                        user_id = %user_id,
                        connection_id = %connection_id,
                        remaining = remaining,
                        "Connection unregistered"
                    );
                    UnregisterOutcome::StillOnline { remaining }
                }
            }
        }
    }

    /// True iff the user owns at least one connection.
    pub fn is_online(&self, user_id: &str) -> bool {
        self.users
            .get(user_id)
            .map(|connections| !connections.is_empty())
            .unwrap_or(false)
    }

    /// Live connections of a user; empty for unknown users.
    pub fn connections_of(&self, user_id: &str) -> HashSet<ConnectionId> {
        self.users
            .get(user_id)
            .map(|connections| connections.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every registered user, sorted for stable output.
    pub fn online_user_ids(&self) -> Vec<UserId> {
        let mut users: Vec<UserId> = self.users.iter().map(|r| r.key().clone()).collect();
        users.sort();
        users
    }

    /// Number of online users.
    pub fn user_count(&self) -> usize {
        self.users.len()
    }

    /// Number of registered connections across all users.
    pub fn connection_count(&self) -> usize {
        self.users.iter().map(|r| r.value().len()).sum()
    }
}
