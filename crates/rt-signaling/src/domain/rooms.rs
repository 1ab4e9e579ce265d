//! Group room membership, tracked per connection.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashSet;

use super::entities::{ConnectionId, GroupId};

/// Which connections have joined which group rooms.
///
/// Same emptiness rule as the registry: a room with no members is removed.
#[derive(Debug, Default)]
pub struct RoomDirectory {
    rooms: DashMap<GroupId, HashSet<ConnectionId>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the connection was not already a member.
    pub fn join(&self, group_id: &str, connection_id: ConnectionId) -> bool {
        self.rooms
            .entry(group_id.to_string())
            .or_default()
            .insert(connection_id)
    }

    /// Returns `true` if the connection was a member.
    pub fn leave(&self, group_id: &str, connection_id: &ConnectionId) -> bool {
        match self.rooms.entry(group_id.to_string()) {
            Entry::Vacant(_) => false,
            Entry::Occupied(mut entry) => {
                let removed = entry.get_mut().remove(connection_id);
                if entry.get().is_empty() {
                    entry.remove();
                }
                removed
            }
        }
    }

    /// Drop the connection from every room it joined.
    pub fn leave_all(&self, connection_id: &ConnectionId) -> Vec<GroupId> {
        let joined: Vec<GroupId> = self
            .rooms
            .iter()
            .filter(|r| r.value().contains(connection_id))
            .map(|r| r.key().clone())
            .collect();

        joined
            .into_iter()
            .filter(|group| self.leave(group, connection_id))
            .collect()
    }

    pub fn members(&self, group_id: &str) -> HashSet<ConnectionId> {
        self.rooms
            .get(group_id)
            .map(|members| members.clone())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}
