//! Per-group subscription registry.

use crate::ChatMessage;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Callback invoked for every message delivered to a subscribed group.
pub type MessageHandler = Arc<dyn Fn(&ChatMessage) + Send + Sync>;

/// Token returned by a subscription, used to remove exactly that
/// registration later. Ids are never reused within a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Outcome of removing a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// Group or id was not registered.
    NotFound,
    /// Removed; the group still has this many handlers.
    Remaining(usize),
    /// Removed the last handler; the group entry is gone.
    GroupEmptied,
}

/// Map from group id to its handlers in registration order.
///
/// A group is present only while it has at least one handler.
#[derive(Default)]
pub struct SubscriptionRegistry {
    groups: HashMap<String, Vec<(SubscriptionId, MessageHandler)>>,
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler to a group, creating the group if needed.
    pub fn insert(&mut self, group_id: &str, handler: MessageHandler) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.groups
            .entry(group_id.to_string())
            .or_default()
            .push((id, handler));
        id
    }

    /// Remove one registration.
    pub fn remove(&mut self, group_id: &str, id: SubscriptionId) -> Removal {
        let Some(handlers) = self.groups.get_mut(group_id) else {
            return Removal::NotFound;
        };

        let Some(index) = handlers.iter().position(|(existing, _)| *existing == id) else {
            return Removal::NotFound;
        };
        handlers.remove(index);

        if handlers.is_empty() {
            self.groups.remove(group_id);
            Removal::GroupEmptied
        } else {
            Removal::Remaining(handlers.len())
        }
    }

    /// Snapshot of a group's handlers in registration order.
    pub fn handlers(&self, group_id: &str) -> Vec<MessageHandler> {
        self.groups
            .get(group_id)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }

    pub fn contains_group(&self, group_id: &str) -> bool {
        self.groups.contains_key(group_id)
    }

    pub fn handler_count(&self, group_id: &str) -> usize {
        self.groups.get(group_id).map_or(0, Vec::len)
    }

    /// Subscribed group ids, sorted.
    pub fn groups(&self) -> Vec<String> {
        let mut groups: Vec<String> = self.groups.keys().cloned().collect();
        groups.sort();
        groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Drop every registration. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.groups.clear();
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<&str, usize> = self
            .groups
            .iter()
            .map(|(group, handlers)| (group.as_str(), handlers.len()))
            .collect();
        f.debug_struct("SubscriptionRegistry")
            .field("groups", &counts)
            .finish()
    }
}
