// Online/offline tracking from presence push events.

use std::collections::HashSet;

/// The set of user ids currently known to be online.
///
/// Membership reflects the most recent event per user id; no ordering is
/// enforced between the initial seed and later push events, so whichever
/// arrives last wins. Both mark operations are idempotent.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    online: HashSet<String>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        PresenceTracker {
            online: HashSet::new(),
        }
    }

    /// Replace the entire online set. Used once per contact-list load, built
    /// from the `is_online` flag of every loaded contact.
    pub fn bulk_seed<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.online = ids.into_iter().collect();
    }

    pub fn mark_online(&mut self, user_id: &str) {
        self.online.insert(user_id.to_string());
    }

    pub fn mark_offline(&mut self, user_id: &str) {
        self.online.remove(user_id);
    }

    pub fn is_online(&self, user_id: &str) -> bool {
        self.online.contains(user_id)
    }

    pub fn online_count(&self) -> usize {
        self.online.len()
    }
}
