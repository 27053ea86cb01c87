// Message history for the selected conversation.
//
// Switching contacts is a wholesale reload, never a merge; the list order is
// insertion order and the UI trusts it as-is.

use crate::models::Message;

#[derive(Debug, Clone)]
pub struct HistoryQueryOptions {
    pub limit: usize,
    pub skip: usize,
}

impl HistoryQueryOptions {
    pub fn new() -> Self {
        HistoryQueryOptions {
            limit: 50, // Backend default page size
            skip: 0,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_skip(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }
}

impl Default for HistoryQueryOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
pub struct MessageHistory {
    messages: Vec<Message>,
}

impl MessageHistory {
    pub fn new() -> Self {
        MessageHistory {
            messages: Vec::new(),
        }
    }

    /// Replace the whole cache with a freshly loaded page.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Append one message, self-sent (post-ack) or received in-conversation.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn msg(id: &str, body: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            sender_id: "u-2".to_string(),
            sender_name: "Billie".to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let mut history = MessageHistory::new();
        history.append(msg("m1", "old"));

        history.replace(vec![msg("m2", "new-a"), msg("m3", "new-b")]);

        assert_eq!(history.len(), 2);
        assert_eq!(history.messages()[0].body, "new-a");
    }

    #[test]
    fn test_append_preserves_arrival_order() {
        let mut history = MessageHistory::new();
        history.append(msg("m1", "first"));
        history.append(msg("m2", "second"));

        let bodies: Vec<&str> = history.messages().iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
    }

    #[test]
    fn test_query_options_builder() {
        let opts = HistoryQueryOptions::new().with_limit(20).with_skip(40);
        assert_eq!(opts.limit, 20);
        assert_eq!(opts.skip, 40);

        let defaults = HistoryQueryOptions::default();
        assert_eq!(defaults.limit, 50);
        assert_eq!(defaults.skip, 0);
    }
}
