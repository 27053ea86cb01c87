// Typing indicators, both directions.
//
// Sender side: every keystroke emits a composing signal and re-arms a
// per-contact stop timer; the stop signal goes out when the timer expires,
// on explicit send, or on contact switch, whichever comes first.
// Receiver side: we trust whatever the counterpart last signaled.

use log::debug;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Duration;

use super::events::OutboundEvent;

/// Inactivity window after the last keystroke before "stopped typing" is
/// emitted on the sender side.
pub const TYPING_EXPIRY: Duration = Duration::from_secs(3);

/// Receiver-side view: contact id -> display name currently typing.
///
/// Entries are removed on an explicit stop signal or when the contact is
/// deselected. There is deliberately no local expiry here; see DESIGN.md.
#[derive(Debug, Default)]
pub struct TypingTracker {
    typing: HashMap<String, String>,
}

impl TypingTracker {
    pub fn new() -> Self {
        TypingTracker {
            typing: HashMap::new(),
        }
    }

    pub fn apply(&mut self, sender_id: &str, sender_name: &str, is_typing: bool) {
        if is_typing {
            self.typing
                .insert(sender_id.to_string(), sender_name.to_string());
        } else {
            self.typing.remove(sender_id);
        }
    }

    pub fn clear(&mut self, contact_id: &str) {
        self.typing.remove(contact_id);
    }

    /// The display name typing to us from this contact, if any.
    pub fn who_is_typing(&self, contact_id: &str) -> Option<&str> {
        self.typing.get(contact_id).map(String::as_str)
    }
}

/// Sender-side debounce: one cancellable timer handle per contact, so a
/// contact switch or send cancels exactly the right timer.
#[derive(Debug, Default)]
pub struct TypingDebounce {
    timers: HashMap<String, JoinHandle<()>>,
}

impl TypingDebounce {
    pub fn new() -> Self {
        TypingDebounce {
            timers: HashMap::new(),
        }
    }

    /// Called on every keystroke in the compose box. Emits the composing
    /// signal and re-arms the stop timer for this contact.
    pub fn note_keystroke(
        &mut self,
        outbound_tx: &mpsc::Sender<OutboundEvent>,
        receiver_id: &str,
        sender_id: &str,
        sender_name: &str,
    ) {
        let composing = OutboundEvent::Typing {
            receiver_id: receiver_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            is_typing: true,
        };
        // Never block the UI on a full channel; a lost typing signal is fine
        if let Err(e) = outbound_tx.try_send(composing) {
            debug!("Skipping typing signal: {}", e);
        }

        if let Some(handle) = self.timers.remove(receiver_id) {
            handle.abort();
        }

        let stop = OutboundEvent::Typing {
            receiver_id: receiver_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            is_typing: false,
        };
        let tx = outbound_tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(TYPING_EXPIRY).await;
            if let Err(e) = tx.try_send(stop) {
                debug!("Skipping typing stop signal: {}", e);
            }
        });
        self.timers.insert(receiver_id.to_string(), handle);
    }

    /// Cancel the pending stop timer for this contact, emitting the stop
    /// signal now if the timer had not fired yet. Used on explicit send and
    /// on contact switch.
    pub fn cancel(
        &mut self,
        outbound_tx: &mpsc::Sender<OutboundEvent>,
        receiver_id: &str,
        sender_id: &str,
        sender_name: &str,
    ) {
        if let Some(handle) = self.timers.remove(receiver_id) {
            if handle.is_finished() {
                // Timer already emitted the stop signal; nothing more to do
                return;
            }
            handle.abort();

            let stop = OutboundEvent::Typing {
                receiver_id: receiver_id.to_string(),
                sender_id: sender_id.to_string(),
                sender_name: sender_name.to_string(),
                is_typing: false,
            };
            if let Err(e) = outbound_tx.try_send(stop) {
                debug!("Skipping typing stop signal: {}", e);
            }
        }
    }

    /// Drop all pending timers without emitting anything. Used at teardown.
    pub fn abort_all(&mut self) {
        for (_, handle) in self.timers.drain() {
            handle.abort();
        }
    }
}

impl super::ChatClient {
    /// Forward a compose-box keystroke for the selected contact.
    pub fn note_keystroke(&mut self) {
        let Some(receiver_id) = self.selected.clone() else {
            return;
        };
        self.debounce.note_keystroke(
            &self.outbound_tx,
            &receiver_id,
            &self.user_id,
            &self.display_name,
        );
    }

    pub(crate) fn stop_typing(&mut self, receiver_id: &str) {
        self.debounce
            .cancel(&self.outbound_tx, receiver_id, &self.user_id, &self.display_name);
    }

    /// Receiver-side view for the UI: who is typing in this conversation.
    pub fn who_is_typing(&self, contact_id: &str) -> Option<&str> {
        self.typing.who_is_typing(contact_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_set_and_clear() {
        let mut tracker = TypingTracker::new();
        tracker.apply("u-2", "Billie", true);
        assert_eq!(tracker.who_is_typing("u-2"), Some("Billie"));

        tracker.apply("u-2", "Billie", false);
        assert_eq!(tracker.who_is_typing("u-2"), None);
    }

    #[test]
    fn test_tracker_clear_absent_is_noop() {
        let mut tracker = TypingTracker::new();
        tracker.clear("u-9");
        assert_eq!(tracker.who_is_typing("u-9"), None);
    }
}
