// Contact list reconciliation.
//
// The list is ordered by most recent activity. Every mutation that can move
// a row (inbound message, own send) re-sorts the whole list; the aggregate
// unread counter is recomputed from the rows whenever they are bulk-replaced
// and kept incrementally in between.

use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::cmp::Ordering;
use uuid::Uuid;

use crate::models::{Contact, Message};

use super::history::HistoryQueryOptions;
use super::{ChatClient, ChatUpdate, ViewState};

impl ChatClient {
    /// Load the contact list from the backend, replacing local rows
    /// wholesale. Seeds the presence set from the snapshot's online flags.
    /// A failed load renders as an empty list, never an error state.
    pub async fn load_contacts(&mut self) {
        let mut contacts = match self.api.load_contacts().await {
            Ok(contacts) => contacts,
            Err(e) => {
                error!("Failed to load contacts: {}", e);
                Vec::new()
            }
        };

        self.presence.bulk_seed(
            contacts
                .iter()
                .filter(|c| c.is_online)
                .map(|c| c.id.clone()),
        );
        // is_online is derived state; re-read it from the tracker
        for contact in &mut contacts {
            contact.is_online = self.presence.is_online(&contact.id);
        }

        self.contacts = contacts;
        self.resort_contacts();
        self.recompute_aggregate();
        self.push_update(ChatUpdate::ContactsChanged);
    }

    /// Merge one inbound message event into the list.
    ///
    /// If the sender is the selected contact the message lands in the open
    /// conversation and is immediately marked read (best-effort); otherwise
    /// the sender's unread counter grows. Either way the sender's row gets
    /// the new last-message preview and the list re-sorts.
    pub(crate) fn apply_inbound_message(
        &mut self,
        sender_id: &str,
        sender_name: &str,
        body: &str,
        timestamp: DateTime<Utc>,
    ) {
        let message = Message {
            // Socket frames carry no server id; key the row locally
            id: Some(format!("local-{}", Uuid::new_v4())),
            sender_id: sender_id.to_string(),
            sender_name: sender_name.to_string(),
            body: body.to_string(),
            created_at: timestamp,
        };

        if !self.contacts.iter().any(|c| c.id == sender_id) {
            info!("First message from unknown sender {}", sender_id);
            let mut contact = Contact::from_first_message(sender_id, sender_name);
            contact.is_online = self.presence.is_online(sender_id);
            self.contacts.push(contact);
        }

        if self.selected.as_deref() == Some(sender_id) {
            self.history.append(message.clone());
            self.spawn_mark_read(sender_id);
        } else if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == sender_id) {
            contact.unread_count += 1;
            self.aggregate_unread += 1;
        }

        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == sender_id) {
            contact.last_message = Some(body.to_string());
            contact.last_message_time = Some(timestamp);
        }
        self.resort_contacts();

        self.push_update(ChatUpdate::MessageReceived(message));
        self.push_update(ChatUpdate::ContactsChanged);
    }

    /// Merge a presence push into the tracker and the affected row.
    pub(crate) fn apply_presence(&mut self, user_id: &str, online: bool) {
        if online {
            self.presence.mark_online(user_id);
        } else {
            self.presence.mark_offline(user_id);
        }

        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == user_id) {
            contact.is_online = online;
        }

        self.push_update(ChatUpdate::Presence {
            user_id: user_id.to_string(),
            online,
        });
    }

    /// Make a contact the active conversation: load its history wholesale,
    /// mark its messages read, and zero its unread counter. Selecting the
    /// contact that just received an in-conversation message does not touch
    /// the counter a second time.
    pub async fn select_contact(&mut self, contact_id: &str) {
        if !self.contacts.iter().any(|c| c.id == contact_id) {
            warn!("Ignoring selection of unknown contact {}", contact_id);
            return;
        }

        if let Some(previous) = self.selected.clone() {
            if previous != contact_id {
                self.stop_typing(&previous);
                self.typing.clear(&previous);
            }
        }

        self.selected = Some(contact_id.to_string());
        self.view_state = ViewState::Loading;
        self.history.clear();

        let messages = match self
            .api
            .load_history(contact_id, &HistoryQueryOptions::default())
            .await
        {
            Ok(messages) => messages,
            Err(e) => {
                error!("Failed to load history for {}: {}", contact_id, e);
                Vec::new()
            }
        };
        self.history.replace(messages);
        self.view_state = ViewState::Ready;

        self.spawn_mark_read(contact_id);
        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == contact_id) {
            contact.unread_count = 0;
        }
        self.recompute_aggregate();
        self.push_update(ChatUpdate::ContactsChanged);
    }

    pub fn clear_selection(&mut self) {
        if let Some(previous) = self.selected.take() {
            self.stop_typing(&previous);
            self.typing.clear(&previous);
        }
        self.history.clear();
        self.view_state = ViewState::NoContactSelected;
    }

    /// Remove a contact locally and ask the backend to do the same. The
    /// local removal is optimistic and stands even if the backend call
    /// fails; server-side history is not touched.
    pub async fn delete_contact(&mut self, contact_id: &str) {
        let before = self.contacts.len();
        self.contacts.retain(|c| c.id != contact_id);
        if self.contacts.len() == before {
            warn!("Ignoring deletion of unknown contact {}", contact_id);
            return;
        }

        if self.selected.as_deref() == Some(contact_id) {
            self.selected = None;
            self.history.clear();
            self.view_state = ViewState::NoContactSelected;
            self.typing.clear(contact_id);
        }

        self.recompute_aggregate();
        self.push_update(ChatUpdate::ContactsChanged);

        if let Err(e) = self.api.delete_contact(contact_id).await {
            warn!("Failed to delete contact {} on the server: {}", contact_id, e);
        }
    }

    /// Most-recent-activity order: rows with a last message time first,
    /// newest to oldest; rows without one after them, keeping their
    /// relative order (the sort is stable).
    pub(crate) fn resort_contacts(&mut self) {
        self.contacts.sort_by(|a, b| {
            match (&a.last_message_time, &b.last_message_time) {
                (Some(ta), Some(tb)) => tb.cmp(ta),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });
    }

    pub(crate) fn recompute_aggregate(&mut self) {
        self.aggregate_unread = self.contacts.iter().map(|c| c.unread_count).sum();
    }

    /// Best-effort read acknowledgement; a failure is logged and the read
    /// state stays stale until the next contact load.
    pub(crate) fn spawn_mark_read(&self, sender_id: &str) {
        let api = self.api.clone();
        let sender_id = sender_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = api.mark_read(&sender_id).await {
                warn!("Failed to mark messages from {} as read: {}", sender_id, e);
            }
        });
    }
}
