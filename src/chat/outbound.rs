// Outbound send coordination.
//
// Two delivery paths with a strict order between them: the REST write is
// durable and authoritative, the socket emission is the low-latency mirror
// for the counterpart's live session. No message is ever socket-broadcast
// unless the REST write already succeeded.

use log::{debug, error, warn};

use super::events::OutboundEvent;
use super::{ChatClient, ChatUpdate};

impl ChatClient {
    /// Send a message to the selected contact.
    ///
    /// Returns false, with no side effect, when the trimmed body is empty,
    /// no contact is selected, the socket is down, or the REST write fails.
    /// On success the server's message object is appended to the open
    /// history, mirrored over the socket, and the sender's own contact row
    /// moves to the top of the list.
    pub async fn send_message(&mut self, body: &str) -> bool {
        let trimmed = body.trim();
        if trimmed.is_empty() {
            debug!("Not sending empty message");
            return false;
        }
        let Some(receiver_id) = self.selected.clone() else {
            debug!("Not sending: no contact selected");
            return false;
        };
        if !self.is_connected() {
            warn!("Not sending: socket is not connected");
            return false;
        }

        // The compose box is being flushed; the counterpart stops seeing us
        // as typing
        self.stop_typing(&receiver_id);

        let message = match self.api.send_message(&receiver_id, trimmed).await {
            Ok(message) => message,
            Err(e) => {
                error!("Failed to send message to {}: {}", receiver_id, e);
                return false;
            }
        };

        self.history.append(message.clone());

        let mirror = OutboundEvent::SendMessage {
            receiver_id: receiver_id.clone(),
            sender_id: self.user_id.clone(),
            sender_name: self.display_name.clone(),
            message: trimmed.to_string(),
        };
        if let Err(e) = self.outbound_tx.send(mirror).await {
            // The durable write stands; the peer catches up on next load
            warn!("Failed to mirror message over socket: {}", e);
        }

        if let Some(contact) = self.contacts.iter_mut().find(|c| c.id == receiver_id) {
            contact.last_message = Some(message.body.clone());
            contact.last_message_time = Some(message.created_at);
        }
        self.resort_contacts();
        self.push_update(ChatUpdate::ContactsChanged);

        true
    }
}
