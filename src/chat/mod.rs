// Chat client core.
//
// One ChatClient per authenticated session, constructed at login and torn
// down at logout. All conversation state (contacts, presence, typing,
// history, notifications) lives here and is mutated only by its owner's
// task; socket and REST results arrive as events and completions, so the
// merge order defined in each handler is the whole concurrency story.

use anyhow::{anyhow, Result};
use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub mod api;
pub mod events;
pub mod history;
pub mod notifications;
pub mod outbound;
pub mod presence;
pub mod roster;
pub mod transport;
pub mod typing;

pub use api::{ApiError, ChatApi, RestChatApi};
pub use events::{InboundEvent, OutboundEvent};
pub use history::{HistoryQueryOptions, MessageHistory};
pub use notifications::NotificationFeed;
pub use presence::PresenceTracker;
pub use transport::{ClientState, SocketTransport};
pub use typing::{TypingDebounce, TypingTracker, TYPING_EXPIRY};

use crate::config::SessionConfig;
use crate::models::{Contact, Message, Notification};

const UPDATE_BUFFER: usize = 100;
const EVENT_BUFFER: usize = 100;

/// State of the conversation view binding, advisory for the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    NoContactSelected,
    Loading,
    Ready,
}

/// Updates pushed to the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    MessageReceived(Message),
    ContactsChanged,
    Presence { user_id: String, online: bool },
    Typing { contact_id: String, name: Option<String> },
    Connection(ClientState),
    Notification(Notification),
}

pub struct ChatClient {
    pub(crate) user_id: String,
    pub(crate) display_name: String,
    pub(crate) api: Arc<dyn ChatApi>,
    pub(crate) outbound_tx: mpsc::Sender<OutboundEvent>,
    update_tx: mpsc::Sender<ChatUpdate>,
    pub(crate) connected: Arc<AtomicBool>,
    pub(crate) contacts: Vec<Contact>,
    pub(crate) aggregate_unread: u32,
    pub(crate) selected: Option<String>,
    pub(crate) view_state: ViewState,
    pub(crate) history: MessageHistory,
    pub(crate) presence: PresenceTracker,
    pub(crate) typing: TypingTracker,
    pub(crate) debounce: TypingDebounce,
    pub(crate) notifications: NotificationFeed,
}

impl ChatClient {
    /// Build the client for one session. Fails closed when the session has
    /// no bearer token: no state, no socket, no REST.
    pub fn new(
        config: &SessionConfig,
        api: Arc<dyn ChatApi>,
        outbound_tx: mpsc::Sender<OutboundEvent>,
        connected: Arc<AtomicBool>,
    ) -> Result<(Self, mpsc::Receiver<ChatUpdate>)> {
        if config.token().is_none() {
            return Err(anyhow!("Refusing to start a chat session without a token"));
        }

        let (update_tx, update_rx) = mpsc::channel(UPDATE_BUFFER);

        Ok((
            ChatClient {
                user_id: config.user_id.clone(),
                display_name: config.display_name.clone(),
                api,
                outbound_tx,
                update_tx,
                connected,
                contacts: Vec::new(),
                aggregate_unread: 0,
                selected: None,
                view_state: ViewState::NoContactSelected,
                history: MessageHistory::new(),
                presence: PresenceTracker::new(),
                typing: TypingTracker::new(),
                debounce: TypingDebounce::new(),
                notifications: NotificationFeed::new(),
            },
            update_rx,
        ))
    }

    /// Dispatch one inbound socket event to the component it belongs to.
    pub fn handle_event(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::ReceiveMessage {
                sender_id,
                sender_name,
                message,
                timestamp,
            } => {
                self.apply_inbound_message(&sender_id, &sender_name, &message, timestamp);
            }
            InboundEvent::UserOnline { user_id } => {
                self.apply_presence(&user_id, true);
            }
            InboundEvent::UserOffline { user_id } => {
                self.apply_presence(&user_id, false);
            }
            InboundEvent::UserTyping {
                sender_id,
                sender_name,
                is_typing,
            } => {
                self.typing.apply(&sender_id, &sender_name, is_typing);
                let name = self.typing.who_is_typing(&sender_id).map(str::to_string);
                self.push_update(ChatUpdate::Typing {
                    contact_id: sender_id,
                    name,
                });
            }
            InboundEvent::Notification(notification) => {
                self.notifications.push(notification.clone());
                self.push_update(ChatUpdate::Notification(notification));
            }
        }
    }

    pub(crate) fn push_update(&self, update: ChatUpdate) {
        // Never block state handling on a slow consumer
        if let Err(e) = self.update_tx.try_send(update) {
            warn!("Dropping UI update: {}", e);
        }
    }

    /// Sender half of the update channel, for the transport worker.
    pub fn update_sender(&self) -> mpsc::Sender<ChatUpdate> {
        self.update_tx.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn selected_contact(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn view_state(&self) -> &ViewState {
        &self.view_state
    }

    pub fn history(&self) -> &MessageHistory {
        &self.history
    }

    /// Total unread across all contacts, for the badge.
    pub fn aggregate_unread(&self) -> u32 {
        self.aggregate_unread
    }

    pub fn is_contact_online(&self, contact_id: &str) -> bool {
        self.presence.is_online(contact_id)
    }

    pub fn notifications(&self) -> &NotificationFeed {
        &self.notifications
    }

    pub fn notifications_mut(&mut self) -> &mut NotificationFeed {
        &mut self.notifications
    }

    /// Drop transient sender-side state. Called at logout.
    pub fn end_session(&mut self) {
        self.debounce.abort_all();
    }
}

/// A fully wired session: live REST client, socket worker, and the client
/// holding the state. Constructed at login, shut down at logout.
pub struct ChatSession {
    pub client: ChatClient,
    pub updates: mpsc::Receiver<ChatUpdate>,
    events: mpsc::Receiver<InboundEvent>,
    transport: SocketTransport,
}

impl ChatSession {
    pub fn start(config: &SessionConfig) -> Result<Self> {
        let api: Arc<dyn ChatApi> = Arc::new(RestChatApi::new(config)?);
        let (outbound_tx, outbound_rx) = mpsc::channel(EVENT_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(EVENT_BUFFER);
        let connected = Arc::new(AtomicBool::new(false));

        let (client, updates) = ChatClient::new(config, api, outbound_tx, connected.clone())?;
        let transport = SocketTransport::spawn(
            config,
            outbound_rx,
            inbound_tx,
            client.update_sender(),
            connected,
        )?;

        Ok(ChatSession {
            client,
            updates,
            events: inbound_rx,
            transport,
        })
    }

    /// Next pushed event from the socket, if the connection is alive.
    pub async fn next_event(&mut self) -> Option<InboundEvent> {
        self.events.recv().await
    }

    pub fn apply(&mut self, event: InboundEvent) {
        self.client.handle_event(event);
    }

    /// Tear the session down: cancel timers, close the socket, stop the
    /// worker. Consumes the session so it cannot be used afterwards.
    pub async fn shutdown(mut self) {
        self.client.end_session();
        self.transport.shutdown().await;
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("user_id", &self.user_id)
            .field("contacts", &self.contacts.len())
            .field("selected", &self.selected)
            .field("aggregate_unread", &self.aggregate_unread)
            .finish()
    }
}
