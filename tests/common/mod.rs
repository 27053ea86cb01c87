// Common test utilities for integration tests
// This module contains shared fakes standing in for the REST backend and the
// socket worker, so the client core can be exercised deterministically.

// Standard library imports
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

// External crate imports
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use log::LevelFilter;
use tokio::sync::mpsc;

// Import the crate functionality
use parlor::chat::{
    ApiError, ChatApi, ChatClient, ChatUpdate, HistoryQueryOptions, OutboundEvent,
};
use parlor::models::{Contact, Message};
use parlor::SessionConfig;

// Initialize logging once
static INIT_LOGGER: Once = Once::new();

/// The local user in every test session.
pub const ME: &str = "u-me";
pub const MY_NAME: &str = "Me";

/// Set up the logger for the tests
pub fn setup_logging() {
    INIT_LOGGER.call_once(|| {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

#[derive(Default)]
pub struct FakeState {
    pub contacts: Vec<Contact>,
    pub history: HashMap<String, Vec<Message>>,
    pub send_succeeds: bool,
    pub sent: Vec<(String, String)>,
    pub mark_read_calls: Vec<String>,
    pub delete_calls: Vec<String>,
    next_message_id: u32,
}

/// In-memory REST backend. Records write calls so tests can assert on them.
pub struct FakeChatApi {
    pub state: Mutex<FakeState>,
}

impl FakeChatApi {
    pub fn new() -> Self {
        FakeChatApi {
            state: Mutex::new(FakeState {
                send_succeeds: true,
                ..FakeState::default()
            }),
        }
    }

    pub fn with_contacts(self, contacts: Vec<Contact>) -> Self {
        self.state.lock().unwrap().contacts = contacts;
        self
    }

    pub fn with_history(self, contact_id: &str, messages: Vec<Message>) -> Self {
        self.state
            .lock()
            .unwrap()
            .history
            .insert(contact_id.to_string(), messages);
        self
    }

    /// Make the send endpoint report application-level rejection.
    pub fn failing_sends(self) -> Self {
        self.state.lock().unwrap().send_succeeds = false;
        self
    }

    pub fn mark_read_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().mark_read_calls.clone()
    }

    pub fn delete_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().delete_calls.clone()
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }
}

#[async_trait]
impl ChatApi for FakeChatApi {
    async fn load_contacts(&self) -> Result<Vec<Contact>, ApiError> {
        Ok(self.state.lock().unwrap().contacts.clone())
    }

    async fn load_history(
        &self,
        contact_id: &str,
        _options: &HistoryQueryOptions,
    ) -> Result<Vec<Message>, ApiError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .history
            .get(contact_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn send_message(&self, receiver_id: &str, body: &str) -> Result<Message, ApiError> {
        let mut state = self.state.lock().unwrap();
        if !state.send_succeeds {
            return Err(ApiError::Rejected { endpoint: "send" });
        }

        state.sent.push((receiver_id.to_string(), body.to_string()));
        state.next_message_id += 1;
        Ok(Message {
            id: Some(format!("m{}", state.next_message_id)),
            sender_id: ME.to_string(),
            sender_name: MY_NAME.to_string(),
            body: body.to_string(),
            created_at: Utc::now(),
        })
    }

    async fn mark_read(&self, sender_id: &str) -> Result<(), ApiError> {
        self.state
            .lock()
            .unwrap()
            .mark_read_calls
            .push(sender_id.to_string());
        Ok(())
    }

    async fn delete_contact(&self, contact_id: &str) -> Result<(), ApiError> {
        self.state
            .lock()
            .unwrap()
            .delete_calls
            .push(contact_id.to_string());
        Ok(())
    }
}

/// A client wired to the fake backend with both channel ends held open.
pub struct TestHarness {
    pub client: ChatClient,
    pub updates: mpsc::Receiver<ChatUpdate>,
    pub outbound_rx: mpsc::Receiver<OutboundEvent>,
    pub api: Arc<FakeChatApi>,
    pub connected: Arc<AtomicBool>,
}

impl TestHarness {
    /// Simulate the socket dropping out from under the client.
    pub fn set_disconnected(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

pub fn setup_client(api: FakeChatApi) -> TestHarness {
    setup_logging();

    let config = SessionConfig::new(
        "https://api.test.example",
        "wss://api.test.example/socket",
        ME,
        MY_NAME,
        "test-token",
    );
    let api = Arc::new(api);
    let dyn_api: Arc<dyn ChatApi> = api.clone();
    let (outbound_tx, outbound_rx) = mpsc::channel(100);
    // Tests run with the socket considered live unless they flip this
    let connected = Arc::new(AtomicBool::new(true));

    let (client, updates) = ChatClient::new(&config, dyn_api, outbound_tx, connected.clone())
        .expect("client should build");

    TestHarness {
        client,
        updates,
        outbound_rx,
        api,
        connected,
    }
}

/// Give spawned fire-and-forget tasks a chance to run.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

/// Collect everything currently queued on the outbound socket channel.
pub fn drain_outbound(rx: &mut mpsc::Receiver<OutboundEvent>) -> Vec<OutboundEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Drop everything currently queued on the update channel.
pub fn drain_updates(rx: &mut mpsc::Receiver<ChatUpdate>) -> Vec<ChatUpdate> {
    let mut updates = Vec::new();
    while let Ok(update) = rx.try_recv() {
        updates.push(update);
    }
    updates
}

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

pub fn contact(id: &str, name: &str, unread: u32, last_time: Option<i64>) -> Contact {
    Contact {
        id: id.to_string(),
        display_name: name.to_string(),
        role: None,
        avatar_url: None,
        is_online: false,
        last_message: last_time.map(|_| "earlier message".to_string()),
        last_message_time: last_time.map(ts),
        unread_count: unread,
    }
}

pub fn history_message(id: &str, sender_id: &str, body: &str, at: i64) -> Message {
    Message {
        id: Some(id.to_string()),
        sender_id: sender_id.to_string(),
        sender_name: sender_id.to_string(),
        body: body.to_string(),
        created_at: ts(at),
    }
}

/// The aggregate unread counter must always equal the sum over the rows.
pub fn assert_unread_invariant(client: &ChatClient) {
    let sum: u32 = client.contacts().iter().map(|c| c.unread_count).sum();
    assert_eq!(
        client.aggregate_unread(),
        sum,
        "aggregate unread diverged from the contact rows"
    );
}
