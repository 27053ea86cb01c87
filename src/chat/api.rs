// REST collaborator for the chat backend.
//
// The backend is an external service; only the five calls the chat core
// depends on are modeled here. Every call carries the session bearer token
// and an explicit timeout so a hung request can never pin the view in a
// loading state.

use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::models::{Contact, Message};

use super::history::HistoryQueryOptions;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: &'static str },
    #[error("server rejected {endpoint}")]
    Rejected { endpoint: &'static str },
    #[error("no bearer token; session is unauthenticated")]
    Unauthenticated,
}

/// The REST calls the chat core consumes. Seam for tests and for alternative
/// backends; the live implementation is [`RestChatApi`].
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn load_contacts(&self) -> Result<Vec<Contact>, ApiError>;

    async fn load_history(
        &self,
        contact_id: &str,
        options: &HistoryQueryOptions,
    ) -> Result<Vec<Message>, ApiError>;

    /// The durable write. A returned message means the server persisted it.
    async fn send_message(&self, receiver_id: &str, body: &str) -> Result<Message, ApiError>;

    async fn mark_read(&self, sender_id: &str) -> Result<(), ApiError>;

    async fn delete_contact(&self, contact_id: &str) -> Result<(), ApiError>;
}

// Response envelopes. `success: false` with a 200 status is how this backend
// reports application-level rejection.

#[derive(Deserialize)]
struct ContactsEnvelope {
    success: bool,
    #[serde(default)]
    contacts: Vec<Contact>,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    success: bool,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Deserialize)]
struct SendEnvelope {
    success: bool,
    message: Option<Message>,
}

#[derive(Deserialize)]
struct AckEnvelope {
    success: bool,
}

pub struct RestChatApi {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl RestChatApi {
    /// Build the REST client for one session. Fails closed when the session
    /// carries no bearer token.
    pub fn new(config: &SessionConfig) -> Result<Self, ApiError> {
        let token = config.token().ok_or(ApiError::Unauthenticated)?;

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(RestChatApi {
            client,
            api_base: config.api_base.clone(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    fn check_status(
        response: &reqwest::Response,
        endpoint: &'static str,
    ) -> Result<(), ApiError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                endpoint,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatApi for RestChatApi {
    async fn load_contacts(&self) -> Result<Vec<Contact>, ApiError> {
        let response = self
            .client
            .get(self.url("/chat/accounts"))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check_status(&response, "accounts")?;

        let envelope: ContactsEnvelope = response.json().await?;
        if !envelope.success {
            return Err(ApiError::Rejected { endpoint: "accounts" });
        }

        debug!("Loaded {} contacts", envelope.contacts.len());
        Ok(envelope.contacts)
    }

    async fn load_history(
        &self,
        contact_id: &str,
        options: &HistoryQueryOptions,
    ) -> Result<Vec<Message>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/chat/history/{}", contact_id)))
            .query(&[("limit", options.limit), ("skip", options.skip)])
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check_status(&response, "history")?;

        let envelope: HistoryEnvelope = response.json().await?;
        if !envelope.success {
            return Err(ApiError::Rejected { endpoint: "history" });
        }

        debug!(
            "Loaded {} messages for contact {}",
            envelope.messages.len(),
            contact_id
        );
        Ok(envelope.messages)
    }

    async fn send_message(&self, receiver_id: &str, body: &str) -> Result<Message, ApiError> {
        let response = self
            .client
            .post(self.url("/chat/send"))
            .bearer_auth(&self.token)
            .json(&json!({ "receiverId": receiver_id, "message": body }))
            .send()
            .await?;
        Self::check_status(&response, "send")?;

        let envelope: SendEnvelope = response.json().await?;
        match envelope.message {
            Some(message) if envelope.success => Ok(message),
            _ => Err(ApiError::Rejected { endpoint: "send" }),
        }
    }

    async fn mark_read(&self, sender_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .put(self.url("/chat/mark-read"))
            .bearer_auth(&self.token)
            .json(&json!({ "senderId": sender_id }))
            .send()
            .await?;
        Self::check_status(&response, "mark-read")?;

        let envelope: AckEnvelope = response.json().await?;
        if !envelope.success {
            return Err(ApiError::Rejected { endpoint: "mark-read" });
        }
        Ok(())
    }

    async fn delete_contact(&self, contact_id: &str) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/chat/contact/{}", contact_id)))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check_status(&response, "delete-contact")?;

        let envelope: AckEnvelope = response.json().await?;
        if !envelope.success {
            return Err(ApiError::Rejected {
                endpoint: "delete-contact",
            });
        }
        Ok(())
    }
}
