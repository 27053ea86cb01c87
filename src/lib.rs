// Re-export needed modules for embedders and tests
pub mod chat;
pub mod config;
pub mod models;
pub mod utils;

// Re-export main types for convenience
pub use chat::{ChatClient, ChatSession, ChatUpdate, ClientState, ViewState};
pub use config::SessionConfig;
pub use models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_contact_roles() {
        let customer = Contact {
            id: "user1".to_string(),
            display_name: "Walk-in Customer".to_string(),
            role: Some(RoleTag::Customer),
            avatar_url: None,
            is_online: true,
            last_message: None,
            last_message_time: None,
            unread_count: 0,
        };

        let provider = Contact {
            id: "user2".to_string(),
            display_name: "Stylist".to_string(),
            role: Some(RoleTag::Provider),
            avatar_url: Some("https://cdn.example.com/a.png".to_string()),
            is_online: false,
            last_message: Some("See you at 3".to_string()),
            last_message_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 15, 0, 0).unwrap()),
            unread_count: 2,
        };

        assert_eq!(customer.id, "user1");
        assert_eq!(provider.display_name, "Stylist");
        assert!(customer.is_online);
        assert!(!provider.is_online);

        match provider.role {
            Some(RoleTag::Provider) => (),
            _ => panic!("Expected Provider role"),
        }
    }

    #[test]
    fn test_contact_json_shape() {
        let json = r#"{
            "id": "u-7",
            "displayName": "Front Desk",
            "role": "admin",
            "isOnline": true,
            "unreadCount": 3
        }"#;

        let contact: Contact = serde_json::from_str(json).unwrap();
        assert_eq!(contact.id, "u-7");
        assert_eq!(contact.role, Some(RoleTag::Admin));
        assert!(contact.is_online);
        assert_eq!(contact.unread_count, 3);
        // Fields the backend omits default cleanly
        assert_eq!(contact.last_message, None);
        assert_eq!(contact.last_message_time, None);
    }

    #[test]
    fn test_message_json_shape() {
        let json = r#"{
            "id": "m-1",
            "senderId": "u-2",
            "senderName": "Billie",
            "body": "hello",
            "createdAt": "2024-03-01T10:00:00Z"
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.id.as_deref(), Some("m-1"));
        assert_eq!(message.sender_id, "u-2");
        assert_eq!(message.body, "hello");

        // A socket-only message has no server id
        let no_id = r#"{
            "senderId": "u-2",
            "senderName": "Billie",
            "body": "hi",
            "createdAt": "2024-03-01T10:00:01Z"
        }"#;
        let message: Message = serde_json::from_str(no_id).unwrap();
        assert_eq!(message.id, None);
    }

    #[test]
    fn test_contact_from_first_message() {
        let contact = Contact::from_first_message("u-9", "New Customer");
        assert_eq!(contact.id, "u-9");
        assert_eq!(contact.display_name, "New Customer");
        assert_eq!(contact.role, None);
        assert_eq!(contact.unread_count, 0);
        assert_eq!(contact.last_message_time, None);
    }
}
