//! Typed real-time events. One envelope shape for every event:
//! a "type" tag in "object.action" form plus the data the event needs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::attachment::AttachmentDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChatEvent {
    #[serde(rename = "message.new")]
    MessageNew {
        channel_id: Uuid,
        message_id: Uuid,
        sender_id: Uuid,
        body: Option<String>,
        attachment: Option<AttachmentDescriptor>,
        created_at: String,
    },

    #[serde(rename = "messages.seen")]
    MessagesSeen { channel_id: Uuid, seen_by: Uuid },

    #[serde(rename = "message.deleted")]
    MessageDeleted { channel_id: Uuid, message_id: Uuid },
}

impl ChatEvent {
    pub fn to_payload(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_carries_the_type_tag() {
        let event = ChatEvent::MessagesSeen {
            channel_id: Uuid::new_v4(),
            seen_by: Uuid::new_v4(),
        };
        let payload = event.to_payload().unwrap();
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["type"], "messages.seen");
        assert!(value["seen_by"].is_string());
    }

    #[test]
    fn message_new_round_trips() {
        let event = ChatEvent::MessageNew {
            channel_id: Uuid::new_v4(),
            message_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            body: Some("hi".into()),
            attachment: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        };
        let parsed: ChatEvent = serde_json::from_str(&event.to_payload().unwrap()).unwrap();
        assert!(matches!(parsed, ChatEvent::MessageNew { body: Some(b), .. } if b == "hi"));
    }
}
