pub mod attachment;
pub mod channel;
pub mod message;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use attachment::{AttachmentDescriptor, AttachmentKind};
pub use channel::Channel;
pub use message::{Message, MessageSummary};

/// Identity-provider record, read-only from this service's perspective.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}
