use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::attachment::{AttachmentDescriptor, AttachmentKind};

/// Immutable once created, except for the `seen` flag.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub body: Option<String>,
    pub attachment: Option<serde_json::Value>,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn attachment_descriptor(&self) -> Option<AttachmentDescriptor> {
        AttachmentDescriptor::from_value(self.attachment.as_ref())
    }

    /// Pure data assembly for the presentation layer; no markup is
    /// produced here.
    pub fn summarize(&self, viewer_id: Uuid, allowed_images: &[String]) -> MessageSummary {
        let attachment = self.attachment_descriptor().map(|desc| SummaryAttachment {
            kind: desc.classification(allowed_images),
            title: escape_html(desc.original_name.trim()),
            file: desc.stored_name,
        });
        MessageSummary {
            id: self.id,
            channel_id: self.channel_id,
            sender_id: self.sender_id,
            body: self.body.clone(),
            attachment,
            seen: self.seen,
            time_ago: time_ago(self.created_at, Utc::now()),
            created_at: self.created_at.to_rfc3339(),
            is_sender: self.sender_id == viewer_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryAttachment {
    pub file: String,
    /// Original filename, trimmed and HTML-escaped so a later render
    /// cannot be used for markup injection.
    pub title: String,
    pub kind: AttachmentKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageSummary {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub sender_id: Uuid,
    pub body: Option<String>,
    pub attachment: Option<SummaryAttachment>,
    pub seen: bool,
    pub time_ago: String,
    pub created_at: String,
    pub is_sender: bool,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Coarse relative time for conversation lists.
pub fn time_ago(from: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - from).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3599 => format!("{}m ago", secs / 60),
        3600..=86_399 => format!("{}h ago", secs / 3600),
        86_400..=604_799 => format!("{}d ago", secs / 86_400),
        _ => from.format("%Y-%m-%d").to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn message_with(attachment: Option<serde_json::Value>, sender: Uuid) -> Message {
        Message {
            id: Uuid::new_v4(),
            channel_id: Uuid::new_v4(),
            sender_id: sender,
            body: Some("hi".into()),
            attachment,
            seen: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<img src="x" onerror='y'> & more"#),
            "&lt;img src=&quot;x&quot; onerror=&#39;y&#39;&gt; &amp; more"
        );
        assert_eq!(escape_html("plain.jpg"), "plain.jpg");
    }

    #[test]
    fn summary_title_is_trimmed_and_escaped() {
        let sender = Uuid::new_v4();
        let msg = message_with(
            Some(serde_json::json!({
                "stored_name": "abc123.jpg",
                "original_name": "  <b>My Photo</b>.jpg  "
            })),
            sender,
        );
        let summary = msg.summarize(sender, &["jpg".to_string()]);
        let att = summary.attachment.unwrap();
        assert_eq!(att.title, "&lt;b&gt;My Photo&lt;/b&gt;.jpg");
        assert_eq!(att.file, "abc123.jpg");
        assert_eq!(att.kind, AttachmentKind::Image);
        assert!(summary.is_sender);
    }

    #[test]
    fn summary_marks_viewer_side() {
        let msg = message_with(None, Uuid::new_v4());
        let summary = msg.summarize(Uuid::new_v4(), &[]);
        assert!(!summary.is_sender);
        assert!(summary.attachment.is_none());
    }

    #[test]
    fn time_ago_buckets() {
        let now = Utc::now();
        assert_eq!(time_ago(now - Duration::seconds(30), now), "just now");
        assert_eq!(time_ago(now - Duration::minutes(5), now), "5m ago");
        assert_eq!(time_ago(now - Duration::hours(3), now), "3h ago");
        assert_eq!(time_ago(now - Duration::days(2), now), "2d ago");
    }

    #[test]
    fn future_timestamps_clamp_to_just_now() {
        let now = Utc::now();
        assert_eq!(time_ago(now + Duration::minutes(2), now), "just now");
    }
}
