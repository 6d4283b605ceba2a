use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Image,
    File,
}

/// Structured metadata describing an uploaded file attached to a message,
/// stored as JSONB alongside the message row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDescriptor {
    pub stored_name: String,
    pub original_name: String,
}

impl AttachmentDescriptor {
    /// Parse the stored JSON column. Malformed metadata reads as "no
    /// attachment" rather than a hard failure.
    pub fn from_value(value: Option<&serde_json::Value>) -> Option<Self> {
        value.and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn classification(&self, allowed_images: &[String]) -> AttachmentKind {
        classify(&self.stored_name, allowed_images)
    }
}

pub fn extension(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// An extension on the image allow-list classifies as Image (match is
/// case-sensitive against the list); everything else is File.
pub fn classify(stored_name: &str, allowed_images: &[String]) -> AttachmentKind {
    match extension(stored_name) {
        Some(ext) if allowed_images.iter().any(|a| a == ext) => AttachmentKind::Image,
        _ => AttachmentKind::File,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn images() -> Vec<String> {
        vec!["jpg".to_string(), "png".to_string()]
    }

    #[test]
    fn jpg_classifies_as_image() {
        assert_eq!(classify("photo.jpg", &images()), AttachmentKind::Image);
    }

    #[test]
    fn pdf_classifies_as_file() {
        assert_eq!(classify("doc.pdf", &images()), AttachmentKind::File);
    }

    #[test]
    fn extensionless_name_classifies_as_file() {
        assert_eq!(classify("README", &images()), AttachmentKind::File);
    }

    #[test]
    fn list_match_is_case_sensitive() {
        assert_eq!(classify("photo.JPG", &images()), AttachmentKind::File);
    }

    #[test]
    fn malformed_stored_json_reads_as_no_attachment() {
        let bad = serde_json::json!({"name": "photo.jpg"});
        assert_eq!(AttachmentDescriptor::from_value(Some(&bad)), None);
        assert_eq!(AttachmentDescriptor::from_value(None), None);

        let good = serde_json::json!({"stored_name": "a.png", "original_name": "My Pic.png"});
        let desc = AttachmentDescriptor::from_value(Some(&good)).unwrap();
        assert_eq!(desc.stored_name, "a.png");
        assert_eq!(desc.classification(&images()), AttachmentKind::Image);
    }
}
