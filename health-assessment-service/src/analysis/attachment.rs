use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Inline payloads above this size are refused by the model API.
pub const MAX_ATTACHMENT_BYTES: usize = 20 * 1024 * 1024;

const PDF_MEDIA_TYPE: &str = "application/pdf";

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("attachment is empty")]
    Empty,

    #[error("attachment is {size} bytes, the limit is {MAX_ATTACHMENT_BYTES}")]
    TooLarge { size: usize },

    #[error("unsupported attachment type: only images and PDF documents are accepted")]
    Unsupported,

    #[error("failed to encode attachment: {0}")]
    Encoding(String),
}

/// An uploaded lab report or symptom photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub file_name: String,
    pub media_type: String,
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

/// Transport-safe form of an attachment, ready to be inlined into a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineFile {
    pub data: String,
    pub mime_type: String,
}

impl Attachment {
    /// Validate an upload. The declared content type is trusted when it is an
    /// image or PDF type, otherwise the type is sniffed from the bytes.
    pub fn from_upload(
        file_name: impl Into<String>,
        declared_type: Option<&str>,
        data: Vec<u8>,
    ) -> Result<Self, AttachmentError> {
        if data.is_empty() {
            return Err(AttachmentError::Empty);
        }
        if data.len() > MAX_ATTACHMENT_BYTES {
            return Err(AttachmentError::TooLarge { size: data.len() });
        }

        let media_type = declared_type
            .map(|t| t.split(';').next().unwrap_or(t).trim().to_ascii_lowercase())
            .filter(|t| is_accepted(t))
            .or_else(|| sniff_media_type(&data))
            .ok_or(AttachmentError::Unsupported)?;

        Ok(Self {
            file_name: file_name.into(),
            media_type,
            data,
        })
    }

    /// Encode the attachment for inclusion in an analysis request.
    pub async fn to_inline_file(&self) -> Result<InlineFile, AttachmentError> {
        let data = self.data.clone();
        let encoded = tokio::task::spawn_blocking(move || STANDARD.encode(data))
            .await
            .map_err(|e| AttachmentError::Encoding(e.to_string()))?;

        debug!(
            file_name = %self.file_name,
            media_type = %self.media_type,
            encoded_len = encoded.len(),
            "Encoded attachment"
        );

        Ok(InlineFile {
            data: encoded,
            mime_type: self.media_type.clone(),
        })
    }
}

fn is_accepted(media_type: &str) -> bool {
    media_type == PDF_MEDIA_TYPE || (media_type.starts_with("image/") && media_type.len() > 6)
}

fn sniff_media_type(data: &[u8]) -> Option<String> {
    if data.starts_with(b"%PDF-") {
        return Some(PDF_MEDIA_TYPE.to_string());
    }
    image::guess_format(data)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(D::Error::custom)
    }
}
