//! Attachment records stored in the internal attachment table

use serde::{Deserialize, Serialize};

/// File information reported by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInformation {
    pub fieldname: String,
    pub originalname: String,
    pub encoding: String,
    pub mimetype: String,
    pub destination: String,
    pub filename: String,
    pub path: String,
    pub size: u64,
    pub format: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentMetadata {
    #[serde(default)]
    pub thumbnails: Vec<serde_json::Value>,
    #[serde(default)]
    pub clips: Vec<serde_json::Value>,
}

/// An uploaded file as it appears in the raw value of an attachment column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub collection_name: String,
    pub file_information: FileInformation,
    #[serde(default)]
    pub metadata: AttachmentMetadata,
    pub base_id: String,
    pub storage_adaptor: String,
    #[serde(rename = "_id")]
    pub id: String,
}

/// Compact column value derived from an attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentColumnValue {
    pub url: String,
    pub file_type: String,
    pub size: u64,
}

impl Attachment {
    pub fn to_column_value(&self) -> AttachmentColumnValue {
        AttachmentColumnValue {
            url: self.file_information.path.clone(),
            file_type: self.file_information.mimetype.clone(),
            size: self.file_information.size,
        }
    }
}
