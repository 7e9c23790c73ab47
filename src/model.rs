//! File transport types and their validation schemas

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::deserialize_opt_id;
use crate::status::Status;
use crate::validation::{self, Field, FieldKind, Schema};

/// Metadata attached to a stored file
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileMetadata {
    /// Account that uploaded the file (reference only)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_opt_id"
    )]
    pub uploader_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dt: Option<DateTime<Utc>>,
}

/// A file as it travels between client and server
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileData {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_opt_id"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<FileMetadata>,
    /// Payload, base64 on the wire
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_bytes")]
    pub data: Option<Vec<u8>>,
}

impl FileData {
    /// Build an upload stamped with the current time
    pub fn for_upload(content_type: &str, data: Vec<u8>) -> Self {
        Self {
            id: None,
            content_type: Some(content_type.to_string()),
            metadata: Some(FileMetadata {
                uploader_id: None,
                upload_dt: Some(Utc::now()),
            }),
            data: Some(data),
        }
    }

    /// Run the `FILE_DATA` schema against this value
    pub fn validate(status: &mut Status, data: Option<&FileData>, required: &[&str]) {
        match data.map(serde_json::to_value) {
            None => validation::validate(status, None, &FILE_DATA, required),
            Some(Ok(value)) => validation::validate(status, Some(&value), &FILE_DATA, required),
            Some(Err(_)) => {
                status.set_error(FILE_DATA.entity_key, "file could not be encoded");
            }
        }
    }
}

pub static FILE_METADATA: Schema = Schema {
    entity_key: "filemeta.err",
    missing: "file metadata not given",
    fields: &[
        Field {
            name: "uploader_id",
            kind: FieldKind::Identifier,
            missing: "uploader id missing",
            invalid: "invalid uploader id",
        },
        Field {
            name: "upload_dt",
            kind: FieldKind::Timestamp,
            missing: "upload date missing",
            invalid: "invalid upload date",
        },
    ],
};

pub static FILE_DATA: Schema = Schema {
    entity_key: "file.err",
    missing: "data not given",
    fields: &[
        Field {
            name: "id",
            kind: FieldKind::Identifier,
            missing: "file id missing",
            invalid: "invalid file id",
        },
        Field {
            name: "content_type",
            kind: FieldKind::ContentType,
            missing: "content type missing",
            invalid: "file content type missing",
        },
        // Stricter than any outer call: nested metadata must always carry its upload date
        Field {
            name: "metadata",
            kind: FieldKind::Nested {
                schema: &FILE_METADATA,
                required: &["upload_dt"],
            },
            missing: "metadata missing",
            invalid: "invalid file metadata",
        },
        Field {
            name: "data",
            kind: FieldKind::Binary,
            missing: "data missing",
            invalid: "invalid file data",
        },
    ],
};

/// Optional byte payloads encoded as standard base64 strings
pub mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match data {
            Some(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
