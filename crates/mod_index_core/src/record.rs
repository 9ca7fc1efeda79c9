use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keys::normalize_identifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Removed,
}

impl RecordStatus {
    pub const ALL: [RecordStatus; 5] = [
        Self::Draft,
        Self::Pending,
        Self::Approved,
        Self::Rejected,
        Self::Removed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Removed => "removed",
        }
    }

    /// Case-insensitive parse of the wire name.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(value))
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub status: RecordStatus,
    pub category: String,
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub author_id: String,
    pub customer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_display_name: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Loosely-typed shape of a stored record document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    id: String,
    status: String,
    #[serde(default)]
    category: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    author_id: String,
    #[serde(default)]
    customer_id: Option<String>,
    #[serde(default)]
    customer_display_name: Option<String>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed JSON document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record identifier is empty after normalization")]
    InvalidIdentifier,
    #[error("unknown record status '{0}'")]
    UnknownStatus(String),
}

/// Validates a fetched document into a [`Record`] with a normalized id.
pub fn decode_record(bytes: &[u8]) -> Result<Record, DecodeError> {
    let stored: StoredRecord = serde_json::from_slice(bytes)?;

    let id = normalize_identifier(&stored.id);
    if id.is_empty() {
        return Err(DecodeError::InvalidIdentifier);
    }

    let status =
        RecordStatus::parse(&stored.status).ok_or(DecodeError::UnknownStatus(stored.status))?;

    Ok(Record {
        id,
        status,
        category: stored.category,
        title: stored.title,
        description: stored.description,
        tags: stored.tags,
        author_id: stored.author_id,
        customer_id: stored.customer_id.filter(|value| !value.trim().is_empty()),
        customer_display_name: stored.customer_display_name,
        updated_at: stored.updated_at,
    })
}

/// Decodes an identifier list document (a JSON array of strings).
pub fn decode_identifier_list(bytes: &[u8]) -> Result<Vec<String>, DecodeError> {
    Ok(serde_json::from_slice(bytes)?)
}
