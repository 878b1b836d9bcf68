//! Message record model for persistence.
//!
//! The stored unit for both storage variants. Serialized as JSON when
//! persisted, so fields added after records were first written must
//! tolerate being absent; later-added fields carry `#[serde(default)]`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreError;

/// Backend-assigned message identifier, unique within one client instance.
pub type MessageId = i64;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub id: MessageId,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Authored by the local end-user, as opposed to the remote party.
    #[serde(default)]
    pub is_mine: bool,
    /// Client-generated correlation id for an in-flight send; not required
    /// once the record is persisted under its backend-assigned id.
    #[serde(default)]
    pub echo_id: Option<String>,
}

impl MessageRecord {
    /// Creates a record with the current timestamp and no echo id.
    pub fn new(id: MessageId, content: impl Into<String>, is_mine: bool) -> Self {
        Self {
            id,
            content: content.into(),
            created_at: Utc::now(),
            is_mine,
            echo_id: None,
        }
    }

    /// Attaches a generated correlation id, for records created on the send
    /// path before the backend has confirmed them.
    pub fn with_echo_id(mut self) -> Self {
        self.echo_id = Some(Uuid::new_v4().to_string());
        self
    }

    /// Checks the invariants a record must satisfy before it is stored.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.id <= 0 {
            return Err(StoreError::InvalidRecord(format!(
                "message id must be positive, got {}",
                self.id
            )));
        }
        if self.content.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "message content is empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_well_formed_record() {
        assert!(MessageRecord::new(1, "hello", false).validate().is_ok());
    }

    #[test]
    fn validate_rejects_non_positive_id() {
        let record = MessageRecord::new(0, "hello", false);
        assert!(matches!(
            record.validate(),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn validate_rejects_blank_content() {
        let record = MessageRecord::new(7, "   ", true);
        assert!(matches!(
            record.validate(),
            Err(StoreError::InvalidRecord(_))
        ));
    }

    #[test]
    fn with_echo_id_generates_correlation_id() {
        let record = MessageRecord::new(1, "pending", true).with_echo_id();
        assert!(record.echo_id.is_some());
    }

    #[test]
    fn decodes_json_written_by_older_schema() {
        // Rows written before is_mine / echo_id existed carry neither field.
        let legacy = r#"{"id":42,"content":"old","created_at":"2023-05-01T10:00:00Z"}"#;
        let record: MessageRecord = serde_json::from_str(legacy).unwrap();
        assert_eq!(record.id, 42);
        assert!(!record.is_mine);
        assert!(record.echo_id.is_none());
    }
}
