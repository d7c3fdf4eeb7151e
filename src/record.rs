use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A single DNS resource record as exchanged with providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    #[serde(rename = "type")]
    pub record_type: String,
    pub value: String,
}

impl Record {
    pub fn new(name: impl Into<String>, record_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            record_type: record_type.into(),
            value: value.into(),
        }
    }

    pub fn txt(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, "TXT", value)
    }
}

/// Lists the records of a zone.
#[async_trait]
pub trait RecordGetter: Send + Sync {
    async fn get_records(&self, zone: &str) -> Result<Vec<Record>>;
}

/// Adds records to a zone, returning the records that were added.
#[async_trait]
pub trait RecordAppender: Send + Sync {
    async fn append_records(&self, zone: &str, records: Vec<Record>) -> Result<Vec<Record>>;
}

/// Creates or overwrites records in a zone, returning the records that were set.
#[async_trait]
pub trait RecordSetter: Send + Sync {
    async fn set_records(&self, zone: &str, records: Vec<Record>) -> Result<Vec<Record>>;
}

/// Removes records from a zone, returning the records that were deleted.
#[async_trait]
pub trait RecordDeleter: Send + Sync {
    async fn delete_records(&self, zone: &str, records: Vec<Record>) -> Result<Vec<Record>>;
}
