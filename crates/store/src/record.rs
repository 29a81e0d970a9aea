use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tracked view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Identifier of the viewed item.
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

impl Record {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
        }
    }

    /// A view of `id` happening right now.
    pub fn now(id: impl Into<String>) -> Self {
        Self::new(id, Utc::now())
    }
}
