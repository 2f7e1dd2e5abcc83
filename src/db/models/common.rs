//! Shared response envelopes.

use serde::Serialize;

/// Plain acknowledgement body: `{"message": "..."}`.
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Acknowledgement carrying the id of a newly created row.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedResponse {
    pub message: String,
    pub id: i64,
}
