//! Response envelope.
//!
//! Every platform endpoint wraps its payload in a `data` field.

use serde::{Deserialize, Serialize};

/// Standard response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    /// The wrapped payload.
    pub data: T,
    /// Server-assigned correlation id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}
