use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Diagnostic events outside the fetch flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GeneralEvent {
    /// Debug logging with structured context
    DebugLog {
        message: String,
        context: HashMap<String, String>,
    },
}

impl GeneralEvent {
    /// Create a debug log event
    pub fn debug(message: impl Into<String>) -> Self {
        Self::DebugLog {
            message: message.into(),
            context: HashMap::new(),
        }
    }

    /// Create a debug log event with context
    pub fn debug_with_context(
        message: impl Into<String>,
        context: HashMap<String, String>,
    ) -> Self {
        Self::DebugLog {
            message: message.into(),
            context,
        }
    }
}
