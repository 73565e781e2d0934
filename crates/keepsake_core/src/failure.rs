//! Executor failure descriptions as stored on a record.

use serde::{Deserialize, Serialize};

/// Whether a failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Retried on a later pass, subject to the failure threshold
    #[display("transient")]
    Transient,
    /// Quarantines the record immediately
    #[display("permanent")]
    Permanent,
}

/// A failure recorded against a media record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct Failure {
    /// Human-readable error message
    message: String,
    /// Retry classification
    class: FailureClass,
}

impl Failure {
    /// A failure that should be retried on a later pass.
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            class: FailureClass::Transient,
        }
    }

    /// A failure that quarantines the record immediately.
    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            class: FailureClass::Permanent,
        }
    }

    /// Whether the record should be quarantined without reaching the threshold.
    pub fn is_permanent(&self) -> bool {
        self.class == FailureClass::Permanent
    }

    /// Whether a record with `error_count` failures (this one included)
    /// should be quarantined.
    pub fn quarantines(&self, error_count: u32, max_failures: u32) -> bool {
        self.is_permanent() || error_count >= max_failures
    }
}
