use serde::{Deserialize, Serialize};
use std::fmt;

use crate::orderbook::types::OrderId;

/// Run-terminating conditions surfaced by the replay engine.
///
/// Expected feed anomalies (unknown ids, duplicate adds, oversized
/// executes) never reach this enum; they are absorbed by the book and
/// counted. Only contract violations of the decoded record stream abort a
/// run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReplayError {
    /// Add event without an explicit side
    MissingSide {
        order_id: OrderId,
        instrument: String,
    },

    /// Replace event without its replacement fields
    MissingReplacement {
        order_id: OrderId,
        instrument: String,
    },

    /// The engine already consumed its event sequence
    ReplayFinished,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayError::MissingSide {
                order_id,
                instrument,
            } => write!(
                f,
                "add event for order {} on {} carries no side",
                order_id, instrument
            ),
            ReplayError::MissingReplacement {
                order_id,
                instrument,
            } => write!(
                f,
                "replace event for order {} on {} carries no replacement fields",
                order_id, instrument
            ),
            ReplayError::ReplayFinished => write!(f, "replay already finished"),
        }
    }
}

impl std::error::Error for ReplayError {}

/// Result type for replay operations
pub type ReplayResult<T> = Result<T, ReplayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            ReplayError::MissingSide {
                order_id: 7,
                instrument: "AAPL".to_string()
            }
            .to_string(),
            "add event for order 7 on AAPL carries no side"
        );
        assert_eq!(
            ReplayError::ReplayFinished.to_string(),
            "replay already finished"
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = ReplayError::MissingReplacement {
            order_id: 9,
            instrument: "MSFT".to_string(),
        };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: ReplayError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}
