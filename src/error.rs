use std::fmt;

use thiserror::Error;

/// Which of the five failure kinds an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Generation,
    Parse,
    Input,
    Initialization,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::NotFound => "Not found",
            FailureKind::Generation => "Generation failure",
            FailureKind::Parse => "Parse failure",
            FailureKind::Input => "Input failure",
            FailureKind::Initialization => "Initialization failure",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum ReconError {
    #[error("transaction '{txn_id}' not found in core banking data")]
    NotFound { txn_id: String },

    #[error("investigation of '{txn_id}' failed: {reason}")]
    Generation { txn_id: String, reason: String },

    #[error("could not parse investigation reply for '{txn_id}': {reason}")]
    Parse { txn_id: String, reason: String },

    #[error("invalid batch upload: {0}")]
    Input(String),

    #[error("failed to initialize {what}: {reason}")]
    Initialization { what: String, reason: String },
}

impl ReconError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ReconError::NotFound { .. } => FailureKind::NotFound,
            ReconError::Generation { .. } => FailureKind::Generation,
            ReconError::Parse { .. } => FailureKind::Parse,
            ReconError::Input(_) => FailureKind::Input,
            ReconError::Initialization { .. } => FailureKind::Initialization,
        }
    }

    pub(crate) fn init(what: impl Into<String>, reason: impl fmt::Display) -> Self {
        ReconError::Initialization {
            what: what.into(),
            reason: reason.to_string(),
        }
    }
}

pub type ReconResult<T> = Result<T, ReconError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_distinct() {
        let errors = [
            ReconError::NotFound {
                txn_id: "TXN1".into(),
            },
            ReconError::Generation {
                txn_id: "TXN1".into(),
                reason: "timed out".into(),
            },
            ReconError::Parse {
                txn_id: "TXN1".into(),
                reason: "bad records".into(),
            },
            ReconError::Input("missing column".into()),
            ReconError::init("ledger 'cbs'", "file missing"),
        ];
        let labels: std::collections::HashSet<String> =
            errors.iter().map(|e| e.kind().to_string()).collect();
        assert_eq!(labels.len(), 5);
    }

    #[test]
    fn test_messages_carry_context() {
        let err = ReconError::Generation {
            txn_id: "TXN9".into(),
            reason: "HTTP 503".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("TXN9"));
        assert!(msg.contains("HTTP 503"));
    }
}
