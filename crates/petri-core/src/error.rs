//! Error types.
//!
//! 境界ごとにエラー型を分ける:
//! - **ConfigError**: build 時（モデル → Net の解決）。Net は起動されない。
//! - **InvariantViolation**: 起きてはいけない内部欠陥。ワーカーを止める。
//! - **NetError**: 起動・監視・外部操作の境界。

use thiserror::Error;

use crate::domain::NodeKind;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("arc `{arc}` references unknown name `{name}`")]
    UnknownName { arc: String, name: String },

    #[error("arc `{arc}` connects two {kind}s")]
    SameKindEndpoints { arc: String, kind: NodeKind },

    #[error("name `{0}` is declared more than once")]
    DuplicateName(String),

    #[error("arc `{arc}` has non-positive weight {weight}")]
    NonPositiveWeight { arc: String, weight: i64 },

    #[error("place `{place}` has negative initial count {count}")]
    NegativeInitialCount { place: String, count: i64 },

    #[error("{0} name must not be empty")]
    EmptyName(NodeKind),

    #[error("parallel arcs between `{place}` and `{transition}` exceed the maximum weight")]
    WeightOverflow { transition: String, place: String },
}

/// A broken safety invariant. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("place `{place}` would go negative: count={count}, debit={amount}")]
    NegativeCount { place: String, count: u64, amount: u64 },

    #[error("place `{place}` would overflow: count={count}, credit={amount}")]
    CountOverflow { place: String, count: u64, amount: u64 },

    #[error("lock on place #{next} requested after place #{held}")]
    LockOrder { held: usize, next: usize },
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error("transition `{transition}` aborted: {source}")]
    Invariant {
        transition: String,
        #[source]
        source: InvariantViolation,
    },

    #[error(transparent)]
    Violation(#[from] InvariantViolation),

    #[error("net `{0}` is already running")]
    AlreadyStarted(String),

    #[error("unknown place `{0}`")]
    UnknownPlace(String),

    #[error("worker for `{transition}` panicked: {message}")]
    WorkerPanicked { transition: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_messages_name_the_offender() {
        let err = ConfigError::SameKindEndpoints {
            arc: "p0->p1".to_string(),
            kind: NodeKind::Place,
        };
        assert_eq!(err.to_string(), "arc `p0->p1` connects two places");

        let err = ConfigError::UnknownName {
            arc: "p0->tx".to_string(),
            name: "tx".to_string(),
        };
        assert!(err.to_string().contains("`tx`"));
    }

    #[test]
    fn net_error_keeps_violation_as_source() {
        let err = NetError::Invariant {
            transition: "t0".to_string(),
            source: InvariantViolation::LockOrder { held: 3, next: 1 },
        };
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("lock on place #1 requested after place #3")
        );
    }
}
