//! Error types shared across the mission engine.
use crate::compiler::{NodeId, OptionId};
use crate::validate::ContentError;
use thiserror::Error;

/// Failures raised while compiling or running a mission.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("scenario content is invalid ({} problem(s)): {}", .0.len(), join_errors(.0))]
    InvalidContent(Vec<ContentError>),
    #[error("unknown scenario '{0}'")]
    UnknownScenario(String),
    #[error("no mission is running")]
    NoActiveRun,
    #[error("node {0} does not exist in this run")]
    UnknownNode(NodeId),
    #[error("node {node} has no option {option}")]
    UnknownOption { node: NodeId, option: OptionId },
    #[error("node {node} has no option labelled '{label}'")]
    UnknownLabel { node: NodeId, label: String },
}

fn join_errors(errors: &[ContentError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failures reported by a result sink.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("result sink rejected the payload: {0}")]
    Rejected(String),
}

/// Failures raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("{field} must be between {min} and {max} (got {value})")]
    RangeViolation {
        field: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },
    #[error("tier thresholds out of order (high {high} < medium {medium})")]
    ThresholdOrder { high: u8, medium: u8 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_content_lists_every_problem() {
        let err = EngineError::InvalidContent(vec![
            ContentError::EmptyId,
            ContentError::MissingStart {
                scenario: "x".to_string(),
                start: "s0".to_string(),
            },
        ]);
        let message = err.to_string();
        assert!(message.contains("2 problem(s)"));
        assert!(message.contains("empty id"));
        assert!(message.contains("missing step 's0'"));
    }
}
