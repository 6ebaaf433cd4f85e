//! Error taxonomy shared by the random-variable kernels, the operator graph and
//! the gradient engine.

use crate::aad::OperatorKind;

/// Failures surfaced by random-variable arithmetic and differentiation.
///
/// Shape and graph errors are raised eagerly by the operation that violates
/// them. `UnsupportedOperator` is raised lazily, when the backward pass asks a
/// node for a partial derivative its kind does not define.
///
/// Division by zero-valued paths and logarithms of non-positive paths are not
/// errors: they propagate as IEEE NaN / infinity.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RandomVariableError {
    /// The operator kind has no registered partial derivative.
    #[error("operator {kind} not supported for differentiation")]
    UnsupportedOperator { kind: OperatorKind },

    /// Two stochastic operands carry a different number of paths.
    #[error("path count mismatch: {left} paths vs {right} paths")]
    ShapeMismatch { left: usize, right: usize },

    /// Two differentiable operands were recorded on different graphs.
    #[error("operands belong to different graphs")]
    GraphMismatch,

    /// A derivative formula needed an argument snapshot that was pruned at
    /// node construction.
    #[error("argument snapshot {index} of {kind} was pruned but is required")]
    PrunedSnapshot { kind: OperatorKind, index: usize },

    /// A conditional-expectation regression could not be solved.
    #[error("regression failure: {0}")]
    Regression(String),

    /// Graph settings failed validation or could not be parsed.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Input validation error.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_operator_names_the_kind() {
        let err = RandomVariableError::UnsupportedOperator {
            kind: OperatorKind::Quantile,
        };
        assert_eq!(
            err.to_string(),
            "operator QUANTILE not supported for differentiation"
        );
    }

    #[test]
    fn shape_mismatch_reports_both_path_counts() {
        let err = RandomVariableError::ShapeMismatch { left: 4, right: 5 };
        assert_eq!(err.to_string(), "path count mismatch: 4 paths vs 5 paths");
    }

    #[test]
    fn error_trait_is_implemented() {
        let err = RandomVariableError::GraphMismatch;
        let _: &dyn std::error::Error = &err;
    }
}
