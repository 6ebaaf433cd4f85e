//! Operator catalogue of the differentiation graph.
//!
//! [`OperatorKind::retained_snapshots`] is the memory-pruning table: given
//! which arguments are themselves differentiable, it reports which argument
//! snapshots any derivative formula of that kind will read. Everything else is
//! dropped when the node is built.

use std::fmt;

/// Kind of operation recorded by an [`OperatorNode`](crate::aad::OperatorNode).
///
/// Argument order follows the method that records it: `X` is the receiver,
/// `Y` and `Z` the further operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    /// Leaf created directly from values; has no arguments.
    Independent,
    Add,
    Sub,
    Mult,
    Div,
    /// `min(X, Y)`.
    Cap,
    /// `max(X, Y)`.
    Floor,
    /// `X^p` with a non-differentiable exponent `p` as second snapshot.
    Pow,
    Squared,
    Sqrt,
    Exp,
    Log,
    Sin,
    Cos,
    Abs,
    /// `1 / X`.
    Invert,
    /// `X + Y * Z`.
    AddProduct,
    /// `X + Y / Z`.
    AddRatio,
    /// `X - Y / Z`.
    SubRatio,
    /// `X * (1 + Y * Z)`.
    Accrue,
    /// `X / (1 + Y * Z)`.
    Discount,
    /// `Y` where `X >= 0`, `Z` elsewhere.
    Barrier,
    Average,
    Variance,
    StandardDeviation,
    StandardError,
    Min,
    Max,
    /// `sum_i X_i P_i`.
    AverageWeighted,
    VarianceWeighted,
    StandardDeviationWeighted,
    StandardErrorWeighted,
    /// Empirical quantile; not differentiable.
    Quantile,
    /// Projection through a conditional-expectation estimator.
    ConditionalExpectation,
    /// Arbitrary user function; not differentiable.
    Apply,
}

impl OperatorKind {
    /// Every kind, in declaration order.
    pub const ALL: [Self; 35] = [
        Self::Independent,
        Self::Add,
        Self::Sub,
        Self::Mult,
        Self::Div,
        Self::Cap,
        Self::Floor,
        Self::Pow,
        Self::Squared,
        Self::Sqrt,
        Self::Exp,
        Self::Log,
        Self::Sin,
        Self::Cos,
        Self::Abs,
        Self::Invert,
        Self::AddProduct,
        Self::AddRatio,
        Self::SubRatio,
        Self::Accrue,
        Self::Discount,
        Self::Barrier,
        Self::Average,
        Self::Variance,
        Self::StandardDeviation,
        Self::StandardError,
        Self::Min,
        Self::Max,
        Self::AverageWeighted,
        Self::VarianceWeighted,
        Self::StandardDeviationWeighted,
        Self::StandardErrorWeighted,
        Self::Quantile,
        Self::ConditionalExpectation,
        Self::Apply,
    ];

    /// Number of argument slots recorded for this kind.
    pub fn arity(self) -> usize {
        match self {
            Self::Independent => 0,
            Self::Squared
            | Self::Sqrt
            | Self::Exp
            | Self::Log
            | Self::Sin
            | Self::Cos
            | Self::Abs
            | Self::Invert
            | Self::Average
            | Self::Variance
            | Self::StandardDeviation
            | Self::StandardError
            | Self::Min
            | Self::Max
            | Self::Quantile
            | Self::ConditionalExpectation
            | Self::Apply => 1,
            Self::Add
            | Self::Sub
            | Self::Mult
            | Self::Div
            | Self::Cap
            | Self::Floor
            | Self::Pow
            | Self::AverageWeighted
            | Self::VarianceWeighted
            | Self::StandardDeviationWeighted
            | Self::StandardErrorWeighted => 2,
            Self::AddProduct
            | Self::AddRatio
            | Self::SubRatio
            | Self::Accrue
            | Self::Discount
            | Self::Barrier => 3,
        }
    }

    /// True for kinds that collapse the path dimension into a deterministic
    /// result. Their incoming adjoint is path-averaged before propagation.
    pub fn is_path_reduction(self) -> bool {
        matches!(
            self,
            Self::Average
                | Self::Variance
                | Self::StandardDeviation
                | Self::StandardError
                | Self::Min
                | Self::Max
                | Self::AverageWeighted
                | Self::VarianceWeighted
                | Self::StandardDeviationWeighted
                | Self::StandardErrorWeighted
                | Self::Quantile
        )
    }

    /// Which argument snapshots must be kept, given which arguments are
    /// differentiable.
    ///
    /// A snapshot is retained exactly when a partial derivative with respect
    /// to some differentiable argument reads it. The result has one entry per
    /// argument slot.
    pub fn retained_snapshots(self, differentiable: &[bool]) -> Vec<bool> {
        let d = |index: usize| differentiable.get(index).copied().unwrap_or(false);
        let any = differentiable.iter().any(|&flag| flag);
        match self {
            Self::Independent
            | Self::Add
            | Self::Sub
            | Self::Average
            | Self::ConditionalExpectation
            | Self::Quantile
            | Self::Apply => vec![false; self.arity()],
            Self::Mult => vec![d(1), d(0)],
            Self::Div => vec![d(1), any],
            Self::Cap | Self::Floor => vec![any, any],
            Self::Pow => vec![d(0), d(0)],
            Self::Squared
            | Self::Sqrt
            | Self::Exp
            | Self::Log
            | Self::Sin
            | Self::Cos
            | Self::Abs
            | Self::Invert
            | Self::Variance
            | Self::StandardDeviation
            | Self::StandardError
            | Self::Min
            | Self::Max => vec![d(0)],
            Self::AverageWeighted
            | Self::VarianceWeighted
            | Self::StandardDeviationWeighted
            | Self::StandardErrorWeighted => vec![any, any],
            Self::AddProduct => vec![false, d(2), d(1)],
            Self::AddRatio | Self::SubRatio => vec![false, d(2), d(1) || d(2)],
            Self::Accrue => vec![d(1) || d(2), d(0) || d(2), d(0) || d(1)],
            Self::Discount => vec![d(1) || d(2), any, any],
            Self::Barrier => vec![any, d(0), d(0)],
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Independent => "INDEPENDENT",
            Self::Add => "ADD",
            Self::Sub => "SUB",
            Self::Mult => "MULT",
            Self::Div => "DIV",
            Self::Cap => "CAP",
            Self::Floor => "FLOOR",
            Self::Pow => "POW",
            Self::Squared => "SQUARED",
            Self::Sqrt => "SQRT",
            Self::Exp => "EXP",
            Self::Log => "LOG",
            Self::Sin => "SIN",
            Self::Cos => "COS",
            Self::Abs => "ABS",
            Self::Invert => "INVERT",
            Self::AddProduct => "ADDPRODUCT",
            Self::AddRatio => "ADDRATIO",
            Self::SubRatio => "SUBRATIO",
            Self::Accrue => "ACCRUE",
            Self::Discount => "DISCOUNT",
            Self::Barrier => "BARRIER",
            Self::Average => "AVERAGE",
            Self::Variance => "VARIANCE",
            Self::StandardDeviation => "STDEV",
            Self::StandardError => "STDERROR",
            Self::Min => "MIN",
            Self::Max => "MAX",
            Self::AverageWeighted => "AVERAGE_WEIGHTED",
            Self::VarianceWeighted => "VARIANCE_WEIGHTED",
            Self::StandardDeviationWeighted => "STDEV_WEIGHTED",
            Self::StandardErrorWeighted => "STDERROR_WEIGHTED",
            Self::Quantile => "QUANTILE",
            Self::ConditionalExpectation => "CONDITIONAL_EXPECTATION",
            Self::Apply => "APPLY",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
