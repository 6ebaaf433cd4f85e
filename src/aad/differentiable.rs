//! Module `aad::differentiable`.
//!
//! [`DifferentiableRandomVariable`] pairs a numeric [`RandomVariable`] with the
//! graph node that produced it. Every arithmetic call evaluates the value
//! through the plain kernels and records one [`OperatorNode`] whose arguments
//! are the differentiable operands.

use std::sync::Arc;

use crate::aad::gradient::backward;
use crate::aad::{Gradient, Graph, NodeId, Operand, OperatorKind, OperatorNode};
use crate::core::RandomVariableError;
use crate::estimation::ConditionalExpectationEstimator;
use crate::stochastic::RandomVariable;

/// Operand resolved against the receiver's graph.
struct Resolved {
    node: Option<Arc<OperatorNode>>,
    values: RandomVariable,
}

/// Random variable that records its construction on a [`Graph`].
///
/// Values are immutable. Cloning is cheap and shares both the node and the
/// realizations.
///
/// # Examples
/// ```rust
/// use ferric_rv::aad::Graph;
///
/// let graph = Graph::new();
/// let x = graph.stochastic(0.0, vec![1.0, 2.0, 3.0]);
/// let y = x.mult(&x).unwrap().add(&x).unwrap();
///
/// let gradient = y.gradient().unwrap();
/// assert_eq!(gradient.get(&x).unwrap().to_vec(), vec![3.0, 5.0, 7.0]);
/// ```
#[derive(Debug, Clone)]
pub struct DifferentiableRandomVariable {
    graph: Graph,
    node: Arc<OperatorNode>,
    values: RandomVariable,
}

impl DifferentiableRandomVariable {
    /// Dispatch rank: outranks plain values and scalars.
    pub const TYPE_PRIORITY: i32 = 3;

    pub(crate) fn from_parts(graph: Graph, node: Arc<OperatorNode>, values: RandomVariable) -> Self {
        Self {
            graph,
            node,
            values,
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Numeric value of this variable.
    #[inline]
    pub fn values(&self) -> &RandomVariable {
        &self.values
    }

    #[inline]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    #[inline]
    pub fn node(&self) -> &Arc<OperatorNode> {
        &self.node
    }

    #[inline]
    pub fn type_priority(&self) -> i32 {
        Self::TYPE_PRIORITY
    }

    #[inline]
    pub fn filtration_time(&self) -> f64 {
        self.values.filtration_time()
    }

    #[inline]
    pub fn is_deterministic(&self) -> bool {
        self.values.is_deterministic()
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.values.size()
    }

    /// Fresh leaf on the same graph with the same values. Gradients flowing
    /// into the copy stop there.
    pub fn clone_independent(&self) -> Self {
        self.graph.variable(self.values.clone())
    }

    /// Reverse-mode gradient of this value with respect to every node that
    /// kept an entry (only leaves, unless the graph retains all nodes).
    pub fn gradient(&self) -> Result<Gradient, RandomVariableError> {
        backward(self)
    }

    /// Gradient restricted to the given ids.
    pub fn gradient_wrt(&self, ids: &[NodeId]) -> Result<Gradient, RandomVariableError> {
        Ok(backward(self)?.restricted_to(ids))
    }

    fn own(&self) -> Resolved {
        Resolved {
            node: Some(Arc::clone(&self.node)),
            values: self.values.clone(),
        }
    }

    fn resolve(&self, operand: Operand<'_>) -> Result<Resolved, RandomVariableError> {
        match operand {
            Operand::Scalar(value) => Ok(Resolved {
                node: None,
                values: RandomVariable::deterministic(value),
            }),
            Operand::Plain(value) => Ok(Resolved {
                node: None,
                values: value.clone(),
            }),
            Operand::Differentiable(value) => {
                if !self.graph.same_graph(&value.graph) {
                    return Err(RandomVariableError::GraphMismatch);
                }
                Ok(Resolved {
                    node: Some(Arc::clone(&value.node)),
                    values: value.values.clone(),
                })
            }
        }
    }

    // The id is drawn after the operands are resolved, so every argument id is
    // smaller than the result id.
    fn record(
        &self,
        kind: OperatorKind,
        operands: Vec<Resolved>,
        values: RandomVariable,
        estimator: Option<Arc<dyn ConditionalExpectationEstimator>>,
    ) -> Self {
        let (arguments, snapshots): (Vec<_>, Vec<_>) = operands
            .into_iter()
            .map(|operand| (operand.node, operand.values))
            .unzip();
        let node = OperatorNode::new(self.graph.next_id(), kind, arguments, snapshots, estimator);
        Self::from_parts(self.graph.clone(), Arc::new(node), values)
    }

    fn unary(&self, kind: OperatorKind, values: RandomVariable) -> Self {
        self.record(kind, vec![self.own()], values, None)
    }

    fn binary<F>(
        &self,
        kind: OperatorKind,
        other: Operand<'_>,
        eval: F,
    ) -> Result<Self, RandomVariableError>
    where
        F: FnOnce(&RandomVariable, &RandomVariable) -> Result<RandomVariable, RandomVariableError>,
    {
        let other = self.resolve(other)?;
        let values = eval(&self.values, &other.values)?;
        Ok(self.record(kind, vec![self.own(), other], values, None))
    }

    /// Records `other <kind> self`; the receiver becomes the second argument.
    fn reflected<F>(
        &self,
        kind: OperatorKind,
        other: Operand<'_>,
        eval: F,
    ) -> Result<Self, RandomVariableError>
    where
        F: FnOnce(&RandomVariable, &RandomVariable) -> Result<RandomVariable, RandomVariableError>,
    {
        let other = self.resolve(other)?;
        let values = eval(&other.values, &self.values)?;
        Ok(self.record(kind, vec![other, self.own()], values, None))
    }

    fn ternary<F>(
        &self,
        kind: OperatorKind,
        second: Operand<'_>,
        third: Operand<'_>,
        eval: F,
    ) -> Result<Self, RandomVariableError>
    where
        F: FnOnce(
            &RandomVariable,
            &RandomVariable,
            &RandomVariable,
        ) -> Result<RandomVariable, RandomVariableError>,
    {
        let second = self.resolve(second)?;
        let third = self.resolve(third)?;
        let values = eval(&self.values, &second.values, &third.values)?;
        Ok(self.record(kind, vec![self.own(), second, third], values, None))
    }

    fn reduction(&self, kind: OperatorKind, value: f64) -> Self {
        self.unary(kind, RandomVariable::deterministic(value))
    }

    fn weighted_reduction<F>(
        &self,
        kind: OperatorKind,
        probabilities: Operand<'_>,
        eval: F,
    ) -> Result<Self, RandomVariableError>
    where
        F: FnOnce(&RandomVariable, &RandomVariable) -> Result<f64, RandomVariableError>,
    {
        self.binary(kind, probabilities, |x, p| {
            Ok(RandomVariable::deterministic(eval(x, p)?))
        })
    }

    // --- binary arithmetic -------------------------------------------------

    pub fn add<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.binary(OperatorKind::Add, other.into(), RandomVariable::add)
    }

    pub fn sub<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.binary(OperatorKind::Sub, other.into(), RandomVariable::sub)
    }

    /// `other - self`.
    pub fn bus<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.reflected(OperatorKind::Sub, other.into(), RandomVariable::sub)
    }

    pub fn mult<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.binary(OperatorKind::Mult, other.into(), RandomVariable::mult)
    }

    pub fn div<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.binary(OperatorKind::Div, other.into(), RandomVariable::div)
    }

    /// `other / self`.
    pub fn vid<'a>(&self, other: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.reflected(OperatorKind::Div, other.into(), RandomVariable::div)
    }

    /// Pathwise `min(self, bound)`.
    pub fn cap<'a>(&self, bound: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.binary(OperatorKind::Cap, bound.into(), RandomVariable::cap)
    }

    /// Pathwise `max(self, bound)`.
    pub fn floor<'a>(&self, bound: impl Into<Operand<'a>>) -> Result<Self, RandomVariableError> {
        self.binary(OperatorKind::Floor, bound.into(), RandomVariable::floor)
    }

    // --- unary arithmetic --------------------------------------------------

    /// `self^exponent`. The exponent is a constant and receives no gradient.
    pub fn pow(&self, exponent: f64) -> Self {
        let values = self.values.pow(exponent);
        let exponent = Resolved {
            node: None,
            values: RandomVariable::deterministic(exponent),
        };
        self.record(OperatorKind::Pow, vec![self.own(), exponent], values, None)
    }

    pub fn squared(&self) -> Self {
        self.unary(OperatorKind::Squared, self.values.squared())
    }

    pub fn sqrt(&self) -> Self {
        self.unary(OperatorKind::Sqrt, self.values.sqrt())
    }

    pub fn exp(&self) -> Self {
        self.unary(OperatorKind::Exp, self.values.exp())
    }

    pub fn log(&self) -> Self {
        self.unary(OperatorKind::Log, self.values.log())
    }

    pub fn sin(&self) -> Self {
        self.unary(OperatorKind::Sin, self.values.sin())
    }

    pub fn cos(&self) -> Self {
        self.unary(OperatorKind::Cos, self.values.cos())
    }

    pub fn abs(&self) -> Self {
        self.unary(OperatorKind::Abs, self.values.abs())
    }

    /// `1 / self`.
    pub fn invert(&self) -> Self {
        self.unary(OperatorKind::Invert, self.values.invert())
    }

    // --- ternary combinators -----------------------------------------------

    /// `if_nonnegative` on paths where `self >= 0`, `if_negative` elsewhere.
    ///
    /// The derivative with respect to the trigger `self` is smoothed over a
    /// window proportional to its standard deviation; see
    /// [`GraphSettings::barrier_smoothing_width`](crate::core::GraphSettings).
    pub fn choose<'a, 'b>(
        &self,
        if_nonnegative: impl Into<Operand<'a>>,
        if_negative: impl Into<Operand<'b>>,
    ) -> Result<Self, RandomVariableError> {
        self.ternary(
            OperatorKind::Barrier,
            if_nonnegative.into(),
            if_negative.into(),
            |x, y, z| x.choose(y, z),
        )
    }

    /// `self + factor1 * factor2`.
    pub fn add_product<'a, 'b>(
        &self,
        factor1: impl Into<Operand<'a>>,
        factor2: impl Into<Operand<'b>>,
    ) -> Result<Self, RandomVariableError> {
        self.ternary(
            OperatorKind::AddProduct,
            factor1.into(),
            factor2.into(),
            RandomVariable::add_product,
        )
    }

    /// `self + numerator / denominator`.
    pub fn add_ratio<'a, 'b>(
        &self,
        numerator: impl Into<Operand<'a>>,
        denominator: impl Into<Operand<'b>>,
    ) -> Result<Self, RandomVariableError> {
        self.ternary(
            OperatorKind::AddRatio,
            numerator.into(),
            denominator.into(),
            RandomVariable::add_ratio,
        )
    }

    /// `self - numerator / denominator`.
    pub fn sub_ratio<'a, 'b>(
        &self,
        numerator: impl Into<Operand<'a>>,
        denominator: impl Into<Operand<'b>>,
    ) -> Result<Self, RandomVariableError> {
        self.ternary(
            OperatorKind::SubRatio,
            numerator.into(),
            denominator.into(),
            RandomVariable::sub_ratio,
        )
    }

    /// `self * (1 + rate * period_length)`.
    pub fn accrue<'a, 'b>(
        &self,
        rate: impl Into<Operand<'a>>,
        period_length: impl Into<Operand<'b>>,
    ) -> Result<Self, RandomVariableError> {
        self.ternary(
            OperatorKind::Accrue,
            rate.into(),
            period_length.into(),
            RandomVariable::accrue,
        )
    }

    /// `self / (1 + rate * period_length)`.
    pub fn discount<'a, 'b>(
        &self,
        rate: impl Into<Operand<'a>>,
        period_length: impl Into<Operand<'b>>,
    ) -> Result<Self, RandomVariableError> {
        self.ternary(
            OperatorKind::Discount,
            rate.into(),
            period_length.into(),
            RandomVariable::discount,
        )
    }

    // --- path reductions ---------------------------------------------------

    pub fn average(&self) -> Self {
        self.reduction(OperatorKind::Average, self.values.average())
    }

    pub fn variance(&self) -> Self {
        self.reduction(OperatorKind::Variance, self.values.variance())
    }

    pub fn standard_deviation(&self) -> Self {
        self.reduction(OperatorKind::StandardDeviation, self.values.standard_deviation())
    }

    pub fn standard_error(&self) -> Self {
        self.reduction(OperatorKind::StandardError, self.values.standard_error())
    }

    pub fn min(&self) -> Self {
        self.reduction(OperatorKind::Min, self.values.min())
    }

    pub fn max(&self) -> Self {
        self.reduction(OperatorKind::Max, self.values.max())
    }

    /// Empirical quantile. Recorded, but the backward pass rejects it.
    pub fn quantile(&self, q: f64) -> Self {
        self.reduction(OperatorKind::Quantile, self.values.quantile(q))
    }

    pub fn average_weighted<'a>(
        &self,
        probabilities: impl Into<Operand<'a>>,
    ) -> Result<Self, RandomVariableError> {
        self.weighted_reduction(
            OperatorKind::AverageWeighted,
            probabilities.into(),
            RandomVariable::average_weighted,
        )
    }

    pub fn variance_weighted<'a>(
        &self,
        probabilities: impl Into<Operand<'a>>,
    ) -> Result<Self, RandomVariableError> {
        self.weighted_reduction(
            OperatorKind::VarianceWeighted,
            probabilities.into(),
            RandomVariable::variance_weighted,
        )
    }

    pub fn standard_deviation_weighted<'a>(
        &self,
        probabilities: impl Into<Operand<'a>>,
    ) -> Result<Self, RandomVariableError> {
        self.weighted_reduction(
            OperatorKind::StandardDeviationWeighted,
            probabilities.into(),
            RandomVariable::standard_deviation_weighted,
        )
    }

    pub fn standard_error_weighted<'a>(
        &self,
        probabilities: impl Into<Operand<'a>>,
    ) -> Result<Self, RandomVariableError> {
        self.weighted_reduction(
            OperatorKind::StandardErrorWeighted,
            probabilities.into(),
            RandomVariable::standard_error_weighted,
        )
    }

    // --- projections -------------------------------------------------------

    /// Projects the value through `estimator`. The same estimator is applied
    /// to the adjoint during the backward pass.
    pub fn conditional_expectation(
        &self,
        estimator: Arc<dyn ConditionalExpectationEstimator>,
    ) -> Result<Self, RandomVariableError> {
        let values = estimator.estimate(&self.values)?;
        Ok(self.record(
            OperatorKind::ConditionalExpectation,
            vec![self.own()],
            values,
            Some(estimator),
        ))
    }

    /// Applies `f` pathwise. The result is recorded but cannot be
    /// differentiated.
    pub fn apply<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Sync + Send,
    {
        self.unary(OperatorKind::Apply, self.values.apply(f))
    }
}
