//! Type-priority dispatch between plain and differentiable random variables.
//!
//! Every implementation declares a `TYPE_PRIORITY`. A binary operation is
//! carried out by the operand with the higher priority; on a tie the receiver
//! performs it. `a.add(b)` and `b.add(a)` therefore produce the same concrete
//! representation, and mixing a graph-building value with a plain one always
//! yields a graph-building result.

use crate::aad::DifferentiableRandomVariable;
use crate::core::RandomVariableError;
use crate::stochastic::RandomVariable;

/// Borrowed right-hand side of a differentiable operation.
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    /// Deterministic constant; never differentiable.
    Scalar(f64),
    /// Plain value; recorded as a non-differentiable argument.
    Plain(&'a RandomVariable),
    /// Value recorded on a graph.
    Differentiable(&'a DifferentiableRandomVariable),
}

impl Operand<'_> {
    /// Dispatch rank of the operand's implementation.
    pub fn type_priority(&self) -> i32 {
        match self {
            Self::Scalar(_) => 0,
            Self::Plain(_) => RandomVariable::TYPE_PRIORITY,
            Self::Differentiable(value) => value.type_priority(),
        }
    }

    /// Numeric value, ignoring any graph.
    pub fn to_values(&self) -> RandomVariable {
        match self {
            Self::Scalar(value) => RandomVariable::deterministic(*value),
            Self::Plain(value) => (*value).clone(),
            Self::Differentiable(value) => value.values().clone(),
        }
    }
}

impl From<f64> for Operand<'_> {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl<'a> From<&'a RandomVariable> for Operand<'a> {
    fn from(value: &'a RandomVariable) -> Self {
        Self::Plain(value)
    }
}

impl<'a> From<&'a DifferentiableRandomVariable> for Operand<'a> {
    fn from(value: &'a DifferentiableRandomVariable) -> Self {
        Self::Differentiable(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mult,
    Div,
    Cap,
    Floor,
}

/// Either a plain or a differentiable random variable, combined under the
/// type-priority rule.
///
/// # Examples
/// ```rust
/// use ferric_rv::aad::{AnyRandomVariable, Graph};
/// use ferric_rv::stochastic::RandomVariable;
///
/// let graph = Graph::new();
/// let plain = AnyRandomVariable::from(RandomVariable::stochastic(0.0, vec![1.0, 2.0]));
/// let x = AnyRandomVariable::from(graph.stochastic(0.0, vec![3.0, 4.0]));
///
/// // The differentiable operand wins regardless of call order.
/// assert!(plain.add(&x).unwrap().is_differentiable());
/// assert!(x.add(&plain).unwrap().is_differentiable());
/// ```
#[derive(Debug, Clone)]
pub enum AnyRandomVariable {
    Plain(RandomVariable),
    Differentiable(DifferentiableRandomVariable),
}

impl From<RandomVariable> for AnyRandomVariable {
    fn from(value: RandomVariable) -> Self {
        Self::Plain(value)
    }
}

impl From<DifferentiableRandomVariable> for AnyRandomVariable {
    fn from(value: DifferentiableRandomVariable) -> Self {
        Self::Differentiable(value)
    }
}

impl AnyRandomVariable {
    pub fn type_priority(&self) -> i32 {
        match self {
            Self::Plain(_) => RandomVariable::TYPE_PRIORITY,
            Self::Differentiable(value) => value.type_priority(),
        }
    }

    /// Numeric value, ignoring any graph.
    pub fn values(&self) -> &RandomVariable {
        match self {
            Self::Plain(value) => value,
            Self::Differentiable(value) => value.values(),
        }
    }

    pub fn as_operand(&self) -> Operand<'_> {
        match self {
            Self::Plain(value) => Operand::Plain(value),
            Self::Differentiable(value) => Operand::Differentiable(value),
        }
    }

    pub fn as_differentiable(&self) -> Option<&DifferentiableRandomVariable> {
        match self {
            Self::Plain(_) => None,
            Self::Differentiable(value) => Some(value),
        }
    }

    #[inline]
    pub fn is_differentiable(&self) -> bool {
        matches!(self, Self::Differentiable(_))
    }

    pub fn add(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.dispatch(BinaryOp::Add, other)
    }

    pub fn sub(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.dispatch(BinaryOp::Sub, other)
    }

    pub fn mult(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.dispatch(BinaryOp::Mult, other)
    }

    pub fn div(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.dispatch(BinaryOp::Div, other)
    }

    pub fn cap(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.dispatch(BinaryOp::Cap, other)
    }

    pub fn floor(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.dispatch(BinaryOp::Floor, other)
    }

    fn dispatch(&self, op: BinaryOp, other: &Self) -> Result<Self, RandomVariableError> {
        if other.type_priority() > self.type_priority() {
            other.perform_reflected(op, self)
        } else {
            self.perform(op, other)
        }
    }

    /// `self op other`, computed by `self`.
    fn perform(&self, op: BinaryOp, other: &Self) -> Result<Self, RandomVariableError> {
        match self {
            Self::Plain(x) => {
                let y = other.values();
                let result = match op {
                    BinaryOp::Add => x.add(y)?,
                    BinaryOp::Sub => x.sub(y)?,
                    BinaryOp::Mult => x.mult(y)?,
                    BinaryOp::Div => x.div(y)?,
                    BinaryOp::Cap => x.cap(y)?,
                    BinaryOp::Floor => x.floor(y)?,
                };
                Ok(Self::Plain(result))
            }
            Self::Differentiable(x) => {
                let y = other.as_operand();
                let result = match op {
                    BinaryOp::Add => x.add(y)?,
                    BinaryOp::Sub => x.sub(y)?,
                    BinaryOp::Mult => x.mult(y)?,
                    BinaryOp::Div => x.div(y)?,
                    BinaryOp::Cap => x.cap(y)?,
                    BinaryOp::Floor => x.floor(y)?,
                };
                Ok(Self::Differentiable(result))
            }
        }
    }

    /// `other op self`, computed by `self`.
    fn perform_reflected(&self, op: BinaryOp, other: &Self) -> Result<Self, RandomVariableError> {
        match self {
            Self::Plain(x) => {
                let y = other.values();
                let result = match op {
                    BinaryOp::Add => x.add(y)?,
                    BinaryOp::Sub => x.bus(y)?,
                    BinaryOp::Mult => x.mult(y)?,
                    BinaryOp::Div => x.vid(y)?,
                    BinaryOp::Cap => x.cap(y)?,
                    BinaryOp::Floor => x.floor(y)?,
                };
                Ok(Self::Plain(result))
            }
            Self::Differentiable(x) => {
                let y = other.as_operand();
                let result = match op {
                    BinaryOp::Add => x.add(y)?,
                    BinaryOp::Sub => x.bus(y)?,
                    BinaryOp::Mult => x.mult(y)?,
                    BinaryOp::Div => x.vid(y)?,
                    BinaryOp::Cap => x.cap(y)?,
                    BinaryOp::Floor => x.floor(y)?,
                };
                Ok(Self::Differentiable(result))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aad::Graph;

    fn plain(values: &[f64]) -> AnyRandomVariable {
        RandomVariable::stochastic(0.0, values.to_vec()).into()
    }

    #[test]
    fn plain_operands_stay_plain() {
        let a = plain(&[1.0, 2.0]);
        let b = plain(&[3.0, 5.0]);
        let sum = a.add(&b).unwrap();
        assert!(!sum.is_differentiable());
        assert_eq!(sum.values().to_vec(), vec![4.0, 7.0]);
    }

    #[test]
    fn reflected_sub_and_div_keep_operand_order() {
        let graph = Graph::new();
        let x = graph.stochastic(0.0, vec![2.0, 4.0]);
        let a = plain(&[10.0, 20.0]);
        let any_x = AnyRandomVariable::from(x.clone());

        let diff = a.sub(&any_x).unwrap();
        assert_eq!(diff.values().to_vec(), vec![8.0, 16.0]);
        let ratio = a.div(&any_x).unwrap();
        assert_eq!(ratio.values().to_vec(), vec![5.0, 5.0]);

        let gradient = diff.as_differentiable().unwrap().gradient().unwrap();
        assert_eq!(gradient.get(&x).unwrap().to_vec(), vec![-1.0, -1.0]);

        let gradient = ratio.as_differentiable().unwrap().gradient().unwrap();
        assert_eq!(gradient.get(&x).unwrap().to_vec(), vec![-2.5, -1.25]);
    }

    #[test]
    fn mixed_operations_commute_to_the_same_representation() {
        let graph = Graph::new();
        let x = AnyRandomVariable::from(graph.stochastic(0.0, vec![1.0, -1.0]));
        let a = plain(&[0.5, 0.5]);
        for (left, right) in [
            (a.mult(&x).unwrap(), x.mult(&a).unwrap()),
            (a.cap(&x).unwrap(), x.cap(&a).unwrap()),
            (a.floor(&x).unwrap(), x.floor(&a).unwrap()),
        ] {
            assert!(left.is_differentiable() && right.is_differentiable());
            assert_eq!(left.values(), right.values());
        }
    }

    #[test]
    fn operands_from_different_graphs_are_rejected() {
        let x = AnyRandomVariable::from(Graph::new().constant(1.0));
        let y = AnyRandomVariable::from(Graph::new().constant(2.0));
        assert_eq!(x.add(&y).unwrap_err(), RandomVariableError::GraphMismatch);
    }

    #[test]
    fn operand_priorities_are_ordered() {
        let graph = Graph::new();
        let x = graph.constant(1.0);
        let p = RandomVariable::deterministic(1.0);
        assert!(Operand::from(2.0).type_priority() < Operand::from(&p).type_priority());
        assert!(Operand::from(&p).type_priority() < Operand::from(&x).type_priority());
    }
}
