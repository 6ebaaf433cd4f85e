//! Reverse-mode algorithmic differentiation over random variables.
//!
//! A [`Graph`] hands out node ids. Each [`DifferentiableRandomVariable`]
//! computes its value eagerly and records one [`OperatorNode`] holding the
//! operator kind, references to its differentiable arguments and the argument
//! values its derivative formulas need. [`DifferentiableRandomVariable::gradient`]
//! walks the graph backwards in descending id order and returns the
//! derivative of the root with respect to every reached leaf.
//!
//! # Examples
//! ```rust
//! use ferric_rv::aad::Graph;
//!
//! let graph = Graph::new();
//! let x1 = graph.stochastic(0.0, vec![1.0, 2.0, 3.0]);
//! let x2 = graph.constant(2.0);
//!
//! // y = x1 * x2 + x1^2
//! let y = x1.mult(&x2).unwrap().add(&x1.squared()).unwrap();
//! let gradient = y.gradient().unwrap();
//!
//! assert_eq!(gradient.get(&x1).unwrap().to_vec(), vec![4.0, 6.0, 8.0]);
//! assert_eq!(gradient.get(&x2).unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
//! ```

pub mod differentiable;
pub mod dispatch;
pub mod gradient;
pub mod graph;
pub mod node;
pub mod operator;

pub use differentiable::DifferentiableRandomVariable;
pub use dispatch::{AnyRandomVariable, Operand};
pub use gradient::{Gradient, batch_gradients};
pub use graph::Graph;
pub use node::{NodeId, OperatorNode};
pub use operator::OperatorKind;
