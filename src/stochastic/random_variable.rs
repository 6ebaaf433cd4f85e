//! Module `stochastic::random_variable`.
//!
//! Immutable Monte Carlo random variables: either a deterministic scalar or one
//! realization per simulation path, tagged with the filtration time at which
//! the value becomes known.
//!
//! Binary operations broadcast a deterministic operand against a stochastic
//! one. Two stochastic operands must carry the same number of paths; anything
//! else is a [`RandomVariableError::ShapeMismatch`], never a truncation.
//!
//! Numerical considerations: every kernel follows plain IEEE-754 semantics, so
//! division by a zero-valued path or the log of a non-positive path yields
//! infinity / NaN on that path and nothing is intercepted.
use std::sync::Arc;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::RandomVariableError;

/// Minimum path count before elementwise kernels fan out to rayon.
pub const PARALLEL_MIN_PATHS: usize = 16_384;

/// Storage of a random variable's realizations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Realizations {
    /// Same value on every path.
    Deterministic(f64),
    /// One value per path.
    Stochastic(Arc<[f64]>),
}

/// A deterministic or path-wise stochastic value.
///
/// Cloning is cheap: realizations are shared behind an `Arc`.
///
/// # Examples
/// ```rust
/// use ferric_rv::stochastic::RandomVariable;
///
/// let x = RandomVariable::stochastic(1.0, vec![1.0, 2.0, 3.0]);
/// let y = x.mult_scalar(2.0).add_scalar(1.0);
/// assert_eq!(y.to_vec(), vec![3.0, 5.0, 7.0]);
/// assert_eq!(y.average(), 5.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomVariable {
    filtration_time: f64,
    realizations: Realizations,
}

#[derive(Clone, Copy)]
enum PathView<'a> {
    Scalar(f64),
    Paths(&'a [f64]),
}

impl PathView<'_> {
    #[inline(always)]
    fn at(self, path: usize) -> f64 {
        match self {
            Self::Scalar(value) => value,
            Self::Paths(values) => values[path],
        }
    }
}

fn collect_paths<F>(n: usize, f: F) -> Arc<[f64]>
where
    F: Fn(usize) -> f64 + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        if n >= PARALLEL_MIN_PATHS {
            return (0..n).into_par_iter().map(f).collect::<Vec<f64>>().into();
        }
    }
    (0..n).map(f).collect()
}

#[inline]
pub(crate) fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

#[inline]
pub(crate) fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

/// Resolves the path count shared by a set of operands.
///
/// Returns `None` when every operand is deterministic.
pub(crate) fn common_path_count(
    operands: &[&RandomVariable],
) -> Result<Option<usize>, RandomVariableError> {
    let mut paths: Option<usize> = None;
    for operand in operands {
        if let Realizations::Stochastic(values) = &operand.realizations {
            match paths {
                None => paths = Some(values.len()),
                Some(n) if n != values.len() => {
                    return Err(RandomVariableError::ShapeMismatch {
                        left: n,
                        right: values.len(),
                    });
                }
                Some(_) => {}
            }
        }
    }
    Ok(paths)
}

impl RandomVariable {
    /// Dispatch rank of the plain value type; see
    /// [`AnyRandomVariable`](crate::aad::AnyRandomVariable).
    pub const TYPE_PRIORITY: i32 = 1;

    /// Deterministic constant, measurable at every time (`-inf`).
    #[inline]
    pub fn deterministic(value: f64) -> Self {
        Self::deterministic_at(f64::NEG_INFINITY, value)
    }

    /// Deterministic value with an explicit filtration time.
    #[inline]
    pub fn deterministic_at(filtration_time: f64, value: f64) -> Self {
        Self {
            filtration_time,
            realizations: Realizations::Deterministic(value),
        }
    }

    /// Stochastic value from per-path realizations.
    pub fn stochastic(filtration_time: f64, realizations: impl Into<Arc<[f64]>>) -> Self {
        Self {
            filtration_time,
            realizations: Realizations::Stochastic(realizations.into()),
        }
    }

    /// Time at which the value becomes known.
    #[inline]
    pub fn filtration_time(&self) -> f64 {
        self.filtration_time
    }

    /// Copy of this value re-tagged with another filtration time.
    pub fn with_filtration_time(&self, filtration_time: f64) -> Self {
        Self {
            filtration_time,
            realizations: self.realizations.clone(),
        }
    }

    /// True when the value does not depend on the path.
    #[inline]
    pub fn is_deterministic(&self) -> bool {
        matches!(self.realizations, Realizations::Deterministic(_))
    }

    /// Number of paths; `1` for deterministic values.
    #[inline]
    pub fn size(&self) -> usize {
        match &self.realizations {
            Realizations::Deterministic(_) => 1,
            Realizations::Stochastic(values) => values.len(),
        }
    }

    /// Underlying storage.
    #[inline]
    pub fn realizations(&self) -> &Realizations {
        &self.realizations
    }

    /// Realization on one path. Deterministic values answer every path.
    ///
    /// # Panics
    /// When `path` is out of range for a stochastic value.
    #[inline]
    pub fn get(&self, path: usize) -> f64 {
        self.view().at(path)
    }

    /// Path realizations, or `None` for a deterministic value.
    #[inline]
    pub fn as_slice(&self) -> Option<&[f64]> {
        match &self.realizations {
            Realizations::Deterministic(_) => None,
            Realizations::Stochastic(values) => Some(values),
        }
    }

    /// The scalar, or `None` for a stochastic value.
    #[inline]
    pub fn deterministic_value(&self) -> Option<f64> {
        match self.realizations {
            Realizations::Deterministic(value) => Some(value),
            Realizations::Stochastic(_) => None,
        }
    }

    /// Realizations as an owned vector (one entry for deterministic values).
    pub fn to_vec(&self) -> Vec<f64> {
        match &self.realizations {
            Realizations::Deterministic(value) => vec![*value],
            Realizations::Stochastic(values) => values.to_vec(),
        }
    }

    /// Constant one with the same shape and filtration time.
    pub fn ones_like(&self) -> Self {
        match &self.realizations {
            Realizations::Deterministic(_) => Self::deterministic_at(self.filtration_time, 1.0),
            Realizations::Stochastic(values) => {
                Self::stochastic(self.filtration_time, vec![1.0; values.len()])
            }
        }
    }

    #[inline]
    fn view(&self) -> PathView<'_> {
        match &self.realizations {
            Realizations::Deterministic(value) => PathView::Scalar(*value),
            Realizations::Stochastic(values) => PathView::Paths(values),
        }
    }

    /// Applies a function to every realization.
    pub fn apply<F>(&self, f: F) -> Self
    where
        F: Fn(f64) -> f64 + Send + Sync,
    {
        match &self.realizations {
            Realizations::Deterministic(value) => {
                Self::deterministic_at(self.filtration_time, f(*value))
            }
            Realizations::Stochastic(values) => Self {
                filtration_time: self.filtration_time,
                realizations: Realizations::Stochastic(collect_paths(values.len(), |i| {
                    f(values[i])
                })),
            },
        }
    }

    /// Applies a binary function path by path.
    pub fn apply2<F>(&self, other: &Self, f: F) -> Result<Self, RandomVariableError>
    where
        F: Fn(f64, f64) -> f64 + Send + Sync,
    {
        let filtration_time = self.filtration_time.max(other.filtration_time);
        let (a, b) = (self.view(), other.view());
        Ok(match common_path_count(&[self, other])? {
            None => Self::deterministic_at(filtration_time, f(a.at(0), b.at(0))),
            Some(n) => Self::stochastic(filtration_time, collect_paths(n, |i| f(a.at(i), b.at(i)))),
        })
    }

    /// Applies a ternary function path by path.
    pub fn apply3<F>(&self, second: &Self, third: &Self, f: F) -> Result<Self, RandomVariableError>
    where
        F: Fn(f64, f64, f64) -> f64 + Send + Sync,
    {
        let filtration_time = self
            .filtration_time
            .max(second.filtration_time)
            .max(third.filtration_time);
        let (a, b, c) = (self.view(), second.view(), third.view());
        Ok(match common_path_count(&[self, second, third])? {
            None => Self::deterministic_at(filtration_time, f(a.at(0), b.at(0), c.at(0))),
            Some(n) => Self::stochastic(
                filtration_time,
                collect_paths(n, |i| f(a.at(i), b.at(i), c.at(i))),
            ),
        })
    }

    #[inline]
    pub fn add(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(other, |x, y| x + y)
    }

    #[inline]
    pub fn add_scalar(&self, value: f64) -> Self {
        self.apply(|x| x + value)
    }

    #[inline]
    pub fn sub(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(other, |x, y| x - y)
    }

    #[inline]
    pub fn sub_scalar(&self, value: f64) -> Self {
        self.apply(|x| x - value)
    }

    /// Reverse subtraction `other - self`.
    #[inline]
    pub fn bus(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(other, |x, y| y - x)
    }

    /// Reverse subtraction `value - self`.
    #[inline]
    pub fn bus_scalar(&self, value: f64) -> Self {
        self.apply(|x| value - x)
    }

    #[inline]
    pub fn mult(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(other, |x, y| x * y)
    }

    #[inline]
    pub fn mult_scalar(&self, value: f64) -> Self {
        self.apply(|x| x * value)
    }

    #[inline]
    pub fn div(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(other, |x, y| x / y)
    }

    #[inline]
    pub fn div_scalar(&self, value: f64) -> Self {
        self.apply(|x| x / value)
    }

    /// Reverse division `other / self`.
    #[inline]
    pub fn vid(&self, other: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(other, |x, y| y / x)
    }

    /// Reverse division `value / self`.
    #[inline]
    pub fn vid_scalar(&self, value: f64) -> Self {
        self.apply(|x| value / x)
    }

    #[inline]
    pub fn squared(&self) -> Self {
        self.apply(|x| x * x)
    }

    #[inline]
    pub fn sqrt(&self) -> Self {
        self.apply(f64::sqrt)
    }

    #[inline]
    pub fn exp(&self) -> Self {
        self.apply(f64::exp)
    }

    /// Natural logarithm.
    #[inline]
    pub fn log(&self) -> Self {
        self.apply(f64::ln)
    }

    #[inline]
    pub fn sin(&self) -> Self {
        self.apply(f64::sin)
    }

    #[inline]
    pub fn cos(&self) -> Self {
        self.apply(f64::cos)
    }

    #[inline]
    pub fn abs(&self) -> Self {
        self.apply(f64::abs)
    }

    /// Reciprocal `1 / self`.
    #[inline]
    pub fn invert(&self) -> Self {
        self.apply(|x| 1.0 / x)
    }

    #[inline]
    pub fn pow(&self, exponent: f64) -> Self {
        self.apply(|x| x.powf(exponent))
    }

    /// Pathwise `min(self, cap)`.
    #[inline]
    pub fn cap(&self, cap: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(cap, nan_min)
    }

    #[inline]
    pub fn cap_scalar(&self, cap: f64) -> Self {
        self.apply(|x| nan_min(x, cap))
    }

    /// Pathwise `max(self, floor)`.
    #[inline]
    pub fn floor(&self, floor: &Self) -> Result<Self, RandomVariableError> {
        self.apply2(floor, nan_max)
    }

    #[inline]
    pub fn floor_scalar(&self, floor: f64) -> Self {
        self.apply(|x| nan_max(x, floor))
    }

    /// Uses `self` as trigger: `if_non_negative` where `self >= 0`,
    /// `if_negative` elsewhere.
    pub fn choose(
        &self,
        if_non_negative: &Self,
        if_negative: &Self,
    ) -> Result<Self, RandomVariableError> {
        self.apply3(if_non_negative, if_negative, |trigger, up, down| {
            if trigger >= 0.0 { up } else { down }
        })
    }

    /// Scalar form of [`RandomVariable::choose`], mostly used for indicators.
    pub fn choose_scalar(&self, if_non_negative: f64, if_negative: f64) -> Self {
        self.apply(|trigger| {
            if trigger >= 0.0 {
                if_non_negative
            } else {
                if_negative
            }
        })
    }

    /// `self + factor1 * factor2`.
    pub fn add_product(&self, factor1: &Self, factor2: &Self) -> Result<Self, RandomVariableError> {
        self.apply3(factor1, factor2, |x, y, z| x + y * z)
    }

    /// `self + factor1 * factor2` with a scalar second factor.
    pub fn add_product_scalar(
        &self,
        factor1: &Self,
        factor2: f64,
    ) -> Result<Self, RandomVariableError> {
        self.apply2(factor1, |x, y| x + y * factor2)
    }

    /// `self + numerator / denominator`.
    pub fn add_ratio(&self, numerator: &Self, denominator: &Self) -> Result<Self, RandomVariableError> {
        self.apply3(numerator, denominator, |x, y, z| x + y / z)
    }

    /// `self - numerator / denominator`.
    pub fn sub_ratio(&self, numerator: &Self, denominator: &Self) -> Result<Self, RandomVariableError> {
        self.apply3(numerator, denominator, |x, y, z| x - y / z)
    }

    /// Simple-compounding accrual `self * (1 + rate * period)`.
    pub fn accrue(&self, rate: &Self, period: &Self) -> Result<Self, RandomVariableError> {
        self.apply3(rate, period, |x, y, z| x * (1.0 + y * z))
    }

    pub fn accrue_scalar(&self, rate: &Self, period: f64) -> Result<Self, RandomVariableError> {
        self.apply2(rate, |x, y| x * (1.0 + y * period))
    }

    /// Simple-compounding discount `self / (1 + rate * period)`.
    pub fn discount(&self, rate: &Self, period: &Self) -> Result<Self, RandomVariableError> {
        self.apply3(rate, period, |x, y, z| x / (1.0 + y * z))
    }

    pub fn discount_scalar(&self, rate: &Self, period: f64) -> Result<Self, RandomVariableError> {
        self.apply2(rate, |x, y| x / (1.0 + y * period))
    }
}
