//! Symbolic parameter expressions for parameterized circuits.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Binary arithmetic operation on parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
}

/// A symbolic or concrete parameter expression.
///
/// Gate angles are stored as expressions so a circuit can be built once with
/// free symbols and bound to many value sets later. `shifted` substitutes
/// `symbol → symbol + δ`, which is how the gradient shift rule produces its
/// offset circuits without rebuilding the ansatz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParameterExpression {
    /// A constant numeric value.
    Constant(f64),
    /// A free symbolic parameter.
    Symbol(String),
    /// Negation.
    Neg(Box<ParameterExpression>),
    /// A binary operation on two sub-expressions.
    Binary {
        /// The operation.
        op: BinaryOp,
        /// Left operand.
        lhs: Box<ParameterExpression>,
        /// Right operand.
        rhs: Box<ParameterExpression>,
    },
}

impl ParameterExpression {
    /// Create a constant parameter.
    pub fn constant(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }

    /// Create a free symbolic parameter.
    pub fn symbol(name: impl Into<String>) -> Self {
        ParameterExpression::Symbol(name.into())
    }

    fn binary(op: BinaryOp, lhs: Self, rhs: Self) -> Self {
        ParameterExpression::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// Check if this expression contains any free symbols.
    pub fn is_symbolic(&self) -> bool {
        match self {
            ParameterExpression::Constant(_) => false,
            ParameterExpression::Symbol(_) => true,
            ParameterExpression::Neg(e) => e.is_symbolic(),
            ParameterExpression::Binary { lhs, rhs, .. } => {
                lhs.is_symbolic() || rhs.is_symbolic()
            }
        }
    }

    /// Try to evaluate as a concrete f64 value.
    ///
    /// Returns `None` if a free symbol remains or a division by zero occurs.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterExpression::Constant(v) => Some(*v),
            ParameterExpression::Symbol(_) => None,
            ParameterExpression::Neg(e) => e.as_f64().map(|v| -v),
            ParameterExpression::Binary { op, lhs, rhs } => {
                let l = lhs.as_f64()?;
                let r = rhs.as_f64()?;
                match op {
                    BinaryOp::Add => Some(l + r),
                    BinaryOp::Sub => Some(l - r),
                    BinaryOp::Mul => Some(l * r),
                    BinaryOp::Div => {
                        if r == 0.0 {
                            None
                        } else {
                            Some(l / r)
                        }
                    }
                }
            }
        }
    }

    /// All free symbol names in this expression, sorted.
    pub fn symbols(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        self.collect_symbols(&mut set);
        set.into_iter().collect()
    }

    fn collect_symbols(&self, set: &mut BTreeSet<String>) {
        match self {
            ParameterExpression::Constant(_) => {}
            ParameterExpression::Symbol(name) => {
                set.insert(name.clone());
            }
            ParameterExpression::Neg(e) => e.collect_symbols(set),
            ParameterExpression::Binary { lhs, rhs, .. } => {
                lhs.collect_symbols(set);
                rhs.collect_symbols(set);
            }
        }
    }

    /// Bind one symbol to a value, returning a new expression.
    pub fn bind(&self, name: &str, value: f64) -> Self {
        self.substitute(&mut |sym| {
            if sym == name {
                Some(ParameterExpression::Constant(value))
            } else {
                None
            }
        })
    }

    /// Bind every symbol present in `values`, returning a new expression.
    pub fn bind_all(&self, values: &FxHashMap<String, f64>) -> Self {
        self.substitute(&mut |sym| values.get(sym).copied().map(ParameterExpression::Constant))
    }

    /// Substitute `name → name + delta`, returning a new expression.
    pub fn shifted(&self, name: &str, delta: f64) -> Self {
        self.substitute(&mut |sym| {
            if sym == name {
                Some(ParameterExpression::binary(
                    BinaryOp::Add,
                    ParameterExpression::symbol(sym),
                    ParameterExpression::Constant(delta),
                ))
            } else {
                None
            }
        })
    }

    fn substitute(&self, f: &mut impl FnMut(&str) -> Option<Self>) -> Self {
        match self {
            ParameterExpression::Constant(_) => self.clone(),
            ParameterExpression::Symbol(name) => f(name).unwrap_or_else(|| self.clone()),
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.substitute(f))),
            ParameterExpression::Binary { op, lhs, rhs } => ParameterExpression::Binary {
                op: *op,
                lhs: Box::new(lhs.substitute(f)),
                rhs: Box::new(rhs.substitute(f)),
            },
        }
    }

    /// Simplify by folding constant subexpressions.
    pub fn simplify(&self) -> Self {
        if let Some(v) = self.as_f64() {
            return ParameterExpression::Constant(v);
        }
        match self {
            ParameterExpression::Neg(e) => ParameterExpression::Neg(Box::new(e.simplify())),
            ParameterExpression::Binary { op, lhs, rhs } => {
                ParameterExpression::binary(*op, lhs.simplify(), rhs.simplify())
            }
            _ => self.clone(),
        }
    }
}

impl fmt::Display for ParameterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterExpression::Constant(v) => write!(f, "{v}"),
            ParameterExpression::Symbol(name) => write!(f, "{name}"),
            ParameterExpression::Neg(e) => write!(f, "-({e})"),
            ParameterExpression::Binary { op, lhs, rhs } => {
                let sign = match op {
                    BinaryOp::Add => '+',
                    BinaryOp::Sub => '-',
                    BinaryOp::Mul => '*',
                    BinaryOp::Div => '/',
                };
                write!(f, "({lhs} {sign} {rhs})")
            }
        }
    }
}

impl From<f64> for ParameterExpression {
    fn from(value: f64) -> Self {
        ParameterExpression::Constant(value)
    }
}

impl From<i32> for ParameterExpression {
    fn from(value: i32) -> Self {
        ParameterExpression::Constant(f64::from(value))
    }
}

impl std::ops::Add for ParameterExpression {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        ParameterExpression::binary(BinaryOp::Add, self, rhs)
    }
}

impl std::ops::Sub for ParameterExpression {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        ParameterExpression::binary(BinaryOp::Sub, self, rhs)
    }
}

impl std::ops::Mul for ParameterExpression {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        ParameterExpression::binary(BinaryOp::Mul, self, rhs)
    }
}

impl std::ops::Div for ParameterExpression {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        ParameterExpression::binary(BinaryOp::Div, self, rhs)
    }
}

impl std::ops::Neg for ParameterExpression {
    type Output = Self;

    fn neg(self) -> Self::Output {
        ParameterExpression::Neg(Box::new(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_constant() {
        let p = ParameterExpression::constant(1.5);
        assert!(!p.is_symbolic());
        assert_eq!(p.as_f64(), Some(1.5));
    }

    #[test]
    fn test_symbol() {
        let p = ParameterExpression::symbol("theta");
        assert!(p.is_symbolic());
        assert_eq!(p.as_f64(), None);
        assert_eq!(p.symbols(), vec!["theta".to_string()]);
    }

    #[test]
    fn test_bind() {
        let p = ParameterExpression::symbol("theta");
        let bound = p.bind("theta", PI / 2.0);
        assert!(!bound.is_symbolic());
        assert!((bound.as_f64().unwrap() - PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_bind_all_leaves_others() {
        let p = ParameterExpression::symbol("a") + ParameterExpression::symbol("b");
        let values: FxHashMap<String, f64> = [("a".to_string(), 1.0)].into_iter().collect();
        let bound = p.bind_all(&values);
        assert!(bound.is_symbolic());
        assert_eq!(bound.symbols(), vec!["b".to_string()]);
    }

    #[test]
    fn test_shifted() {
        let p = ParameterExpression::symbol("a");
        let shifted = p.shifted("a", PI / 2.0);
        assert!(shifted.is_symbolic());
        let bound = shifted.bind("a", PI / 2.0);
        assert!((bound.as_f64().unwrap() - PI).abs() < 1e-12);
    }

    #[test]
    fn test_arithmetic_and_simplify() {
        let a = ParameterExpression::constant(2.0);
        let b = ParameterExpression::constant(3.0);

        let sum = (a.clone() + b.clone()).simplify();
        assert_eq!(sum, ParameterExpression::Constant(5.0));

        let prod = (a * b).simplify();
        assert_eq!(prod.as_f64(), Some(6.0));
    }

    #[test]
    fn test_division_by_zero_is_none() {
        let e = ParameterExpression::constant(1.0) / ParameterExpression::constant(0.0);
        assert_eq!(e.as_f64(), None);
    }
}
