//! Combination nodes over sequences of expressions.

use num_complex::Complex64;
use std::fmt;
use std::sync::Arc;

use crate::expr::Expr;

/// How a combination node folds its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineRule {
    /// Linear sum.
    Sum,
    /// Sequential application, rightmost child applied first (`a @ b`).
    Compose,
    /// Parallel composition over concatenated qubit registers.
    Tensor,
    /// A user-defined reduction over the children's scalar values.
    Generic,
}

/// A user-supplied reduction for `Generic` nodes.
///
/// Receives the evaluated children in order. This is the hook that lets one
/// tree-reduction mechanism serve ordinary summation, finite differences and
/// shift-rule gradients alike.
pub type CombineFn = Arc<dyn Fn(&[Complex64]) -> Complex64 + Send + Sync>;

/// An internal tree node combining child expressions under one rule.
#[derive(Clone)]
pub struct ListOp {
    rule: CombineRule,
    children: Vec<Expr>,
    coeff: Complex64,
    combine_fn: Option<CombineFn>,
}

impl ListOp {
    const ONE: Complex64 = Complex64::new(1.0, 0.0);

    /// A sum node. Callers are responsible for width compatibility;
    /// `Expr::try_add` is the validated entry point.
    pub fn summed(children: Vec<Expr>) -> Self {
        Self {
            rule: CombineRule::Sum,
            children,
            coeff: Self::ONE,
            combine_fn: None,
        }
    }

    /// A composition node (`children[0] @ children[1] @ …`).
    pub fn composed(children: Vec<Expr>) -> Self {
        Self {
            rule: CombineRule::Compose,
            children,
            coeff: Self::ONE,
            combine_fn: None,
        }
    }

    /// A tensor node; child `k` occupies the qubits after children `0..k`.
    pub fn tensored(children: Vec<Expr>) -> Self {
        Self {
            rule: CombineRule::Tensor,
            children,
            coeff: Self::ONE,
            combine_fn: None,
        }
    }

    /// A generic list with no reduction function.
    pub fn generic(children: Vec<Expr>) -> Self {
        Self {
            rule: CombineRule::Generic,
            children,
            coeff: Self::ONE,
            combine_fn: None,
        }
    }

    /// A generic list with a user-supplied reduction.
    pub fn generic_with(children: Vec<Expr>, combine_fn: CombineFn) -> Self {
        Self {
            rule: CombineRule::Generic,
            children,
            coeff: Self::ONE,
            combine_fn: Some(combine_fn),
        }
    }

    /// Rebuild with the same rule and reduction but new children.
    #[must_use]
    pub fn with_children(&self, children: Vec<Expr>) -> Self {
        Self {
            rule: self.rule,
            children,
            coeff: self.coeff,
            combine_fn: self.combine_fn.clone(),
        }
    }

    /// Return a copy scaled by `scalar`.
    #[must_use]
    pub fn scaled(&self, scalar: Complex64) -> Self {
        Self {
            rule: self.rule,
            children: self.children.clone(),
            coeff: self.coeff * scalar,
            combine_fn: self.combine_fn.clone(),
        }
    }

    pub(crate) fn set_coeff(mut self, coeff: Complex64) -> Self {
        self.coeff = coeff;
        self
    }

    /// The combination rule.
    pub fn rule(&self) -> CombineRule {
        self.rule
    }

    /// The child expressions.
    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    /// The coefficient.
    pub fn coeff(&self) -> Complex64 {
        self.coeff
    }

    /// The reduction function, if any.
    pub fn combine_fn(&self) -> Option<&CombineFn> {
        self.combine_fn.as_ref()
    }
}

impl fmt::Debug for ListOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListOp")
            .field("rule", &self.rule)
            .field("children", &self.children)
            .field("coeff", &self.coeff)
            .field("combine_fn", &self.combine_fn.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Structural equality; reduction functions are not comparable and are
/// ignored.
impl PartialEq for ListOp {
    fn eq(&self, other: &Self) -> bool {
        self.rule == other.rule && self.coeff == other.coeff && self.children == other.children
    }
}
