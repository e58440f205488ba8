//! Conversion of every leaf to dense matrix/vector form.

use num_complex::Complex64;

use crate::error::ExprResult;
use crate::expr::Expr;
use crate::primitive::PrimitiveOp;
use crate::state_fn::{StateFn, StatePrimitive};

/// Rewrites a tree so that every operator leaf is a dense matrix and every
/// state leaf a dense vector.
///
/// Idempotent: converting an already-converted tree returns an equal tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatrixConverter;

impl MatrixConverter {
    /// Create a converter.
    pub fn new() -> Self {
        Self
    }

    /// Convert `expr` to dense form.
    pub fn convert(&self, expr: &Expr) -> ExprResult<Expr> {
        match expr {
            Expr::List(_) => expr.traverse(&mut |child| self.convert(child)),
            Expr::Primitive(p) => Ok(Expr::Primitive(PrimitiveOp::matrix(p.to_matrix()?)?)),
            Expr::State(s) => match s.primitive() {
                StatePrimitive::Operator(inner) => Ok(Expr::State(StateFn::raw(
                    StatePrimitive::Operator(Box::new(self.convert(inner)?)),
                    s.coeff(),
                    s.is_measurement(),
                ))),
                _ => {
                    // Coefficients fold into the amplitudes.
                    let vector = s.to_vector()?;
                    Ok(Expr::State(StateFn::raw(
                        StatePrimitive::Vector(vector),
                        Complex64::new(1.0, 0.0),
                        s.is_measurement(),
                    )))
                }
            },
            Expr::CVar(c) => Ok(Expr::CVar(c.with_primitive(self.convert(c.primitive())?))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts;

    #[test]
    fn test_idempotent() {
        let op = consts::X.clone() * 0.5 - consts::Z.clone();
        let converter = MatrixConverter::new();
        let once = converter.convert(&op).unwrap();
        let twice = converter.convert(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_matrix_form_preserves_semantics() {
        let op = consts::X.clone() * 0.5 - consts::Z.clone();
        let converter = MatrixConverter::new();
        let dense = converter.convert(&op).unwrap();
        let a = op.to_matrix().unwrap();
        let b = dense.to_matrix().unwrap();
        for i in 0..2 {
            for j in 0..2 {
                assert!((a[[i, j]] - b[[i, j]]).norm() < 1e-12);
            }
        }
    }
}
