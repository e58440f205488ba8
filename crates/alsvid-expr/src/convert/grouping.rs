//! Grouping of qubit-wise commuting Pauli terms.
//!
//! Terms that commute qubit-wise share a measurement basis, so one rotated
//! circuit serves the whole group. Greedy first-fit grouping: each term
//! joins the first group it commutes with, otherwise opens a new one.

use num_complex::Complex64;

use crate::error::ExprResult;
use crate::expr::Expr;
use crate::list_op::{CombineRule, ListOp};
use crate::pauli::PauliString;
use crate::primitive::{Primitive, PrimitiveOp};
use crate::state_fn::{StateFn, StatePrimitive};

/// Rewrites a flat Pauli sum into a sum of qubit-wise commuting sub-sums.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbelianGrouper;

impl AbelianGrouper {
    /// Create a grouper.
    pub fn new() -> Self {
        Self
    }

    /// Group the Pauli sums inside `expr`.
    ///
    /// Non-Pauli subtrees pass through unchanged.
    pub fn convert(&self, expr: &Expr) -> ExprResult<Expr> {
        match expr {
            Expr::State(s) => match s.primitive() {
                StatePrimitive::Operator(inner) => Ok(Expr::State(StateFn::raw(
                    StatePrimitive::Operator(Box::new(self.convert(inner)?)),
                    s.coeff(),
                    s.is_measurement(),
                ))),
                _ => Ok(expr.clone()),
            },
            Expr::List(l) if l.rule() == CombineRule::Sum => {
                match pauli_terms(expr) {
                    Some(terms) if terms.len() > 1 => Ok(grouped_sum(&group_terms(&terms))),
                    _ => expr.traverse(&mut |child| self.convert(child)),
                }
            }
            Expr::List(_) => expr.traverse(&mut |child| self.convert(child)),
            Expr::CVar(c) => Ok(Expr::CVar(c.with_primitive(self.convert(c.primitive())?))),
            Expr::Primitive(_) => Ok(expr.clone()),
        }
    }
}

/// Extract the weighted Pauli terms of an operator expression, or `None`
/// if any leaf is not a Pauli primitive.
pub fn pauli_terms(expr: &Expr) -> Option<Vec<(Complex64, PauliString)>> {
    match expr {
        Expr::Primitive(p) => match p.primitive() {
            Primitive::Pauli(pauli) => Some(vec![(p.coeff(), pauli.clone())]),
            _ => None,
        },
        Expr::List(l) if l.rule() == CombineRule::Sum => {
            let mut terms = Vec::new();
            for child in l.children() {
                for (coeff, pauli) in pauli_terms(child)? {
                    terms.push((coeff * l.coeff(), pauli));
                }
            }
            Some(terms)
        }
        _ => None,
    }
}

/// Greedy first-fit grouping by qubit-wise commutation.
pub fn group_terms(
    terms: &[(Complex64, PauliString)],
) -> Vec<Vec<(Complex64, PauliString)>> {
    let mut groups: Vec<Vec<(Complex64, PauliString)>> = Vec::new();
    for (coeff, pauli) in terms {
        let slot = groups.iter_mut().find(|group| {
            group.iter().all(|(_, member)| pauli.qubit_wise_commutes(member))
        });
        match slot {
            Some(group) => group.push((*coeff, pauli.clone())),
            None => groups.push(vec![(*coeff, pauli.clone())]),
        }
    }
    groups
}

fn grouped_sum(groups: &[Vec<(Complex64, PauliString)>]) -> Expr {
    let children: Vec<Expr> = groups
        .iter()
        .map(|group| {
            let terms: Vec<Expr> = group
                .iter()
                .map(|(coeff, pauli)| {
                    Expr::Primitive(PrimitiveOp::pauli(pauli.clone()).scaled(*coeff))
                })
                .collect();
            if terms.len() == 1 {
                terms.into_iter().next().expect("one term")
            } else {
                Expr::List(ListOp::summed(terms))
            }
        })
        .collect();
    if children.len() == 1 {
        children.into_iter().next().expect("one group")
    } else {
        Expr::List(ListOp::summed(children))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms_of(labels: &[(f64, &str)]) -> Vec<(Complex64, PauliString)> {
        labels
            .iter()
            .map(|(c, l)| {
                (
                    Complex64::new(*c, 0.0),
                    PauliString::from_label(l).unwrap(),
                )
            })
            .collect()
    }

    #[test]
    fn test_commuting_terms_share_a_group() {
        let groups = group_terms(&terms_of(&[(1.0, "ZI"), (1.0, "IZ"), (1.0, "ZZ")]));
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }

    #[test]
    fn test_conflicting_terms_split() {
        let groups = group_terms(&terms_of(&[(1.0, "ZI"), (1.0, "XI")]));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_tfim_groups_into_two() {
        // -ZZ - 0.5·XI - 0.5·IX: the X terms commute qubit-wise with each
        // other but not with ZZ.
        let groups = group_terms(&terms_of(&[(-1.0, "ZZ"), (-0.5, "XI"), (-0.5, "IX")]));
        assert_eq!(groups.len(), 2);
    }

    #[test]
    fn test_grouper_preserves_matrix() {
        let op = Expr::pauli_sum(&[(-1.0, "ZZ"), (-0.5, "XI"), (-0.5, "IX")]).unwrap();
        let grouped = AbelianGrouper::new().convert(&op).unwrap();
        let a = op.to_matrix().unwrap();
        let b = grouped.to_matrix().unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert!((a[[i, j]] - b[[i, j]]).norm() < 1e-12);
            }
        }
    }
}
