//! The expression tree: one closed type for operators, states and their
//! combinations.
//!
//! Every node is immutable; algebraic operations and converter rewrites
//! return new trees. Structural errors (width mismatches, illegal
//! measurement combinations) surface at combination time, never at
//! evaluation time.

use ndarray::linalg::kron;
use ndarray::{Array1, Array2};
use num_complex::Complex64;
use rustc_hash::FxHashMap;
use std::fmt;

use crate::cvar::CVarMeasurement;
use crate::error::{ExprError, ExprResult};
use crate::list_op::{CombineRule, ListOp};
use crate::pauli::PauliString;
use crate::primitive::{Primitive, PrimitiveOp};
use crate::state_fn::{StateFn, StatePrimitive};

/// A lazy operator/state expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// An atomic operator.
    Primitive(PrimitiveOp),
    /// A state function or measurement dual.
    State(StateFn),
    /// A combination of child expressions.
    List(ListOp),
    /// A conditional-value-at-risk measurement.
    CVar(CVarMeasurement),
}

const C_ONE: Complex64 = Complex64::new(1.0, 0.0);
const C_ZERO: Complex64 = Complex64::new(0.0, 0.0);

impl Expr {
    // =========================================================================
    // Construction helpers
    // =========================================================================

    /// A Pauli-string operator from a label (char k = qubit k).
    pub fn pauli(label: &str) -> ExprResult<Expr> {
        Ok(Expr::Primitive(PrimitiveOp::pauli(PauliString::from_label(
            label,
        )?)))
    }

    /// A weighted sum of Pauli strings.
    pub fn pauli_sum(terms: &[(f64, &str)]) -> ExprResult<Expr> {
        let mut children = Vec::with_capacity(terms.len());
        for (coeff, label) in terms {
            children.push(Expr::pauli(label)?.scaled(Complex64::new(*coeff, 0.0)));
        }
        match children.len() {
            0 => Err(ExprError::InvalidConversion(
                "a Pauli sum needs at least one term".into(),
            )),
            1 => Ok(children.pop().expect("one child")),
            _ => Ok(Expr::List(ListOp::summed(children))),
        }
    }

    /// The identity operator on `n` qubits.
    pub fn identity(n: u32) -> Expr {
        Expr::Primitive(PrimitiveOp::pauli(PauliString::identity(n)))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The node's coefficient.
    pub fn coeff(&self) -> Complex64 {
        match self {
            Expr::Primitive(p) => p.coeff(),
            Expr::State(s) => s.coeff(),
            Expr::List(l) => l.coeff(),
            Expr::CVar(c) => c.coeff(),
        }
    }

    /// Return a copy scaled by `scalar`.
    #[must_use]
    pub fn scaled(&self, scalar: Complex64) -> Expr {
        match self {
            Expr::Primitive(p) => Expr::Primitive(p.scaled(scalar)),
            Expr::State(s) => Expr::State(s.scaled(scalar)),
            Expr::List(l) => Expr::List(l.scaled(scalar)),
            Expr::CVar(c) => Expr::CVar(c.scaled(scalar)),
        }
    }

    /// Split into a unit-coefficient node and its coefficient.
    pub(crate) fn unit(&self) -> (Expr, Complex64) {
        let coeff = self.coeff();
        let unit = match self {
            Expr::Primitive(p) => Expr::Primitive(p.with_coeff(C_ONE)),
            Expr::State(s) => Expr::State(s.with_coeff(C_ONE)),
            Expr::List(l) => Expr::List(l.clone().set_coeff(C_ONE)),
            Expr::CVar(c) => Expr::CVar(c.with_coeff(C_ONE)),
        };
        (unit, coeff)
    }

    /// Number of qubits the expression acts on.
    pub fn num_qubits(&self) -> u32 {
        match self {
            Expr::Primitive(p) => p.num_qubits(),
            Expr::State(s) => s.num_qubits(),
            Expr::CVar(c) => c.num_qubits(),
            Expr::List(l) => match l.rule() {
                CombineRule::Tensor => l.children().iter().map(Expr::num_qubits).sum(),
                _ => l.children().first().map_or(0, Expr::num_qubits),
            },
        }
    }

    /// Whether the expression acts as a measurement (bra-side functional).
    pub fn is_measurement(&self) -> bool {
        match self {
            Expr::Primitive(_) => false,
            Expr::State(s) => s.is_measurement(),
            Expr::CVar(_) => true,
            Expr::List(l) => match l.rule() {
                // A composition pairs a measurement with a state; the
                // whole node is scalar-valued, not a functional.
                CombineRule::Compose => false,
                _ => l.children().first().is_some_and(Expr::is_measurement),
            },
        }
    }

    /// True if the operator is diagonal in the computational basis.
    pub fn is_diagonal_operator(&self) -> bool {
        match self {
            Expr::Primitive(p) => match p.primitive() {
                Primitive::Pauli(pauli) => pauli.is_diagonal(),
                Primitive::Matrix(_) | Primitive::Circuit(_) => false,
            },
            Expr::List(l) => match l.rule() {
                CombineRule::Sum | CombineRule::Tensor | CombineRule::Compose => {
                    l.children().iter().all(Expr::is_diagonal_operator)
                }
                CombineRule::Generic => false,
            },
            Expr::State(_) | Expr::CVar(_) => false,
        }
    }

    // =========================================================================
    // Algebra
    // =========================================================================

    /// The sum of two expressions of equal width.
    pub fn try_add(&self, other: &Expr) -> ExprResult<Expr> {
        if self.num_qubits() != other.num_qubits() {
            return Err(ExprError::QubitCountMismatch {
                op: "add",
                left: self.num_qubits(),
                right: other.num_qubits(),
            });
        }
        if self.is_measurement() != other.is_measurement() {
            return Err(ExprError::MeasurementMismatch { op: "add" });
        }

        // Identical Pauli strings merge by coefficient addition.
        if let (Expr::Primitive(a), Expr::Primitive(b)) = (self, other) {
            if let (Primitive::Pauli(pa), Primitive::Pauli(pb)) = (a.primitive(), b.primitive()) {
                if pa == pb {
                    return Ok(Expr::Primitive(
                        PrimitiveOp::pauli(pa.clone()).scaled(a.coeff() + b.coeff()),
                    ));
                }
            }
        }

        // Same-rule flat sums append instead of nesting.
        let mut children = match self {
            Expr::List(l) if l.rule() == CombineRule::Sum => l
                .children()
                .iter()
                .map(|child| child.scaled(l.coeff()))
                .collect(),
            _ => vec![self.clone()],
        };
        match other {
            Expr::List(l) if l.rule() == CombineRule::Sum => {
                children.extend(l.children().iter().map(|child| child.scaled(l.coeff())));
            }
            _ => children.push(other.clone()),
        }
        Ok(Expr::List(ListOp::summed(children)))
    }

    /// Sequential composition `self @ other` (`other` applied first).
    pub fn compose(&self, other: &Expr) -> ExprResult<Expr> {
        if let Expr::State(s) = self {
            if !s.is_measurement() {
                return Err(ExprError::ComposeOnState);
            }
        }
        if self.num_qubits() != other.num_qubits() {
            return Err(ExprError::QubitCountMismatch {
                op: "compose",
                left: self.num_qubits(),
                right: other.num_qubits(),
            });
        }

        if let (Expr::Primitive(a), Expr::Primitive(b)) = (self, other) {
            if let Some(merged) = a.compose_pauli(b) {
                return Ok(Expr::Primitive(merged?));
            }
        }

        let mut children = match self {
            Expr::List(l) if l.rule() == CombineRule::Compose => l
                .children()
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    if i == 0 {
                        child.scaled(l.coeff())
                    } else {
                        child.clone()
                    }
                })
                .collect(),
            _ => vec![self.clone()],
        };
        children.push(other.clone());
        Ok(Expr::List(ListOp::composed(children)))
    }

    /// Parallel composition: `self` keeps qubits `[0, n)`, `other` occupies
    /// the qubits after it.
    pub fn tensor(&self, other: &Expr) -> ExprResult<Expr> {
        match (self, other) {
            (Expr::Primitive(a), Expr::Primitive(b)) => {
                if let Some(merged) = a.tensor_pauli(b) {
                    return Ok(Expr::Primitive(merged));
                }
            }
            (Expr::State(a), Expr::State(b)) => {
                if a.is_measurement() != b.is_measurement() {
                    return Err(ExprError::MeasurementMismatch { op: "tensor" });
                }
                if let Some(merged) = tensor_states(a, b)? {
                    return Ok(Expr::State(merged));
                }
            }
            (Expr::CVar(_), _) | (_, Expr::CVar(_)) => {
                return Err(ExprError::InvalidConversion(
                    "tensor products of CVaR measurements are not defined".into(),
                ));
            }
            _ => {}
        }

        let mut children = match self {
            Expr::List(l) if l.rule() == CombineRule::Tensor => {
                let mut v: Vec<Expr> = l.children().to_vec();
                if let Some(first) = v.first_mut() {
                    *first = first.scaled(l.coeff());
                }
                v
            }
            _ => vec![self.clone()],
        };
        children.push(other.clone());
        Ok(Expr::List(ListOp::tensored(children)))
    }

    /// The `n`-fold tensor power of this expression.
    pub fn tensorpower(&self, n: u32) -> ExprResult<Expr> {
        if n == 0 {
            return Err(ExprError::InvalidConversion(
                "tensor power of zero factors".into(),
            ));
        }
        let mut acc = self.clone();
        for _ in 1..n {
            acc = acc.tensor(self)?;
        }
        Ok(acc)
    }

    /// The adjoint expression.
    pub fn adjoint(&self) -> ExprResult<Expr> {
        match self {
            Expr::Primitive(p) => Ok(Expr::Primitive(p.adjoint()?)),
            Expr::State(s) => Ok(Expr::State(s.adjoint()?)),
            Expr::CVar(_) => Err(ExprError::CVarAdjoint),
            Expr::List(l) => {
                let mut children = l
                    .children()
                    .iter()
                    .map(Expr::adjoint)
                    .collect::<ExprResult<Vec<_>>>()?;
                if l.rule() == CombineRule::Compose {
                    children.reverse();
                }
                Ok(Expr::List(
                    l.with_children(children).set_coeff(l.coeff().conj()),
                ))
            }
        }
    }

    // =========================================================================
    // Tree rewriting
    // =========================================================================

    /// Apply `f` to every child, rebuilding this node around the results.
    ///
    /// Leaves are returned unchanged. Converters recurse by calling
    /// themselves from `f`; this is the only tree-walking primitive they
    /// need.
    pub fn traverse(&self, f: &mut dyn FnMut(&Expr) -> ExprResult<Expr>) -> ExprResult<Expr> {
        match self {
            Expr::List(l) => {
                let children = l
                    .children()
                    .iter()
                    .map(|child| f(child))
                    .collect::<ExprResult<Vec<_>>>()?;
                Ok(Expr::List(l.with_children(children)))
            }
            Expr::State(s) => match s.primitive() {
                StatePrimitive::Operator(inner) => Ok(Expr::State(StateFn::raw(
                    StatePrimitive::Operator(Box::new(f(inner)?)),
                    s.coeff(),
                    s.is_measurement(),
                ))),
                _ => Ok(self.clone()),
            },
            Expr::CVar(c) => Ok(Expr::CVar(c.with_primitive(f(c.primitive())?))),
            Expr::Primitive(_) => Ok(self.clone()),
        }
    }

    /// Rebuild the tree with parameter values bound into circuit leaves.
    #[must_use]
    pub fn bind_parameters(&self, values: &FxHashMap<String, f64>) -> Expr {
        self.map_circuits(&|circuit| circuit.bind_parameters(values))
    }

    /// Rebuild the tree with `name → name + delta` substituted in circuit
    /// leaves (the shift-rule building block).
    #[must_use]
    pub fn shift_parameter(&self, name: &str, delta: f64) -> Expr {
        self.map_circuits(&|circuit| circuit.shift_parameter(name, delta))
    }

    fn map_circuits(&self, f: &dyn Fn(&alsvid_ir::Circuit) -> alsvid_ir::Circuit) -> Expr {
        match self {
            Expr::Primitive(p) => match p.primitive() {
                Primitive::Circuit(c) => {
                    Expr::Primitive(PrimitiveOp::circuit(f(c)).scaled(p.coeff()))
                }
                _ => self.clone(),
            },
            Expr::State(s) => match s.primitive() {
                StatePrimitive::Circuit { circuit, .. } => Expr::State(
                    StateFn::from_circuit(f(circuit)).scaled(s.coeff()),
                ),
                StatePrimitive::Operator(inner) => Expr::State(StateFn::raw(
                    StatePrimitive::Operator(Box::new(inner.map_circuits(f))),
                    s.coeff(),
                    s.is_measurement(),
                )),
                _ => self.clone(),
            },
            Expr::List(l) => {
                let children = l.children().iter().map(|c| c.map_circuits(f)).collect();
                Expr::List(l.with_children(children))
            }
            Expr::CVar(c) => Expr::CVar(c.with_primitive(c.primitive().map_circuits(f))),
        }
    }

    /// Canonicalize the tree: flatten nested same-rule nodes, merge
    /// coefficient-multiples of identical subtrees, drop zero terms and
    /// collapse Pauli products. Idempotent.
    #[must_use]
    pub fn reduce(&self) -> Expr {
        match self {
            Expr::Primitive(_) => self.clone(),
            Expr::State(s) => match s.primitive() {
                StatePrimitive::Operator(inner) => Expr::State(StateFn::raw(
                    StatePrimitive::Operator(Box::new(inner.reduce())),
                    s.coeff(),
                    s.is_measurement(),
                )),
                _ => self.clone(),
            },
            Expr::CVar(c) => Expr::CVar(c.with_primitive(c.primitive().reduce())),
            Expr::List(l) => {
                let children: Vec<Expr> = l.children().iter().map(Expr::reduce).collect();
                match l.rule() {
                    CombineRule::Sum => reduce_sum(children, l.coeff()),
                    CombineRule::Compose => reduce_compose(children, l.coeff()),
                    CombineRule::Tensor => reduce_tensor(children, l.coeff()),
                    CombineRule::Generic => Expr::List(l.with_children(children)),
                }
            }
        }
    }

    // =========================================================================
    // Evaluation
    // =========================================================================

    /// Fold a measurement ∘ state tree to a scalar.
    ///
    /// Sums add, tensors multiply, compositions pair their measurement with
    /// the state to its right, and generic lists apply their combine
    /// function (an error when none is set).
    pub fn eval(&self) -> ExprResult<Complex64> {
        match self {
            Expr::Primitive(_) => Err(ExprError::EvalNotScalar("a primitive operator")),
            Expr::State(_) => Err(ExprError::EvalNotScalar("a lone state function")),
            Expr::CVar(_) => Err(ExprError::EvalNotScalar("a lone CVaR measurement")),
            Expr::List(l) => {
                let value = match l.rule() {
                    CombineRule::Sum => {
                        let mut acc = C_ZERO;
                        for child in l.children() {
                            acc += child.eval()?;
                        }
                        acc
                    }
                    CombineRule::Tensor => {
                        let mut acc = C_ONE;
                        for child in l.children() {
                            acc *= child.eval()?;
                        }
                        acc
                    }
                    CombineRule::Compose => eval_composition(l.children())?,
                    CombineRule::Generic => {
                        let f = l.combine_fn().ok_or(ExprError::MissingCombineFn)?;
                        let values = l
                            .children()
                            .iter()
                            .map(Expr::eval)
                            .collect::<ExprResult<Vec<_>>>()?;
                        f(&values)
                    }
                };
                Ok(value * l.coeff())
            }
        }
    }

    /// Evaluate this measurement against a state.
    pub fn eval_with(&self, front: &Expr) -> ExprResult<Complex64> {
        match self {
            Expr::State(s) => s.eval_with(front),
            Expr::CVar(c) => c.eval_with(front),
            Expr::List(l) => match l.rule() {
                CombineRule::Sum => {
                    let mut acc = C_ZERO;
                    for child in l.children() {
                        acc += child.eval_with(front)?;
                    }
                    Ok(acc * l.coeff())
                }
                CombineRule::Compose => self.compose(front)?.eval(),
                _ => Err(ExprError::EvalNotScalar("a non-measurement combination")),
            },
            Expr::Primitive(_) => Err(ExprError::EvalNotScalar(
                "an operator; wrap it in a measurement first",
            )),
        }
    }

    /// The diagonal matrix element `⟨b|O|b⟩` of an operator expression.
    pub fn expectation_of_bitstring(&self, bitstring: &str) -> ExprResult<Complex64> {
        match self {
            Expr::Primitive(p) => p.diagonal_entry(bitstring),
            Expr::List(l) => {
                let value = match l.rule() {
                    CombineRule::Sum => {
                        let mut acc = C_ZERO;
                        for child in l.children() {
                            acc += child.expectation_of_bitstring(bitstring)?;
                        }
                        acc
                    }
                    CombineRule::Tensor => {
                        let mut acc = C_ONE;
                        let mut offset = 0usize;
                        for child in l.children() {
                            let width = child.num_qubits() as usize;
                            let slice = bitstring.get(offset..offset + width).ok_or(
                                ExprError::InvalidBitstring {
                                    len: bitstring.len(),
                                    num_qubits: self.num_qubits(),
                                },
                            )?;
                            acc *= child.expectation_of_bitstring(slice)?;
                            offset += width;
                        }
                        if offset != bitstring.len() {
                            return Err(ExprError::InvalidBitstring {
                                len: bitstring.len(),
                                num_qubits: self.num_qubits(),
                            });
                        }
                        acc
                    }
                    CombineRule::Compose => {
                        // Diagonal matrices multiply entrywise.
                        if !self.is_diagonal_operator() {
                            return Err(ExprError::NonDiagonal(self.to_string()));
                        }
                        let mut acc = C_ONE;
                        for child in l.children() {
                            acc *= child.expectation_of_bitstring(bitstring)?;
                        }
                        acc
                    }
                    CombineRule::Generic => {
                        return Err(ExprError::InvalidConversion(
                            "diagonal entry of a generic list".into(),
                        ));
                    }
                };
                Ok(value * l.coeff())
            }
            Expr::State(_) | Expr::CVar(_) => Err(ExprError::InvalidConversion(
                "diagonal entries are defined for operator expressions only".into(),
            )),
        }
    }

    // =========================================================================
    // Dense conversion
    // =========================================================================

    /// The dense matrix form of an operator expression.
    pub fn to_matrix(&self) -> ExprResult<Array2<Complex64>> {
        match self {
            Expr::Primitive(p) => p.to_matrix(),
            Expr::State(s) => match s.primitive() {
                StatePrimitive::Operator(inner) => Ok(inner.to_matrix()? * s.coeff()),
                _ => Err(ExprError::InvalidConversion(
                    "state functions have vector form, not matrix form".into(),
                )),
            },
            Expr::CVar(_) => Err(ExprError::InvalidConversion(
                "a CVaR measurement has no matrix form".into(),
            )),
            Expr::List(l) => {
                let mut matrices = l.children().iter().map(Expr::to_matrix);
                let result = match l.rule() {
                    CombineRule::Sum => {
                        let mut acc = matrices.next().transpose()?.ok_or_else(empty_list)?;
                        for m in matrices {
                            acc += &m?;
                        }
                        acc
                    }
                    CombineRule::Compose => {
                        let mut acc = matrices.next().transpose()?.ok_or_else(empty_list)?;
                        for m in matrices {
                            acc = acc.dot(&m?);
                        }
                        acc
                    }
                    CombineRule::Tensor => {
                        let mut acc = matrices.next().transpose()?.ok_or_else(empty_list)?;
                        for m in matrices {
                            acc = kron(&m?, &acc);
                        }
                        acc
                    }
                    CombineRule::Generic => {
                        return Err(ExprError::InvalidConversion(
                            "a generic list has no matrix form".into(),
                        ));
                    }
                };
                Ok(result * l.coeff())
            }
        }
    }

    /// The dense vector form of a state expression.
    pub fn to_vector(&self) -> ExprResult<Array1<Complex64>> {
        match self {
            Expr::State(s) => s.to_vector(),
            Expr::List(l) => {
                let result = match l.rule() {
                    CombineRule::Sum => {
                        let mut vectors = l.children().iter().map(Expr::to_vector);
                        let mut acc = vectors.next().transpose()?.ok_or_else(empty_list)?;
                        for v in vectors {
                            acc += &v?;
                        }
                        acc
                    }
                    CombineRule::Tensor => {
                        let mut vectors = l.children().iter().map(Expr::to_vector);
                        let mut acc = vectors.next().transpose()?.ok_or_else(empty_list)?;
                        for v in vectors {
                            acc = kron_vec(&v?, &acc);
                        }
                        acc
                    }
                    CombineRule::Compose => {
                        // Operators applied right-to-left onto the rightmost
                        // state.
                        let mut acc = l
                            .children()
                            .last()
                            .ok_or_else(empty_list)?
                            .to_vector()?;
                        for child in l.children()[..l.children().len() - 1].iter().rev() {
                            acc = child.to_matrix()?.dot(&acc);
                        }
                        acc
                    }
                    CombineRule::Generic => {
                        return Err(ExprError::InvalidConversion(
                            "a generic list has no vector form".into(),
                        ));
                    }
                };
                Ok(result * l.coeff())
            }
            Expr::Primitive(_) | Expr::CVar(_) => Err(ExprError::InvalidConversion(
                "vector form is defined for state expressions only".into(),
            )),
        }
    }
}

fn empty_list() -> ExprError {
    ExprError::InvalidConversion("empty combination node".into())
}

/// Kronecker product for vectors; `a` occupies the high bits.
fn kron_vec(a: &Array1<Complex64>, b: &Array1<Complex64>) -> Array1<Complex64> {
    let mut out = Array1::zeros(a.len() * b.len());
    for (i, av) in a.iter().enumerate() {
        for (j, bv) in b.iter().enumerate() {
            out[i * b.len() + j] = av * bv;
        }
    }
    out
}

/// Fold a composition chain right-to-left down to a scalar.
fn eval_composition(children: &[Expr]) -> ExprResult<Complex64> {
    let Some((last, rest)) = children.split_last() else {
        return Err(empty_list());
    };
    let mut front = last.clone();
    for child in rest.iter().rev() {
        if child.is_measurement() {
            // The measurement must be the leftmost factor.
            let value = child.eval_with(&front)?;
            return Ok(value);
        }
        // Intermediate operator: apply it to the running state.
        let vector = child.to_matrix()?.dot(&front.to_vector()?);
        front = Expr::State(StateFn::from_vector(vector)?);
    }
    Err(ExprError::EvalNotScalar(
        "a composition without a measurement",
    ))
}

/// Tensor two state leaves into one when their payloads allow it.
fn tensor_states(a: &StateFn, b: &StateFn) -> ExprResult<Option<StateFn>> {
    let combined = match (a.primitive(), b.primitive()) {
        (StatePrimitive::Dict(da), StatePrimitive::Dict(db)) => {
            let mut map = FxHashMap::default();
            for (ka, va) in da {
                for (kb, vb) in db {
                    map.insert(format!("{ka}{kb}"), va * vb);
                }
            }
            Some(StateFn::raw(
                StatePrimitive::Dict(map),
                a.coeff() * b.coeff(),
                a.is_measurement(),
            ))
        }
        (StatePrimitive::Circuit { circuit: ca, .. }, StatePrimitive::Circuit { circuit: cb, .. }) => {
            Some(
                StateFn::from_circuit(ca.tensor(cb))
                    .scaled(a.coeff() * b.coeff()),
            )
        }
        (StatePrimitive::Vector(_), StatePrimitive::Vector(_)) => {
            let va = a.to_vector()?;
            let vb = b.to_vector()?;
            Some(StateFn::from_vector(kron_vec(&vb, &va))?)
        }
        _ => None,
    };
    Ok(combined)
}

// =============================================================================
// Reduction
// =============================================================================

fn reduce_sum(children: Vec<Expr>, coeff: Complex64) -> Expr {
    // Flatten nested sums, distributing coefficients down.
    let mut flat: Vec<Expr> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Expr::List(l) if l.rule() == CombineRule::Sum => {
                for gc in l.children() {
                    flat.push(gc.scaled(l.coeff() * coeff));
                }
            }
            other => flat.push(other.scaled(coeff)),
        }
    }

    // Merge coefficient-multiples of identical subtrees.
    let mut units: Vec<(Expr, Complex64)> = Vec::with_capacity(flat.len());
    let mut first_unit: Option<Expr> = None;
    for term in flat {
        let (unit, c) = term.unit();
        if first_unit.is_none() {
            first_unit = Some(unit.clone());
        }
        match units.iter_mut().find(|(u, _)| *u == unit) {
            Some((_, existing)) => *existing += c,
            None => units.push((unit, c)),
        }
    }
    units.retain(|(_, c)| c.norm() != 0.0);

    match units.len() {
        0 => first_unit
            .map_or_else(|| Expr::List(ListOp::summed(vec![])), |u| u.scaled(C_ZERO)),
        1 => {
            let (unit, c) = units.pop().expect("one entry");
            unit.scaled(c)
        }
        _ => Expr::List(ListOp::summed(
            units.into_iter().map(|(u, c)| u.scaled(c)).collect(),
        )),
    }
}

fn reduce_compose(children: Vec<Expr>, coeff: Complex64) -> Expr {
    // Flatten nested compositions, accumulating scalar factors.
    let mut total = coeff;
    let mut flat: Vec<Expr> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Expr::List(l) if l.rule() == CombineRule::Compose => {
                total *= l.coeff();
                flat.extend(l.children().iter().cloned());
            }
            other => flat.push(other),
        }
    }

    // Merge adjacent Pauli primitives.
    let mut merged: Vec<Expr> = Vec::with_capacity(flat.len());
    for child in flat {
        let product = match (merged.last(), &child) {
            (Some(Expr::Primitive(prev)), Expr::Primitive(next)) => {
                prev.compose_pauli(next).and_then(Result::ok)
            }
            _ => None,
        };
        match product {
            Some(p) => *merged.last_mut().expect("non-empty") = Expr::Primitive(p),
            None => merged.push(child),
        }
    }

    match merged.len() {
        0 => Expr::List(ListOp::composed(vec![]).set_coeff(total)),
        1 => merged.pop().expect("one child").scaled(total),
        _ => Expr::List(ListOp::composed(merged).set_coeff(total)),
    }
}

fn reduce_tensor(children: Vec<Expr>, coeff: Complex64) -> Expr {
    let mut total = coeff;
    let mut flat: Vec<Expr> = Vec::with_capacity(children.len());
    for child in children {
        match child {
            Expr::List(l) if l.rule() == CombineRule::Tensor => {
                total *= l.coeff();
                flat.extend(l.children().iter().cloned());
            }
            other => flat.push(other),
        }
    }

    let mut merged: Vec<Expr> = Vec::with_capacity(flat.len());
    for child in flat {
        let product = match (merged.last(), &child) {
            (Some(Expr::Primitive(prev)), Expr::Primitive(next)) => prev.tensor_pauli(next),
            _ => None,
        };
        match product {
            Some(p) => *merged.last_mut().expect("non-empty") = Expr::Primitive(p),
            None => merged.push(child),
        }
    }

    match merged.len() {
        0 => Expr::List(ListOp::tensored(vec![]).set_coeff(total)),
        1 => merged.pop().expect("one child").scaled(total),
        _ => Expr::List(ListOp::tensored(merged).set_coeff(total)),
    }
}

// =============================================================================
// Operator sugar
// =============================================================================

impl std::ops::Add for Expr {
    type Output = Expr;

    /// Structural sugar for [`Expr::try_add`].
    ///
    /// # Panics
    /// Panics on width or measurement mismatches; use `try_add` to handle
    /// those as errors.
    fn add(self, rhs: Expr) -> Expr {
        match self.try_add(&rhs) {
            Ok(expr) => expr,
            Err(err) => panic!("{err}"),
        }
    }
}

impl std::ops::Sub for Expr {
    type Output = Expr;

    /// Structural sugar for `a + (−1)·b`.
    ///
    /// # Panics
    /// Panics on width or measurement mismatches.
    fn sub(self, rhs: Expr) -> Expr {
        self + rhs.scaled(-C_ONE)
    }
}

impl std::ops::Mul<f64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: f64) -> Expr {
        self.scaled(Complex64::new(rhs, 0.0))
    }
}

impl std::ops::Mul<Expr> for f64 {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        rhs.scaled(Complex64::new(self, 0.0))
    }
}

impl std::ops::Mul<Complex64> for Expr {
    type Output = Expr;

    fn mul(self, rhs: Complex64) -> Expr {
        self.scaled(rhs)
    }
}

impl std::ops::Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Expr {
        self.scaled(-C_ONE)
    }
}

impl From<PrimitiveOp> for Expr {
    fn from(value: PrimitiveOp) -> Self {
        Expr::Primitive(value)
    }
}

impl From<StateFn> for Expr {
    fn from(value: StateFn) -> Self {
        Expr::State(value)
    }
}

impl From<ListOp> for Expr {
    fn from(value: ListOp) -> Self {
        Expr::List(value)
    }
}

impl From<CVarMeasurement> for Expr {
    fn from(value: CVarMeasurement) -> Self {
        Expr::CVar(value)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Primitive(p) => write!(f, "{p}"),
            Expr::State(s) => write!(f, "{s}"),
            Expr::CVar(c) => write!(f, "{c}"),
            Expr::List(l) => {
                let sep = match l.rule() {
                    CombineRule::Sum => " + ",
                    CombineRule::Compose => " @ ",
                    CombineRule::Tensor => " ⊗ ",
                    CombineRule::Generic => ", ",
                };
                if l.coeff() != C_ONE {
                    write!(f, "{} * ", l.coeff())?;
                }
                write!(f, "(")?;
                for (i, child) in l.children().iter().enumerate() {
                    if i > 0 {
                        write!(f, "{sep}")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
        }
    }
}
