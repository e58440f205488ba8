//! Pauli strings with phase-correct products.
//!
//! A Pauli string is a dense tensor product of single-qubit Pauli axes,
//! one per qubit. Character `k` of a label is the axis on qubit `k`, so
//! `"XZI"` is X on qubit 0, Z on qubit 1 and identity on qubit 2.

use ndarray::{Array2, arr2};
use ndarray::linalg::kron;
use num_complex::Complex64;
use std::fmt;

use crate::error::{ExprError, ExprResult};

/// Single-qubit Pauli axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PauliAxis {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl PauliAxis {
    /// Parse an axis from a label character.
    pub fn from_char(ch: char) -> ExprResult<Self> {
        match ch {
            'I' => Ok(PauliAxis::I),
            'X' => Ok(PauliAxis::X),
            'Y' => Ok(PauliAxis::Y),
            'Z' => Ok(PauliAxis::Z),
            other => Err(ExprError::InvalidPauliLabel(other)),
        }
    }

    /// The label character of this axis.
    pub fn to_char(self) -> char {
        match self {
            PauliAxis::I => 'I',
            PauliAxis::X => 'X',
            PauliAxis::Y => 'Y',
            PauliAxis::Z => 'Z',
        }
    }

    /// The 2x2 matrix of this axis.
    pub fn matrix(self) -> Array2<Complex64> {
        let (a, b, c, d) = match self {
            PauliAxis::I => ((1.0, 0.0), (0.0, 0.0), (0.0, 0.0), (1.0, 0.0)),
            PauliAxis::X => ((0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (0.0, 0.0)),
            PauliAxis::Y => ((0.0, 0.0), (0.0, -1.0), (0.0, 1.0), (0.0, 0.0)),
            PauliAxis::Z => ((1.0, 0.0), (0.0, 0.0), (0.0, 0.0), (-1.0, 0.0)),
        };
        arr2(&[
            [Complex64::new(a.0, a.1), Complex64::new(b.0, b.1)],
            [Complex64::new(c.0, c.1), Complex64::new(d.0, d.1)],
        ])
    }

    /// Single-qubit product `self · other`, returning `(phase, axis)`.
    ///
    /// `X·Y = iZ`, `Y·X = −iZ` and cyclic permutations; equal axes square
    /// to the identity.
    pub fn mul(self, other: Self) -> (Complex64, Self) {
        use PauliAxis::{I, X, Y, Z};
        let one = Complex64::new(1.0, 0.0);
        let i = Complex64::new(0.0, 1.0);
        match (self, other) {
            (I, a) | (a, I) => (one, a),
            (a, b) if a == b => (one, I),
            (X, Y) => (i, Z),
            (Y, X) => (-i, Z),
            (Y, Z) => (i, X),
            (Z, Y) => (-i, X),
            (Z, X) => (i, Y),
            (X, Z) => (-i, Y),
            _ => unreachable!("all axis pairs covered"),
        }
    }
}

/// A dense multi-qubit Pauli string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PauliString {
    axes: Vec<PauliAxis>,
}

impl PauliString {
    /// Construct from a label such as `"XZI"` (char k = qubit k).
    pub fn from_label(label: &str) -> ExprResult<Self> {
        let axes = label.chars().map(PauliAxis::from_char).collect::<ExprResult<_>>()?;
        Ok(Self { axes })
    }

    /// The identity string on `n` qubits.
    pub fn identity(n: u32) -> Self {
        Self {
            axes: vec![PauliAxis::I; n as usize],
        }
    }

    /// A single non-identity axis on qubit `qubit` of an `n`-qubit string.
    pub fn single(n: u32, qubit: u32, axis: PauliAxis) -> Self {
        let mut axes = vec![PauliAxis::I; n as usize];
        axes[qubit as usize] = axis;
        Self { axes }
    }

    /// Construct directly from axes (qubit order).
    pub fn from_axes(axes: Vec<PauliAxis>) -> Self {
        Self { axes }
    }

    /// The per-qubit axes.
    pub fn axes(&self) -> &[PauliAxis] {
        &self.axes
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.axes.len() as u32
    }

    /// True if every axis is the identity.
    pub fn is_identity(&self) -> bool {
        self.axes.iter().all(|a| *a == PauliAxis::I)
    }

    /// True if the string is diagonal in the computational basis (no X/Y).
    pub fn is_diagonal(&self) -> bool {
        self.axes
            .iter()
            .all(|a| matches!(a, PauliAxis::I | PauliAxis::Z))
    }

    /// Qubit-wise product `self · other` with the accumulated phase.
    pub fn mul(&self, other: &PauliString) -> ExprResult<(Complex64, PauliString)> {
        if self.num_qubits() != other.num_qubits() {
            return Err(ExprError::QubitCountMismatch {
                op: "multiply",
                left: self.num_qubits(),
                right: other.num_qubits(),
            });
        }
        let mut phase = Complex64::new(1.0, 0.0);
        let axes = self
            .axes
            .iter()
            .zip(&other.axes)
            .map(|(a, b)| {
                let (p, ax) = a.mul(*b);
                phase *= p;
                ax
            })
            .collect();
        Ok((phase, PauliString { axes }))
    }

    /// Concatenate qubit registers: `self` keeps qubits `[0, n)`, `other`
    /// occupies `[n, n + m)`.
    pub fn tensor(&self, other: &PauliString) -> PauliString {
        let mut axes = self.axes.clone();
        axes.extend_from_slice(&other.axes);
        PauliString { axes }
    }

    /// Replace X and Y axes by Z, the diagonal image under the basis
    /// rotation that measures them.
    pub fn diagonalized(&self) -> PauliString {
        let axes = self
            .axes
            .iter()
            .map(|a| match a {
                PauliAxis::I => PauliAxis::I,
                _ => PauliAxis::Z,
            })
            .collect();
        PauliString { axes }
    }

    /// Two strings qubit-wise commute when on every qubit the axes are
    /// equal or one of them is the identity.
    pub fn qubit_wise_commutes(&self, other: &PauliString) -> bool {
        self.axes.len() == other.axes.len()
            && self.axes.iter().zip(&other.axes).all(|(a, b)| {
                *a == PauliAxis::I || *b == PauliAxis::I || a == b
            })
    }

    /// The diagonal matrix entry `⟨b|P|b⟩`.
    ///
    /// Zero for strings with X or Y axes; otherwise the Z-parity of the
    /// bitstring (char k = qubit k).
    pub fn diagonal_entry(&self, bitstring: &str) -> ExprResult<Complex64> {
        if bitstring.len() != self.axes.len() {
            return Err(ExprError::InvalidBitstring {
                len: bitstring.len(),
                num_qubits: self.num_qubits(),
            });
        }
        if !self.is_diagonal() {
            return Ok(Complex64::new(0.0, 0.0));
        }
        let mut sign = 1.0;
        for (axis, bit) in self.axes.iter().zip(bitstring.chars()) {
            if *axis == PauliAxis::Z && bit == '1' {
                sign = -sign;
            }
        }
        Ok(Complex64::new(sign, 0.0))
    }

    /// The dense matrix of this string (qubit 0 = least-significant bit).
    pub fn to_matrix(&self) -> Array2<Complex64> {
        let mut iter = self.axes.iter();
        let first = iter
            .next()
            .map_or_else(|| Array2::eye(1), |a| a.matrix());
        iter.fold(first, |acc, axis| kron(&axis.matrix(), &acc))
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in &self.axes {
            write!(f, "{}", axis.to_char())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_roundtrip() {
        let p = PauliString::from_label("XZIY").unwrap();
        assert_eq!(p.to_string(), "XZIY");
        assert_eq!(p.num_qubits(), 4);
    }

    #[test]
    fn test_invalid_label() {
        assert!(matches!(
            PauliString::from_label("XQ"),
            Err(ExprError::InvalidPauliLabel('Q'))
        ));
    }

    #[test]
    fn test_product_phase() {
        let x = PauliString::from_label("X").unwrap();
        let y = PauliString::from_label("Y").unwrap();
        let (phase, z) = x.mul(&y).unwrap();
        assert_eq!(z.to_string(), "Z");
        assert!((phase - Complex64::new(0.0, 1.0)).norm() < 1e-15);

        let (phase_rev, z_rev) = y.mul(&x).unwrap();
        assert_eq!(z_rev.to_string(), "Z");
        assert!((phase_rev - Complex64::new(0.0, -1.0)).norm() < 1e-15);
    }

    #[test]
    fn test_square_is_identity() {
        let p = PauliString::from_label("XYZ").unwrap();
        let (phase, sq) = p.mul(&p).unwrap();
        assert!(sq.is_identity());
        assert!((phase - Complex64::new(1.0, 0.0)).norm() < 1e-15);
    }

    #[test]
    fn test_diagonal_entry_parity() {
        let zz = PauliString::from_label("ZZ").unwrap();
        assert_eq!(zz.diagonal_entry("00").unwrap().re, 1.0);
        assert_eq!(zz.diagonal_entry("01").unwrap().re, -1.0);
        assert_eq!(zz.diagonal_entry("11").unwrap().re, 1.0);
    }

    #[test]
    fn test_diagonal_entry_wrong_length() {
        let z = PauliString::from_label("Z").unwrap();
        assert!(matches!(
            z.diagonal_entry("01"),
            Err(ExprError::InvalidBitstring { .. })
        ));
    }

    #[test]
    fn test_off_diagonal_entry_is_zero() {
        let x = PauliString::from_label("X").unwrap();
        assert_eq!(x.diagonal_entry("0").unwrap().norm(), 0.0);
    }

    #[test]
    fn test_qubit_wise_commutes() {
        let zi = PauliString::from_label("ZI").unwrap();
        let zz = PauliString::from_label("ZZ").unwrap();
        let xi = PauliString::from_label("XI").unwrap();
        assert!(zi.qubit_wise_commutes(&zz));
        assert!(!zi.qubit_wise_commutes(&xi));
    }

    #[test]
    fn test_matrix_z_is_diag() {
        let z = PauliString::from_label("Z").unwrap();
        let m = z.to_matrix();
        assert_eq!(m[[0, 0]].re, 1.0);
        assert_eq!(m[[1, 1]].re, -1.0);
        assert_eq!(m[[0, 1]].norm(), 0.0);
    }

    #[test]
    fn test_tensor_keeps_qubit_order() {
        let x = PauliString::from_label("X").unwrap();
        let z = PauliString::from_label("Z").unwrap();
        assert_eq!(x.tensor(&z).to_string(), "XZ");
    }
}
