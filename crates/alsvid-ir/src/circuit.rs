//! Circuit builder over a flat instruction list.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{IrError, IrResult};
use crate::gate::StandardGate;
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::ParameterExpression;
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit: an ordered list of instructions over fixed registers.
///
/// Instructions execute front to back. The builder methods validate operands
/// eagerly so a constructed circuit is always well-formed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    /// Number of qubits.
    num_qubits: u32,
    /// Number of classical bits.
    num_clbits: u32,
    /// The instruction sequence.
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit with no qubits.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_size(name, 0, 0)
    }

    /// Create a circuit with a given number of qubits and classical bits.
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        Self {
            name: name.into(),
            num_qubits,
            num_clbits,
            instructions: vec![],
        }
    }

    /// Append a validated instruction.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<()> {
        if let InstructionKind::Gate(gate) = &instruction.kind {
            let expected = gate.num_qubits();
            let got = instruction.qubits.len() as u32;
            if expected != got {
                return Err(IrError::ArityMismatch {
                    gate: gate.name(),
                    expected,
                    got,
                });
            }
            for (i, q) in instruction.qubits.iter().enumerate() {
                if instruction.qubits[..i].contains(q) {
                    return Err(IrError::DuplicateQubit {
                        qubit: *q,
                        gate: gate.name(),
                    });
                }
            }
        }
        if let InstructionKind::Measure = &instruction.kind {
            if instruction.qubits.len() != instruction.clbits.len() {
                return Err(IrError::MeasureArity {
                    qubits: instruction.qubits.len(),
                    clbits: instruction.clbits.len(),
                });
            }
            for clbit in &instruction.clbits {
                if clbit.0 >= self.num_clbits {
                    return Err(IrError::ClbitOutOfRange {
                        clbit: *clbit,
                        num_clbits: self.num_clbits,
                    });
                }
            }
        }
        for qubit in &instruction.qubits {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitOutOfRange {
                    qubit: *qubit,
                    num_qubits: self.num_qubits,
                });
            }
        }
        self.instructions.push(instruction);
        Ok(())
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::H, qubit))?;
        Ok(self)
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::X, qubit))?;
        Ok(self)
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Y, qubit))?;
        Ok(self)
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Z, qubit))?;
        Ok(self)
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::S, qubit))?;
        Ok(self)
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Sdg, qubit))?;
        Ok(self)
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::T, qubit))?;
        Ok(self)
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Tdg, qubit))?;
        Ok(self)
    }

    /// Apply Rx rotation gate.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Rx(theta.into()),
            qubit,
        ))?;
        Ok(self)
    }

    /// Apply Ry rotation gate.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Ry(theta.into()),
            qubit,
        ))?;
        Ok(self)
    }

    /// Apply Rz rotation gate.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Rz(theta.into()),
            qubit,
        ))?;
        Ok(self)
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::P(theta.into()),
            qubit,
        ))?;
        Ok(self)
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::CX, control, target))?;
        Ok(self)
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::CY, control, target))?;
        Ok(self)
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::CZ, control, target))?;
        Ok(self)
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::Swap, q1, q2))?;
        Ok(self)
    }

    /// Apply RZZ (ZZ rotation) gate.
    pub fn rzz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        q1: QubitId,
        q2: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(
            StandardGate::RZZ(theta.into()),
            q1,
            q2,
        ))?;
        Ok(self)
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.apply(Instruction::measure([qubit], [clbit]))?;
        Ok(self)
    }

    /// Measure all qubits, growing the classical register if needed.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        if self.num_clbits < self.num_qubits {
            self.num_clbits = self.num_qubits;
        }
        let qubits: Vec<_> = (0..self.num_qubits).map(QubitId).collect();
        let clbits: Vec<_> = (0..self.num_qubits).map(ClbitId).collect();
        self.apply(Instruction::measure(qubits, clbits))?;
        Ok(self)
    }

    /// Request an expectation snapshot over all qubits.
    pub fn snapshot_expectation(
        &mut self,
        label: impl Into<String>,
        terms: Vec<(f64, String)>,
    ) -> IrResult<&mut Self> {
        let qubits: Vec<_> = (0..self.num_qubits).map(QubitId).collect();
        self.apply(Instruction::expectation_snapshot(label, terms, qubits))?;
        Ok(self)
    }

    /// Append another circuit's instructions to this one.
    ///
    /// Both circuits must have the same qubit count.
    pub fn append(&mut self, other: &Circuit) -> IrResult<&mut Self> {
        if other.num_qubits != self.num_qubits {
            return Err(IrError::WidthMismatch {
                left: self.num_qubits,
                right: other.num_qubits,
            });
        }
        self.num_clbits = self.num_clbits.max(other.num_clbits);
        self.instructions.extend(other.instructions.iter().cloned());
        Ok(self)
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// All free parameter names in this circuit, sorted and de-duplicated.
    pub fn parameters(&self) -> Vec<String> {
        let mut set = BTreeSet::new();
        for inst in &self.instructions {
            if let InstructionKind::Gate(gate) = &inst.kind {
                for p in gate.parameters() {
                    set.extend(p.symbols());
                }
            }
        }
        set.into_iter().collect()
    }

    /// Check if any instruction carries a free symbolic parameter.
    pub fn is_parameterized(&self) -> bool {
        self.instructions.iter().any(Instruction::is_parameterized)
    }

    /// Return a copy with every parameter in `values` bound.
    ///
    /// Parameters absent from `values` stay symbolic.
    pub fn bind_parameters(&self, values: &FxHashMap<String, f64>) -> Circuit {
        let instructions = self
            .instructions
            .iter()
            .map(|inst| match &inst.kind {
                InstructionKind::Gate(gate) => Instruction {
                    kind: InstructionKind::Gate(gate.bind_all(values)),
                    qubits: inst.qubits.clone(),
                    clbits: inst.clbits.clone(),
                },
                _ => inst.clone(),
            })
            .collect();
        Circuit {
            name: self.name.clone(),
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            instructions,
        }
    }

    /// Return a copy with `name → name + delta` substituted in every gate.
    pub fn shift_parameter(&self, name: &str, delta: f64) -> Circuit {
        let instructions = self
            .instructions
            .iter()
            .map(|inst| match &inst.kind {
                InstructionKind::Gate(gate) => Instruction {
                    kind: InstructionKind::Gate(gate.shifted(name, delta)),
                    qubits: inst.qubits.clone(),
                    clbits: inst.clbits.clone(),
                },
                _ => inst.clone(),
            })
            .collect();
        Circuit {
            name: self.name.clone(),
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            instructions,
        }
    }

    /// Parallel composition: `self` keeps qubits `[0, n)`, `other` is
    /// shifted onto `[n, n + m)`.
    pub fn tensor(&self, other: &Circuit) -> Circuit {
        let qubit_offset = self.num_qubits;
        let clbit_offset = self.num_clbits;
        let mut instructions = self.instructions.clone();
        instructions.extend(other.instructions.iter().map(|inst| Instruction {
            kind: inst.kind.clone(),
            qubits: inst.qubits.iter().map(|q| QubitId(q.0 + qubit_offset)).collect(),
            clbits: inst.clbits.iter().map(|c| ClbitId(c.0 + clbit_offset)).collect(),
        }));
        Circuit {
            name: format!("{}_{}", self.name, other.name),
            num_qubits: self.num_qubits + other.num_qubits,
            num_clbits: self.num_clbits + other.num_clbits,
            instructions,
        }
    }

    /// The inverse circuit: reversed instruction order, inverted gates.
    ///
    /// Errors if the circuit contains measurements or snapshots.
    pub fn inverse(&self) -> IrResult<Circuit> {
        let mut instructions = Vec::with_capacity(self.instructions.len());
        for inst in self.instructions.iter().rev() {
            match &inst.kind {
                InstructionKind::Gate(gate) => instructions.push(Instruction {
                    kind: InstructionKind::Gate(gate.inverse()),
                    qubits: inst.qubits.clone(),
                    clbits: inst.clbits.clone(),
                }),
                InstructionKind::Measure => {
                    return Err(IrError::NonInvertible("measure"));
                }
                InstructionKind::ExpectationSnapshot { .. } => {
                    return Err(IrError::NonInvertible("snapshot"));
                }
            }
        }
        Ok(Circuit {
            name: format!("{}_dg", self.name),
            num_qubits: self.num_qubits,
            num_clbits: self.num_clbits,
            instructions,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> u32 {
        self.num_clbits
    }

    /// Get the instruction sequence.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Check if the circuit has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}
