use super::QubitBackend;
use crate::{Basis, errors::StateError};
use rand::Rng;

/// BB84 states are fully described by the encoded bit and the encoding basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicalQubit {
    pub bit: bool,
    pub basis: Basis,
}

/// Stand-in backend that samples measurement outcomes directly.
///
/// Measuring in the encoding basis returns the encoded bit; measuring in the conjugate basis
/// returns a fair coin. No amplitudes are tracked.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProbabilisticBackend;

impl ProbabilisticBackend {
    pub fn new() -> Self {
        Self
    }
}

impl QubitBackend for ProbabilisticBackend {
    type Qubit = ClassicalQubit;

    fn prepare(&self, bit: bool, basis: Basis) -> Result<ClassicalQubit, StateError> {
        Ok(ClassicalQubit { bit, basis })
    }

    fn rotate(&self, qubit: &mut ClassicalQubit, basis: Basis) -> Result<(), StateError> {
        // H|0> = |+>, H|1> = |->, and H is self-inverse
        if basis == Basis::Hadamard {
            qubit.basis = qubit.basis.conjugate();
        }
        Ok(())
    }

    fn flip(&self, qubit: &mut ClassicalQubit) -> Result<(), StateError> {
        // X|±> = ±|±>: only a global phase
        if qubit.basis == Basis::Computational {
            qubit.bit = !qubit.bit;
        }
        Ok(())
    }

    fn measure<R: Rng>(
        &self,
        qubit: &mut ClassicalQubit,
        basis: Basis,
        rng: &mut R,
    ) -> Result<bool, StateError> {
        let outcome = if qubit.basis == basis {
            qubit.bit
        } else {
            rng.random_bool(0.5)
        };
        *qubit = ClassicalQubit {
            bit: outcome,
            basis,
        };
        Ok(outcome)
    }
}
