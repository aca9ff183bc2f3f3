use super::QubitBackend;
use crate::{Basis, Gate, Measurement, QuantumState, errors::StateError};
use rand::Rng;

/// Backend simulating each qubit as a 2x2 density matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct DensityMatrixBackend;

impl DensityMatrixBackend {
    pub fn new() -> Self {
        Self
    }

    fn encode(state: &mut QuantumState, bit: bool, basis: Basis) {
        if bit {
            state.apply(&Gate::x());
        }
        state.apply(&Gate::basis_change(basis));
    }
}

impl QubitBackend for DensityMatrixBackend {
    type Qubit = QuantumState;

    fn prepare(&self, bit: bool, basis: Basis) -> Result<QuantumState, StateError> {
        let mut state = QuantumState::new();
        Self::encode(&mut state, bit, basis);
        Ok(state)
    }

    fn rotate(&self, qubit: &mut QuantumState, basis: Basis) -> Result<(), StateError> {
        qubit.apply(&Gate::basis_change(basis));
        Ok(())
    }

    fn flip(&self, qubit: &mut QuantumState) -> Result<(), StateError> {
        qubit.apply(&Gate::x());
        Ok(())
    }

    fn measure<R: Rng>(
        &self,
        qubit: &mut QuantumState,
        basis: Basis,
        rng: &mut R,
    ) -> Result<bool, StateError> {
        let result = qubit.measure(&Measurement::for_basis(basis), rng)?;
        Ok(result.bit())
    }

    fn reprepare(&self, qubit: &mut QuantumState, bit: bool, basis: Basis) -> Result<(), StateError> {
        qubit.reset();
        Self::encode(qubit, bit, basis);
        Ok(())
    }
}
