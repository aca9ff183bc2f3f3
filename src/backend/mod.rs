//! Qubit backends.
//!
//! The BB84 simulator never touches quantum state directly. It drives a [`QubitBackend`],
//! which owns the per-round qubit handle and exposes only the operations the protocol needs:
//! prepare, rotate, flip, measure and re-prepare.
//!
//! - [`DensityMatrixBackend`]: full single-qubit density-matrix simulation.
//! - [`ProbabilisticBackend`]: stand-in that tracks only `(bit, basis)` and samples outcomes
//!   directly. Observationally equivalent for BB84 rounds.

mod density;
mod probabilistic;

pub use density::DensityMatrixBackend;
pub use probabilistic::{ClassicalQubit, ProbabilisticBackend};

use crate::{Basis, errors::StateError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How channel noise acts on a transmitted qubit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoiseModel {
    /// Bob receives the state orthogonal to the one Alice sent, whatever happened on the way.
    ///
    /// A struck round is an error in the sifted key whether or not Eve already disturbed it,
    /// so the sifted error rate is `p` without Eve and `0.25 + 0.75p` with her.
    #[default]
    EncodedBitFlip,
    /// Applies a Pauli X to the qubit on the channel. Hadamard-basis states are X eigenstates and
    /// pass through unchanged, so only computational-basis rounds are disturbed.
    PauliX,
}

impl fmt::Display for NoiseModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseModel::EncodedBitFlip => write!(f, "encoded-bit-flip"),
            NoiseModel::PauliX => write!(f, "pauli-x"),
        }
    }
}

impl FromStr for NoiseModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "encoded-bit-flip" => Ok(NoiseModel::EncodedBitFlip),
            "pauli-x" => Ok(NoiseModel::PauliX),
            other => Err(format!(
                "unknown noise model `{other}` (expected encoded-bit-flip or pauli-x)"
            )),
        }
    }
}

/// Selects a backend implementation from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[default]
    DensityMatrix,
    Probabilistic,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::DensityMatrix => write!(f, "density-matrix"),
            BackendKind::Probabilistic => write!(f, "probabilistic"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "density-matrix" => Ok(BackendKind::DensityMatrix),
            "probabilistic" => Ok(BackendKind::Probabilistic),
            other => Err(format!(
                "unknown backend `{other}` (expected density-matrix or probabilistic)"
            )),
        }
    }
}

/// Capability set of a single-qubit engine.
///
/// A `Qubit` handle belongs to exactly one round; backends never share handles between rounds.
pub trait QubitBackend {
    type Qubit;

    /// Prepares a fresh qubit encoding `bit` in `basis`.
    fn prepare(&self, bit: bool, basis: Basis) -> Result<Self::Qubit, StateError>;

    /// Applies the rotation from the computational basis onto `basis` (H for Hadamard, identity otherwise).
    fn rotate(&self, qubit: &mut Self::Qubit, basis: Basis) -> Result<(), StateError>;

    /// Applies a Pauli X.
    fn flip(&self, qubit: &mut Self::Qubit) -> Result<(), StateError>;

    /// Measures in `basis`, collapsing the handle, and returns the classical bit.
    fn measure<R: Rng>(
        &self,
        qubit: &mut Self::Qubit,
        basis: Basis,
        rng: &mut R,
    ) -> Result<bool, StateError>;

    /// Discards the old state and replaces it with a fresh encoding of `bit` in `basis`.
    fn reprepare(&self, qubit: &mut Self::Qubit, bit: bool, basis: Basis) -> Result<(), StateError> {
        *qubit = self.prepare(bit, basis)?;
        Ok(())
    }
}
