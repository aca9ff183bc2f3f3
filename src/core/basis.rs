use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Encoding/measurement frame chosen independently by each party per round.
///
/// - `Computational`: eigenstates $|0\rangle$, $|1\rangle$.
/// - `Hadamard`: eigenstates $|+\rangle$, $|-\rangle$.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Basis {
    Computational,
    Hadamard,
}

impl Basis {
    /// Draws a basis with a fair coin.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::from_bit(rng.random_bool(0.5))
    }

    /// `false` -> Computational, `true` -> Hadamard.
    pub fn from_bit(bit: bool) -> Self {
        if bit {
            Basis::Hadamard
        } else {
            Basis::Computational
        }
    }

    /// The other basis.
    pub fn conjugate(self) -> Self {
        match self {
            Basis::Computational => Basis::Hadamard,
            Basis::Hadamard => Basis::Computational,
        }
    }

    /// Single-letter label used when rendering basis sequences.
    pub fn symbol(self) -> char {
        match self {
            Basis::Computational => 'C',
            Basis::Hadamard => 'H',
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Basis::Computational => write!(f, "computational"),
            Basis::Hadamard => write!(f, "hadamard"),
        }
    }
}
