use crate::core::basis::Basis;
use crate::core::errors::GateError;
use crate::core::utils;
use ndarray::{Array2, arr2};
use num_complex::Complex64;

/// Represents a single-qubit quantum gate.
pub struct Gate {
    /// The 2x2 unitary matrix of the gate.
    pub matrix: Array2<Complex64>,
}

impl Gate {
    /// Checks that `matrix` is a valid single-qubit gate.
    ///
    /// # Errors
    ///
    /// Returns a `GateError` if:
    /// - The matrix is not square.
    /// - The matrix is not 2x2.
    /// - The matrix is not unitary.
    fn validate(matrix: &Array2<Complex64>) -> Result<(), GateError> {
        let (rows, cols) = matrix.dim();

        if rows != cols {
            return Err(GateError::NotSquareMatrix);
        }

        if rows != 2 {
            return Err(GateError::InvalidDimensions { rows, cols });
        }

        if !Self::check_unitary(matrix) {
            return Err(GateError::NonUnitary);
        }

        Ok(())
    }

    /// Checks if a given matrix is unitary
    fn check_unitary(matrix: &Array2<Complex64>) -> bool {
        let (rows, _) = matrix.dim();
        let eye = Array2::<Complex64>::eye(rows);

        let product = matrix.dot(&utils::dagger(matrix));

        product
            .iter()
            .zip(eye.iter())
            .all(|(a, b)| (*a - *b).norm() < 1e-6)
    }

    fn standard(matrix: Array2<Complex64>) -> Gate {
        debug_assert!(Self::validate(&matrix).is_ok(), "standard gate is not unitary");
        Gate { matrix }
    }

    // --- Standard Gates ---

    /// Identity gate.
    pub fn i() -> Gate {
        Self::standard(Array2::<Complex64>::eye(2))
    }

    /// Pauli-X gate (NOT gate).
    pub fn x() -> Gate {
        Self::standard(arr2(&[
            [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
        ]))
    }

    /// Hadamard gate.
    pub fn h() -> Gate {
        let factor = 1.0 / 2.0_f64.sqrt();
        Self::standard(arr2(&[
            [Complex64::new(factor, 0.0), Complex64::new(factor, 0.0)],
            [Complex64::new(factor, 0.0), Complex64::new(-factor, 0.0)],
        ]))
    }

    /// Rotation taking the computational basis onto `basis`.
    pub fn basis_change(basis: Basis) -> Gate {
        match basis {
            Basis::Computational => Gate::i(),
            Basis::Hadamard => Gate::h(),
        }
    }
}
