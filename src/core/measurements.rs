use crate::core::basis::Basis;
use crate::core::errors::MeasurementError;
use crate::core::utils;
use ndarray::{Array1, Array2, array};
use num_complex::Complex64;

/// Projective measurement; outcome `k` corresponds to `operators[k]`.
#[derive(Clone, Debug)]
pub struct Measurement {
    /// List of measurement operators
    pub operators: Vec<Array2<Complex64>>,
}

impl Measurement {
    /// Checks operator dimensions and the completeness relation.
    fn validate(operators: &[Array2<Complex64>]) -> Result<(), MeasurementError> {
        if operators.is_empty() || operators.iter().any(|op| op.dim() != (2, 2)) {
            return Err(MeasurementError::InvalidDimensions);
        }

        if !utils::check_completeness(operators, 2) {
            return Err(MeasurementError::NotComplete);
        }

        Ok(())
    }

    /// Builds the projective measurement onto an orthonormal pair of states.
    fn projective(v0: Array1<Complex64>, v1: Array1<Complex64>) -> Measurement {
        let operators = vec![
            utils::outer_product(&v0, &v0),
            utils::outer_product(&v1, &v1),
        ];
        debug_assert!(
            Self::validate(&operators).is_ok(),
            "basis states are not orthonormal"
        );
        Measurement { operators }
    }

    /// Z basis (Computational) -> {|0>, |1>}.
    pub fn z_basis() -> Measurement {
        Self::projective(
            array![Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            array![Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
        )
    }

    /// X basis (Hadamard) -> {|+>, |->}.
    pub fn x_basis() -> Measurement {
        let inv_sqrt2 = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        Self::projective(array![inv_sqrt2, inv_sqrt2], array![inv_sqrt2, -inv_sqrt2])
    }

    /// Measurement whose outcome index 0/1 is the bit encoded in `basis`.
    pub fn for_basis(basis: Basis) -> Measurement {
        match basis {
            Basis::Computational => Self::z_basis(),
            Basis::Hadamard => Self::x_basis(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasurementResult {
    /// Applied measurement operator index
    pub index: usize,
}

impl MeasurementResult {
    /// Outcome read as a classical bit.
    pub fn bit(&self) -> bool {
        self.index == 1
    }
}
