use crate::core::Gate;
use crate::core::errors::StateError;
use crate::core::measurements::{Measurement, MeasurementResult};
use crate::core::utils::{sandwich, trace};
use ndarray::Array2;
use num_complex::Complex64;
use rand::Rng;

/// Probabilities below this are treated as impossible outcomes.
const PROBABILITY_FLOOR: f64 = 1e-12;

/// Density matrix of a single qubit.
#[derive(Clone, Debug)]
pub struct QuantumState {
    pub density_matrix: Array2<Complex64>,
}

impl Default for QuantumState {
    fn default() -> Self {
        Self::new()
    }
}

impl QuantumState {
    /// Creates a new quantum state initialized to |0>.
    pub fn new() -> Self {
        let mut density_matrix = Array2::<Complex64>::zeros((2, 2));
        density_matrix[[0, 0]] = Complex64::new(1.0, 0.0);

        Self { density_matrix }
    }

    /// Checks the validity of a density matrix
    fn check_density_matrix(matrix: &Array2<Complex64>) -> Result<(), StateError> {
        let (rows, cols) = matrix.dim();

        if rows != 2 || cols != 2 {
            return Err(StateError::DimensionMismatch {
                expected: 2,
                got_rows: rows,
                got_cols: cols,
            });
        }

        let tr = trace(matrix);
        if (tr - Complex64::new(1.0, 0.0)).norm() > 1e-12 {
            return Err(StateError::InvalidTrace(tr));
        }

        Ok(())
    }

    /// Checks if a QuantumState is valid.
    pub fn is_valid(&self) -> Result<(), StateError> {
        Self::check_density_matrix(&self.density_matrix)
    }

    /// Discards the current state and re-initialises to |0>.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Applies a gate: rho -> U rho U†
    pub fn apply(&mut self, gate: &Gate) {
        self.density_matrix = sandwich(&gate.matrix, &self.density_matrix);
    }

    /// Born-rule probability of each outcome, renormalised after clamping float noise.
    pub fn probabilities(&self, measurement: &Measurement) -> Result<Vec<f64>, StateError> {
        let mut probs: Vec<f64> = measurement
            .operators
            .iter()
            .map(|op| {
                let p = trace(&sandwich(op, &self.density_matrix)).re;
                if p < PROBABILITY_FLOOR { 0.0 } else { p }
            })
            .collect();

        let total: f64 = probs.iter().sum();
        if total <= PROBABILITY_FLOOR {
            return Err(StateError::NoPossibleOutcome);
        }

        for p in &mut probs {
            *p /= total;
        }

        Ok(probs)
    }

    /// Samples an outcome index from `probs`, never returning a zero-probability outcome.
    fn pick_outcome<R: Rng>(probs: &[f64], rng: &mut R) -> usize {
        let roll: f64 = rng.random();

        let mut cumulative = 0.0;
        let mut last_possible = 0;
        for (i, &p) in probs.iter().enumerate() {
            if p == 0.0 {
                continue;
            }
            last_possible = i;
            cumulative += p;
            if roll < cumulative {
                return i;
            }
        }
        last_possible
    }

    /// Physical measurement which changes the state irretrievably
    pub fn measure<R: Rng>(
        &mut self,
        measurement: &Measurement,
        rng: &mut R,
    ) -> Result<MeasurementResult, StateError> {
        let probs = self.probabilities(measurement)?;

        let index = Self::pick_outcome(&probs, rng);
        let p_selected = probs[index];

        // rho' = (M_k * rho * M_k†) / p_k
        let numerator = sandwich(&measurement.operators[index], &self.density_matrix);
        self.density_matrix = numerator.mapv(|val| val / Complex64::new(p_selected, 0.0));
        self.is_valid()?;

        Ok(MeasurementResult { index })
    }
}
