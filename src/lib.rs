pub mod backend;
pub mod config;
mod core;
pub mod protocols;

pub use crate::backend::{
    BackendKind, DensityMatrixBackend, NoiseModel, ProbabilisticBackend, QubitBackend,
};
pub use crate::core::{Basis, Gate, Measurement, MeasurementResult, QuantumState, errors, utils};
pub use crate::protocols::bb84::{Bb84Params, ProtocolResult, Round};
