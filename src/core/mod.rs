mod basis;
pub mod errors;
mod gates;
mod measurements;
mod state;
pub mod utils;

pub use basis::Basis;
pub use gates::Gate;
pub use measurements::{Measurement, MeasurementResult};
pub use state::QuantumState;
