//! Quantum Key Distribution (QKD).
//!
//! - **BB84**: prepare-and-measure key distribution with basis sifting and error estimation.
//! - **analysis**: theoretical error curves, security grading and run comparisons.

pub mod analysis;
pub mod bb84;
