//! BB84 sifting and error-estimation simulation.
//!
//! Each round Alice encodes a random bit in a random basis, an optional eavesdropper performs a
//! measure-and-resend attack, the channel may flip the encoded bit, and Bob measures in his own
//! random basis. Rounds where the two bases agree form the sifted key, and the fraction of
//! disagreeing sifted bits is the observed error rate.
//!
//! Expected error rate on the sifted key:
//! - without Eve: $p$ (the channel error rate)
//! - with Eve: $\approx 0.25 + p - 0.25\,p$

use crate::{
    Basis,
    backend::{DensityMatrixBackend, NoiseModel, QubitBackend},
    errors::ProtocolError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, trace, warn};

/// Rounds simulated per worker in [`run_parallel`]. Fixed so results do not depend on thread count.
pub const PARALLEL_CHUNK: usize = 256;

/// Validated parameters of one protocol run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bb84Params {
    n_bits: usize,
    channel_error_rate: f64,
    eavesdropper_present: bool,
    noise_model: NoiseModel,
}

impl Bb84Params {
    /// # Errors
    ///
    /// `ProtocolError::InvalidParameter` if `n_bits` is zero or `channel_error_rate` is outside `[0, 1]`.
    pub fn new(
        n_bits: usize,
        channel_error_rate: f64,
        eavesdropper_present: bool,
    ) -> Result<Self, ProtocolError> {
        if n_bits == 0 {
            return Err(ProtocolError::invalid("n_bits", "must be positive"));
        }
        if !(0.0..=1.0).contains(&channel_error_rate) {
            return Err(ProtocolError::invalid(
                "channel_error_rate",
                format!("{channel_error_rate} is not in [0, 1]"),
            ));
        }

        Ok(Self {
            n_bits,
            channel_error_rate,
            eavesdropper_present,
            noise_model: NoiseModel::default(),
        })
    }

    pub fn with_noise_model(mut self, noise_model: NoiseModel) -> Self {
        self.noise_model = noise_model;
        self
    }

    pub fn n_bits(&self) -> usize {
        self.n_bits
    }

    pub fn channel_error_rate(&self) -> f64 {
        self.channel_error_rate
    }

    pub fn eavesdropper_present(&self) -> bool {
        self.eavesdropper_present
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise_model
    }
}

/// Everything that happened in a single round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Round {
    pub index: usize,
    pub alice_bit: bool,
    pub alice_basis: Basis,
    pub bob_basis: Basis,
    /// Eve's basis and measured bit, when she intercepted.
    pub eve_basis: Option<Basis>,
    pub eve_bit: Option<bool>,
    /// Whether the channel flipped the qubit.
    pub noise_applied: bool,
    pub bob_bit: bool,
}

impl Round {
    pub fn bases_match(&self) -> bool {
        self.alice_basis == self.bob_basis
    }
}

/// Sifted keys and the agreement mask they were selected by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sifted {
    pub basis_match: Vec<bool>,
    pub alice_key: Vec<bool>,
    pub bob_key: Vec<bool>,
    pub mismatches: usize,
}

impl Sifted {
    /// Fraction of sifted positions where the keys differ; 0 for an empty key.
    pub fn error_rate(&self) -> f64 {
        if self.alice_key.is_empty() {
            0.0
        } else {
            self.mismatches as f64 / self.alice_key.len() as f64
        }
    }
}

/// Keeps the bits of rounds where Alice's and Bob's bases agree, preserving round order.
pub fn sift(
    alice_bits: &[bool],
    bob_bits: &[bool],
    alice_bases: &[Basis],
    bob_bases: &[Basis],
) -> Sifted {
    let basis_match: Vec<bool> = alice_bases
        .iter()
        .zip(bob_bases)
        .map(|(a, b)| a == b)
        .collect();

    let mut alice_key = Vec::new();
    let mut bob_key = Vec::new();
    let mut mismatches = 0;

    for ((&keep, &a_bit), &b_bit) in basis_match.iter().zip(alice_bits).zip(bob_bits) {
        if keep {
            alice_key.push(a_bit);
            bob_key.push(b_bit);
            if a_bit != b_bit {
                mismatches += 1;
            }
        }
    }

    Sifted {
        basis_match,
        alice_key,
        bob_key,
        mismatches,
    }
}

/// Result of one complete protocol run. Read-only once returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProtocolResult {
    n_bits: usize,
    channel_error_rate: f64,
    eavesdropper_present: bool,
    noise_model: NoiseModel,
    alice_bits: Vec<bool>,
    alice_bases: Vec<Basis>,
    bob_bases: Vec<Basis>,
    bob_bits: Vec<bool>,
    eve_bases: Option<Vec<Basis>>,
    eve_bits: Option<Vec<bool>>,
    noise_mask: Vec<bool>,
    basis_match: Vec<bool>,
    alice_key: Vec<bool>,
    bob_key: Vec<bool>,
    mismatches: usize,
    error_rate: f64,
}

impl ProtocolResult {
    /// Assembles a result from rounds given in index order.
    fn from_rounds(params: &Bb84Params, rounds: impl IntoIterator<Item = Round>) -> Self {
        let n = params.n_bits;
        let mut alice_bits = Vec::with_capacity(n);
        let mut alice_bases = Vec::with_capacity(n);
        let mut bob_bases = Vec::with_capacity(n);
        let mut bob_bits = Vec::with_capacity(n);
        let mut noise_mask = Vec::with_capacity(n);
        let mut eve_bases = Vec::new();
        let mut eve_bits = Vec::new();

        for round in rounds {
            alice_bits.push(round.alice_bit);
            alice_bases.push(round.alice_basis);
            bob_bases.push(round.bob_basis);
            bob_bits.push(round.bob_bit);
            noise_mask.push(round.noise_applied);
            if let (Some(basis), Some(bit)) = (round.eve_basis, round.eve_bit) {
                eve_bases.push(basis);
                eve_bits.push(bit);
            }
        }

        let sifted = sift(&alice_bits, &bob_bits, &alice_bases, &bob_bases);
        let error_rate = sifted.error_rate();

        let (eve_bases, eve_bits) = if params.eavesdropper_present {
            (Some(eve_bases), Some(eve_bits))
        } else {
            (None, None)
        };

        Self {
            n_bits: n,
            channel_error_rate: params.channel_error_rate,
            eavesdropper_present: params.eavesdropper_present,
            noise_model: params.noise_model,
            alice_bits,
            alice_bases,
            bob_bases,
            bob_bits,
            eve_bases,
            eve_bits,
            noise_mask,
            basis_match: sifted.basis_match,
            alice_key: sifted.alice_key,
            bob_key: sifted.bob_key,
            mismatches: sifted.mismatches,
            error_rate,
        }
    }

    pub fn n_bits(&self) -> usize {
        self.n_bits
    }

    pub fn channel_error_rate(&self) -> f64 {
        self.channel_error_rate
    }

    pub fn eavesdropper_present(&self) -> bool {
        self.eavesdropper_present
    }

    pub fn noise_model(&self) -> NoiseModel {
        self.noise_model
    }

    pub fn alice_bits(&self) -> &[bool] {
        &self.alice_bits
    }

    pub fn alice_bases(&self) -> &[Basis] {
        &self.alice_bases
    }

    pub fn bob_bases(&self) -> &[Basis] {
        &self.bob_bases
    }

    pub fn bob_bits(&self) -> &[bool] {
        &self.bob_bits
    }

    /// Eve's bases, one per round, when she was present.
    pub fn eve_bases(&self) -> Option<&[Basis]> {
        self.eve_bases.as_deref()
    }

    pub fn eve_bits(&self) -> Option<&[bool]> {
        self.eve_bits.as_deref()
    }

    /// Rounds in which the channel flipped the qubit.
    pub fn noise_mask(&self) -> &[bool] {
        &self.noise_mask
    }

    pub fn basis_match(&self) -> &[bool] {
        &self.basis_match
    }

    pub fn alice_key(&self) -> &[bool] {
        &self.alice_key
    }

    pub fn bob_key(&self) -> &[bool] {
        &self.bob_key
    }

    /// Sifted positions where Alice's and Bob's bits differ.
    pub fn mismatches(&self) -> usize {
        self.mismatches
    }

    pub fn error_rate(&self) -> f64 {
        self.error_rate
    }

    pub fn sifted_length(&self) -> usize {
        self.alice_key.len()
    }

    /// Share of transmitted qubits that survived sifting.
    pub fn key_utilization(&self) -> f64 {
        self.sifted_length() as f64 / self.n_bits as f64
    }

    pub fn round(&self, index: usize) -> Option<Round> {
        if index >= self.n_bits {
            return None;
        }
        Some(Round {
            index,
            alice_bit: self.alice_bits[index],
            alice_basis: self.alice_bases[index],
            bob_basis: self.bob_bases[index],
            eve_basis: self.eve_bases.as_ref().map(|b| b[index]),
            eve_bit: self.eve_bits.as_ref().map(|b| b[index]),
            noise_applied: self.noise_mask[index],
            bob_bit: self.bob_bits[index],
        })
    }

    pub fn rounds(&self) -> impl Iterator<Item = Round> + '_ {
        (0..self.n_bits).filter_map(|i| self.round(i))
    }
}

/// Runs a single round. The draw order is fixed: Alice's bit, Alice's basis, Bob's basis,
/// Eve's basis and measurement, the noise coin, Bob's measurement.
fn simulate_round<B: QubitBackend, R: Rng>(
    index: usize,
    params: &Bb84Params,
    backend: &B,
    rng: &mut R,
) -> Result<Round, ProtocolError> {
    let alice_bit = rng.random_bool(0.5);
    let alice_basis = Basis::random(rng);
    let bob_basis = Basis::random(rng);

    let mut qubit = backend.prepare(alice_bit, alice_basis)?;

    let (eve_basis, eve_bit) = if params.eavesdropper_present {
        let basis = Basis::random(rng);
        let bit = backend.measure(&mut qubit, basis, rng)?;
        backend.reprepare(&mut qubit, bit, basis)?;
        (Some(basis), Some(bit))
    } else {
        (None, None)
    };

    let noise_applied = rng.random_bool(params.channel_error_rate);
    if noise_applied {
        match params.noise_model {
            NoiseModel::EncodedBitFlip => backend.reprepare(&mut qubit, !alice_bit, alice_basis)?,
            NoiseModel::PauliX => backend.flip(&mut qubit)?,
        }
    }

    let bob_bit = backend.measure(&mut qubit, bob_basis, rng)?;

    let round = Round {
        index,
        alice_bit,
        alice_basis,
        bob_basis,
        eve_basis,
        eve_bit,
        noise_applied,
        bob_bit,
    };
    trace!(?round, "round complete");

    Ok(round)
}

fn finish(params: &Bb84Params, rounds: impl IntoIterator<Item = Round>) -> ProtocolResult {
    let result = ProtocolResult::from_rounds(params, rounds);

    if result.sifted_length() == 0 {
        warn!(n_bits = params.n_bits, "no basis agreement, sifted key is empty");
    }
    debug!(
        sifted_length = result.sifted_length(),
        mismatches = result.mismatches(),
        error_rate = result.error_rate(),
        "BB84 run complete"
    );

    result
}

/// Runs BB84 on the density-matrix backend.
///
/// # Arguments
///
/// * `n_bits` - Number of qubits to transmit. Must be positive.
/// * `channel_error_rate` - Per-round bit-flip probability, in `[0, 1]`.
/// * `eavesdropper_present` - Whether Eve performs a measure-and-resend attack on every qubit.
/// * `rng` - Source of all randomness in the run.
pub fn run<R: Rng>(
    n_bits: usize,
    channel_error_rate: f64,
    eavesdropper_present: bool,
    rng: &mut R,
) -> Result<ProtocolResult, ProtocolError> {
    let params = Bb84Params::new(n_bits, channel_error_rate, eavesdropper_present)?;
    run_with_backend(&params, &DensityMatrixBackend::new(), rng)
}

/// Runs BB84 sequentially on any backend.
pub fn run_with_backend<B: QubitBackend, R: Rng>(
    params: &Bb84Params,
    backend: &B,
    rng: &mut R,
) -> Result<ProtocolResult, ProtocolError> {
    debug!(
        n_bits = params.n_bits,
        channel_error_rate = params.channel_error_rate,
        eavesdropper = params.eavesdropper_present,
        noise_model = %params.noise_model,
        "starting BB84 run"
    );

    let rounds = (0..params.n_bits)
        .map(|i| simulate_round(i, params, backend, rng))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(finish(params, rounds))
}

/// Runs BB84 with rounds spread over the rayon thread pool.
///
/// Rounds are split into chunks of [`PARALLEL_CHUNK`]; chunk `k` draws from
/// `ChaCha8Rng::seed_from_u64(seed)` on stream `k`. The result depends only on `seed`.
pub fn run_parallel<B>(
    params: &Bb84Params,
    backend: &B,
    seed: u64,
) -> Result<ProtocolResult, ProtocolError>
where
    B: QubitBackend + Sync,
{
    let chunk_count = params.n_bits.div_ceil(PARALLEL_CHUNK);
    debug!(
        n_bits = params.n_bits,
        chunk_count,
        eavesdropper = params.eavesdropper_present,
        "starting parallel BB84 run"
    );

    let chunks = (0..chunk_count)
        .into_par_iter()
        .map(|chunk| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            rng.set_stream(chunk as u64);

            let start = chunk * PARALLEL_CHUNK;
            let end = (start + PARALLEL_CHUNK).min(params.n_bits);
            (start..end)
                .map(|i| simulate_round(i, params, backend, &mut rng))
                .collect::<Result<Vec<_>, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(finish(params, chunks.into_iter().flatten()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ProbabilisticBackend;

    fn seeded(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn rejects_zero_bits() {
        let err = run(0, 0.0, false, &mut seeded(1)).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InvalidParameter { name: "n_bits", .. }
        ));
    }

    #[test]
    fn rejects_out_of_range_error_rates() {
        for rate in [-0.1, 1.5, f64::NAN] {
            let err = Bb84Params::new(10, rate, false).unwrap_err();
            assert!(matches!(
                err,
                ProtocolError::InvalidParameter {
                    name: "channel_error_rate",
                    ..
                }
            ));
        }
    }

    #[test]
    fn single_bit_run_succeeds() {
        let result = run(1, 0.0, true, &mut seeded(2)).unwrap();
        assert_eq!(result.alice_bits().len(), 1);
        assert_eq!(result.bob_bits().len(), 1);
        assert!(result.sifted_length() <= 1);
    }

    #[test]
    fn sift_keeps_matching_positions_in_order() {
        use Basis::{Computational as C, Hadamard as H};
        let sifted = sift(
            &[true, false, true, true],
            &[true, true, false, true],
            &[C, H, C, H],
            &[C, C, C, H],
        );
        assert_eq!(sifted.basis_match, vec![true, false, true, true]);
        assert_eq!(sifted.alice_key, vec![true, true, true]);
        assert_eq!(sifted.bob_key, vec![true, false, true]);
        assert_eq!(sifted.mismatches, 1);
        assert!((sifted.error_rate() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn empty_sift_has_zero_error_rate() {
        let sifted = sift(
            &[true],
            &[false],
            &[Basis::Computational],
            &[Basis::Hadamard],
        );
        assert!(sifted.alice_key.is_empty());
        assert_eq!(sifted.error_rate(), 0.0);
    }

    #[test]
    fn noiseless_run_without_eve_has_identical_keys() {
        let result = run(500, 0.0, false, &mut seeded(3)).unwrap();
        assert_eq!(result.alice_key(), result.bob_key());
        assert_eq!(result.error_rate(), 0.0);
        assert!(result.eve_bases().is_none());
        assert!(result.noise_mask().iter().all(|&n| !n));
    }

    #[test]
    fn full_flip_rate_inverts_every_sifted_bit() {
        let result = run(500, 1.0, false, &mut seeded(4)).unwrap();
        assert!(result.noise_mask().iter().all(|&n| n));
        assert!(result.sifted_length() > 0);
        assert_eq!(result.error_rate(), 1.0);
    }

    #[test]
    fn full_flip_rate_with_eve_still_errs_every_sifted_bit() {
        for seed in [40, 41] {
            let params = Bb84Params::new(500, 1.0, true).unwrap();
            for result in [
                run_with_backend(&params, &DensityMatrixBackend::new(), &mut seeded(seed)).unwrap(),
                run_with_backend(&params, &ProbabilisticBackend::new(), &mut seeded(seed)).unwrap(),
            ] {
                assert!(result.sifted_length() > 0);
                assert_eq!(result.error_rate(), 1.0);
            }
        }
    }

    #[test]
    fn pauli_x_noise_spares_hadamard_rounds() {
        let params = Bb84Params::new(2_000, 1.0, false)
            .unwrap()
            .with_noise_model(NoiseModel::PauliX);
        let result = run_with_backend(&params, &DensityMatrixBackend::new(), &mut seeded(5)).unwrap();
        for round in result.rounds().filter(Round::bases_match) {
            match round.alice_basis {
                Basis::Computational => assert_ne!(round.alice_bit, round.bob_bit),
                Basis::Hadamard => assert_eq!(round.alice_bit, round.bob_bit),
            }
        }
    }

    #[test]
    fn eve_records_one_basis_per_round() {
        let result = run(64, 0.0, true, &mut seeded(6)).unwrap();
        assert_eq!(result.eve_bases().map(<[Basis]>::len), Some(64));
        assert_eq!(result.eve_bits().map(<[bool]>::len), Some(64));
        let round = result.round(10).unwrap();
        assert!(round.eve_basis.is_some());
        assert!(result.round(64).is_none());
    }

    #[test]
    fn eve_matching_alice_basis_is_invisible_without_noise() {
        let result = run(1_000, 0.0, true, &mut seeded(7)).unwrap();
        for round in result.rounds() {
            if round.eve_basis == Some(round.alice_basis) {
                assert_eq!(round.eve_bit, Some(round.alice_bit));
                if round.bases_match() {
                    assert_eq!(round.alice_bit, round.bob_bit);
                }
            }
        }
    }

    #[test]
    fn parallel_run_is_deterministic_and_complete() {
        let params = Bb84Params::new(1_000, 0.1, true).unwrap();
        let backend = ProbabilisticBackend::new();
        let a = run_parallel(&params, &backend, 99).unwrap();
        let b = run_parallel(&params, &backend, 99).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.alice_bits().len(), 1_000);
        assert_eq!(
            a.rounds().map(|r| r.index).collect::<Vec<_>>(),
            (0..1_000).collect::<Vec<_>>()
        );
    }

    #[test]
    fn key_utilization_is_sifted_over_transmitted() {
        let result = run(200, 0.0, false, &mut seeded(8)).unwrap();
        let expected = result.sifted_length() as f64 / 200.0;
        assert_eq!(result.key_utilization(), expected);
    }
}
