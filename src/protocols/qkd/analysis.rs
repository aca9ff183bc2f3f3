//! Post-run analysis of BB84 results: theoretical error rates, security grading,
//! with/without-eavesdropper comparison, and multi-trial summaries.

use super::bb84::{self, Bb84Params, ProtocolResult};
use crate::{backend::QubitBackend, errors::ProtocolError};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::fmt;

/// Error rate above which an eavesdropper is suspected.
pub const DETECTION_THRESHOLD: f64 = 0.15;

/// Error rate below which a key is graded [`SecurityLevel::High`].
const HIGH_SECURITY_BELOW: f64 = 0.10;
/// Error rate below which a key is graded [`SecurityLevel::Medium`].
const MEDIUM_SECURITY_BELOW: f64 = 0.20;

/// Error a measure-and-resend attack introduces on the sifted key.
const EVE_INDUCED_ERROR: f64 = 0.25;

/// Theoretical sifted-key error rate.
///
/// With an eavesdropper the two error sources are combined as independent events,
/// $0.25 + p - 0.25\,p$.
pub fn expected_error_rate(channel_error_rate: f64, eavesdropper_present: bool) -> f64 {
    if eavesdropper_present {
        EVE_INDUCED_ERROR + channel_error_rate - EVE_INDUCED_ERROR * channel_error_rate
    } else {
        channel_error_rate
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SecurityLevel {
    High,
    Medium,
    Low,
}

impl SecurityLevel {
    pub fn from_error_rate(error_rate: f64) -> Self {
        if error_rate < HIGH_SECURITY_BELOW {
            SecurityLevel::High
        } else if error_rate < MEDIUM_SECURITY_BELOW {
            SecurityLevel::Medium
        } else {
            SecurityLevel::Low
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            SecurityLevel::High => "low error rate indicates a secure transmission",
            SecurityLevel::Medium => "moderate error rate, possible noise or minor interference",
            SecurityLevel::Low => "high error rate indicates possible eavesdropping",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecurityLevel::High => write!(f, "high"),
            SecurityLevel::Medium => write!(f, "medium"),
            SecurityLevel::Low => write!(f, "low"),
        }
    }
}

/// Key statistics of one run, as shown to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyReport {
    pub n_bits: usize,
    pub sifted_length: usize,
    pub error_rate: f64,
    pub key_utilization: f64,
    pub bit_agreement: f64,
    pub expected_error_rate: f64,
    pub eavesdropper_present: bool,
    pub eavesdropping_suspected: bool,
    pub security_level: SecurityLevel,
}

impl KeyReport {
    pub fn from_result(result: &ProtocolResult) -> Self {
        let error_rate = result.error_rate();
        Self {
            n_bits: result.n_bits(),
            sifted_length: result.sifted_length(),
            error_rate,
            key_utilization: result.key_utilization(),
            bit_agreement: 1.0 - error_rate,
            expected_error_rate: expected_error_rate(
                result.channel_error_rate(),
                result.eavesdropper_present(),
            ),
            eavesdropper_present: result.eavesdropper_present(),
            eavesdropping_suspected: error_rate > DETECTION_THRESHOLD,
            security_level: SecurityLevel::from_error_rate(error_rate),
        }
    }
}

impl fmt::Display for KeyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "transmitted bits:    {}", self.n_bits)?;
        writeln!(f, "sifted key length:   {}", self.sifted_length)?;
        writeln!(f, "error rate:          {:.4}", self.error_rate)?;
        writeln!(f, "expected error rate: {:.4}", self.expected_error_rate)?;
        writeln!(f, "key utilization:     {:.1}%", self.key_utilization * 100.0)?;
        writeln!(f, "bit agreement:       {:.1}%", self.bit_agreement * 100.0)?;
        writeln!(
            f,
            "security level:      {} ({})",
            self.security_level,
            self.security_level.description()
        )?;
        write!(
            f,
            "eavesdropper:        {}, suspected: {}",
            if self.eavesdropper_present { "present" } else { "absent" },
            self.eavesdropping_suspected
        )
    }
}

/// The same parameters run once without and once with Eve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub without_eve: KeyReport,
    pub with_eve: KeyReport,
}

impl Comparison {
    pub fn run<B: QubitBackend, R: Rng>(
        n_bits: usize,
        channel_error_rate: f64,
        backend: &B,
        rng: &mut R,
    ) -> Result<Self, ProtocolError> {
        Self::run_with_params(&Bb84Params::new(n_bits, channel_error_rate, false)?, backend, rng)
    }

    /// Runs `params` twice, forcing the eavesdropper off and then on.
    pub fn run_with_params<B: QubitBackend, R: Rng>(
        params: &Bb84Params,
        backend: &B,
        rng: &mut R,
    ) -> Result<Self, ProtocolError> {
        Self::from_runner(params, |p| bb84::run_with_backend(p, backend, &mut *rng))
    }

    /// Like [`Comparison::run_with_params`], with both runs spread over the rayon pool.
    ///
    /// Each run gets its own seed drawn from `seed`, so the comparison depends only on `seed`.
    pub fn run_parallel<B: QubitBackend + Sync>(
        params: &Bb84Params,
        backend: &B,
        seed: u64,
    ) -> Result<Self, ProtocolError> {
        let mut seeds = ChaCha8Rng::seed_from_u64(seed);
        Self::from_runner(params, |p| bb84::run_parallel(p, backend, seeds.random()))
    }

    fn from_runner<F>(params: &Bb84Params, mut run: F) -> Result<Self, ProtocolError>
    where
        F: FnMut(&Bb84Params) -> Result<ProtocolResult, ProtocolError>,
    {
        let quiet = Bb84Params::new(params.n_bits(), params.channel_error_rate(), false)?
            .with_noise_model(params.noise_model());
        let tapped = Bb84Params::new(params.n_bits(), params.channel_error_rate(), true)?
            .with_noise_model(params.noise_model());

        let without_eve = run(&quiet)?;
        let with_eve = run(&tapped)?;

        Ok(Self {
            without_eve: KeyReport::from_result(&without_eve),
            with_eve: KeyReport::from_result(&with_eve),
        })
    }

    /// Error-rate increase attributable to the eavesdropper.
    pub fn error_rate_gap(&self) -> f64 {
        self.with_eve.error_rate - self.without_eve.error_rate
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "-- without eavesdropper --")?;
        writeln!(f, "{}", self.without_eve)?;
        writeln!(f, "-- with eavesdropper --")?;
        writeln!(f, "{}", self.with_eve)?;
        write!(f, "error rate gap:      {:.4}", self.error_rate_gap())
    }
}

/// Aggregate statistics over repeated runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialSummary {
    pub runs: usize,
    pub mean_error_rate: f64,
    pub min_error_rate: f64,
    pub max_error_rate: f64,
    pub mean_sifted_length: f64,
    pub mean_key_utilization: f64,
}

impl TrialSummary {
    /// Returns `None` for an empty slice.
    pub fn from_results(results: &[ProtocolResult]) -> Option<Self> {
        if results.is_empty() {
            return None;
        }
        let runs = results.len() as f64;

        let mean_error_rate = results.iter().map(ProtocolResult::error_rate).sum::<f64>() / runs;
        let min_error_rate = results
            .iter()
            .map(ProtocolResult::error_rate)
            .fold(f64::INFINITY, f64::min);
        let max_error_rate = results
            .iter()
            .map(ProtocolResult::error_rate)
            .fold(f64::NEG_INFINITY, f64::max);
        let mean_sifted_length =
            results.iter().map(|r| r.sifted_length() as f64).sum::<f64>() / runs;
        let mean_key_utilization =
            results.iter().map(ProtocolResult::key_utilization).sum::<f64>() / runs;

        Some(Self {
            runs: results.len(),
            mean_error_rate,
            min_error_rate,
            max_error_rate,
            mean_sifted_length,
            mean_key_utilization,
        })
    }
}

impl fmt::Display for TrialSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "runs:                {}", self.runs)?;
        writeln!(
            f,
            "error rate:          {:.4} (min {:.4}, max {:.4})",
            self.mean_error_rate, self.min_error_rate, self.max_error_rate
        )?;
        writeln!(f, "mean sifted length:  {:.1}", self.mean_sifted_length)?;
        write!(
            f,
            "key utilization:     {:.1}%",
            self.mean_key_utilization * 100.0
        )
    }
}
