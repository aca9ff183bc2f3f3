//! Monte-Carlo checks of the expected error rates and sifting ratio.
//!
//! Every run is seeded, so the averages below are fixed numbers; the tolerances are several
//! standard deviations wide for the sample sizes used.

use bb84_sim::{
    Bb84Params, DensityMatrixBackend, NoiseModel, ProbabilisticBackend, ProtocolResult,
    QubitBackend,
    protocols::{
        analysis::{TrialSummary, expected_error_rate},
        bb84,
    },
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const RUNS: u64 = 10;
const BITS: usize = 1_000;

fn trials<B: QubitBackend>(params: &Bb84Params, backend: &B, base_seed: u64) -> TrialSummary {
    let results: Vec<ProtocolResult> = (0..RUNS)
        .map(|i| {
            let mut rng = ChaCha8Rng::seed_from_u64(base_seed + i);
            bb84::run_with_backend(params, backend, &mut rng).unwrap()
        })
        .collect();
    TrialSummary::from_results(&results).unwrap()
}

#[test]
fn clean_channel_without_eve_has_no_errors() {
    let params = Bb84Params::new(BITS, 0.0, false).unwrap();
    let summary = trials(&params, &DensityMatrixBackend::new(), 100);
    assert!(summary.mean_error_rate < 0.01, "{summary:?}");
    assert_eq!(summary.max_error_rate, 0.0);
}

#[test]
fn eavesdropper_introduces_quarter_error_rate() {
    let params = Bb84Params::new(BITS, 0.0, true).unwrap();
    for summary in [
        trials(&params, &DensityMatrixBackend::new(), 200),
        trials(&params, &ProbabilisticBackend::new(), 200),
    ] {
        assert!(
            (summary.mean_error_rate - 0.25).abs() < 0.03,
            "mean error rate {}",
            summary.mean_error_rate
        );
    }
}

#[test]
fn channel_noise_sets_error_rate_without_eve() {
    let params = Bb84Params::new(BITS, 0.1, false).unwrap();
    let summary = trials(&params, &DensityMatrixBackend::new(), 300);
    assert!(
        (summary.mean_error_rate - 0.1).abs() < 0.02,
        "mean error rate {}",
        summary.mean_error_rate
    );
}

#[test]
fn pauli_x_noise_only_disturbs_computational_rounds() {
    let params = Bb84Params::new(BITS, 0.2, false)
        .unwrap()
        .with_noise_model(NoiseModel::PauliX);
    let summary = trials(&params, &DensityMatrixBackend::new(), 400);
    assert!(
        (summary.mean_error_rate - 0.1).abs() < 0.02,
        "mean error rate {}",
        summary.mean_error_rate
    );
}

#[test]
fn eve_and_noise_errors_combine_as_independent_events() {
    for (rate, base_seed) in [(0.1, 500), (0.4, 550)] {
        let params = Bb84Params::new(BITS, rate, true).unwrap();
        let expected = expected_error_rate(rate, true);
        for summary in [
            trials(&params, &DensityMatrixBackend::new(), base_seed),
            trials(&params, &ProbabilisticBackend::new(), base_seed),
        ] {
            assert!(
                (summary.mean_error_rate - expected).abs() < 0.03,
                "rate={rate}: mean error rate {}, expected {expected}",
                summary.mean_error_rate
            );
        }
    }
}

#[test]
fn sifted_length_approaches_half_of_transmitted() {
    for (rate, eve) in [(0.0, false), (0.0, true), (0.3, false), (0.3, true)] {
        let params = Bb84Params::new(BITS, rate, eve).unwrap();
        let summary = trials(&params, &ProbabilisticBackend::new(), 600);
        let half = BITS as f64 / 2.0;
        assert!(
            (summary.mean_sifted_length - half).abs() < 25.0,
            "rate={rate} eve={eve}: mean sifted length {}",
            summary.mean_sifted_length
        );
        assert!((summary.mean_key_utilization - 0.5).abs() < 0.025);
    }
}

#[test]
fn parallel_run_matches_sequential_statistics() {
    let params = Bb84Params::new(8 * BITS, 0.0, true).unwrap();
    let result = bb84::run_parallel(&params, &DensityMatrixBackend::new(), 77).unwrap();
    assert_eq!(result.alice_bits().len(), 8 * BITS);
    assert!((result.error_rate() - 0.25).abs() < 0.03);
    assert!((result.key_utilization() - 0.5).abs() < 0.03);
}
