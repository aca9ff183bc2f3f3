//! Property-based tests for the BB84 round simulator
//!
//! These hold for every valid parameter set and every seed: sequence lengths,
//! sifted key consistency, error-rate bounds and seeded determinism.

use bb84_sim::{
    Bb84Params, DensityMatrixBackend, NoiseModel, ProbabilisticBackend, errors::ProtocolError,
    protocols::bb84,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn noise_model() -> impl Strategy<Value = NoiseModel> {
    prop_oneof![Just(NoiseModel::EncodedBitFlip), Just(NoiseModel::PauliX)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_result_shape_invariants(
        n_bits in 1usize..400,
        rate in 0.0f64..=1.0,
        eve in any::<bool>(),
        noise in noise_model(),
        seed in any::<u64>(),
    ) {
        let params = Bb84Params::new(n_bits, rate, eve).unwrap().with_noise_model(noise);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let result = bb84::run_with_backend(&params, &DensityMatrixBackend::new(), &mut rng).unwrap();

        prop_assert_eq!(result.n_bits(), n_bits);
        prop_assert_eq!(result.alice_bits().len(), n_bits);
        prop_assert_eq!(result.bob_bits().len(), n_bits);
        prop_assert_eq!(result.basis_match().len(), n_bits);

        let matches = result.basis_match().iter().filter(|&&m| m).count();
        prop_assert_eq!(result.sifted_length(), matches);
        prop_assert_eq!(result.alice_key().len(), result.bob_key().len());
        prop_assert_eq!(result.alice_key().len(), matches);

        prop_assert!((0.0..=1.0).contains(&result.error_rate()));
        if result.sifted_length() == 0 {
            prop_assert_eq!(result.error_rate(), 0.0);
        }

        let differing = result
            .alice_key()
            .iter()
            .zip(result.bob_key())
            .filter(|(a, b)| a != b)
            .count();
        prop_assert_eq!(differing, result.mismatches());
        prop_assert_eq!(result.eve_bases().is_some(), eve);
    }

    #[test]
    fn prop_sifted_keys_follow_round_order(
        n_bits in 1usize..200,
        seed in any::<u64>(),
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let result = bb84::run(n_bits, 0.1, true, &mut rng).unwrap();

        let (alice, bob): (Vec<bool>, Vec<bool>) = result
            .rounds()
            .filter(|r| r.bases_match())
            .map(|r| (r.alice_bit, r.bob_bit))
            .unzip();
        prop_assert_eq!(alice.as_slice(), result.alice_key());
        prop_assert_eq!(bob.as_slice(), result.bob_key());
    }

    #[test]
    fn prop_seeded_runs_are_deterministic(
        n_bits in 1usize..300,
        rate in 0.0f64..=1.0,
        eve in any::<bool>(),
        seed in any::<u64>(),
    ) {
        let a = bb84::run(n_bits, rate, eve, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
        let b = bb84::run(n_bits, rate, eve, &mut ChaCha8Rng::seed_from_u64(seed)).unwrap();
        prop_assert_eq!(a, b);

        let params = Bb84Params::new(n_bits, rate, eve).unwrap();
        let backend = ProbabilisticBackend::new();
        let c = bb84::run_parallel(&params, &backend, seed).unwrap();
        let d = bb84::run_parallel(&params, &backend, seed).unwrap();
        prop_assert_eq!(c, d);
    }

    #[test]
    fn prop_invalid_rates_are_rejected(
        rate in prop_oneof![-10.0f64..-1e-9, 1.0f64 + 1e-9..10.0],
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let rejected = matches!(
            bb84::run(10, rate, false, &mut rng),
            Err(ProtocolError::InvalidParameter { name: "channel_error_rate", .. })
        );
        prop_assert!(rejected);
    }
}

#[test]
fn boundary_inputs_are_handled() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    assert!(bb84::run(1, 0.0, false, &mut rng).is_ok());
    assert!(bb84::run(1, 1.0, true, &mut rng).is_ok());

    for (n_bits, rate) in [(0, 0.1), (10, -0.1), (10, 1.5)] {
        assert!(matches!(
            bb84::run(n_bits, rate, false, &mut rng),
            Err(ProtocolError::InvalidParameter { .. })
        ));
    }
}
