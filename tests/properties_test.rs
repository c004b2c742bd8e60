/*!
 * Property Tests
 * Outcome sets and index correspondence hold for any batch size and any
 * completion order
 */

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;
use std::time::Duration;
use vtask::{ExecutorConfig, TaskExecutor};

fn executor() -> TaskExecutor {
    TaskExecutor::new(ExecutorConfig::default().with_worker_threads(2)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_spawned_values_form_expected_set(n in 0usize..300, seed in any::<u64>()) {
        let executor = executor();
        let mut rng = StdRng::seed_from_u64(seed);

        let handles: Vec<_> = (0..n)
            .map(|i| {
                let delay = rng.gen_range(0..500u64);
                executor
                    .spawn(async move {
                        tokio::time::sleep(Duration::from_micros(delay)).await;
                        i * 7 + 1
                    })
                    .unwrap()
            })
            .collect();

        let observed: BTreeSet<usize> = handles
            .iter()
            .map(|h| h.wait_blocking().unwrap())
            .collect();
        let expected: BTreeSet<usize> = (0..n).map(|i| i * 7 + 1).collect();
        prop_assert_eq!(observed, expected);
    }

    #[test]
    fn prop_submit_many_index_correspondence(delays in prop::collection::vec(0u64..800, 0..200)) {
        let executor = executor();
        let expected: Vec<u64> = delays.iter().enumerate().map(|(i, d)| i as u64 * 1_000 + d).collect();

        let handles = executor
            .submit_many(delays.iter().copied().enumerate().map(|(i, delay)| async move {
                tokio::time::sleep(Duration::from_micros(delay)).await;
                i as u64 * 1_000 + delay
            }))
            .unwrap();

        prop_assert_eq!(handles.len(), expected.len());
        for (handle, want) in handles.iter().zip(&expected) {
            prop_assert_eq!(handle.wait_blocking().unwrap(), *want);
        }
    }
}
