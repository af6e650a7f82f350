/*
 * SPDX-FileCopyrightText: 2023 Inria
 * SPDX-FileCopyrightText: 2023 Sebastiano Vigna
 *
 * SPDX-License-Identifier: Apache-2.0 OR LGPL-2.1-or-later
 */

use ptbucket::prelude::*;
use rand::{rngs::SmallRng, Rng, SeedableRng};

const NUM_BUCKETS: [u64; 12] = [
    1,
    2,
    3,
    4,
    5,
    6,
    10,
    1000,
    1 << 20,
    (1 << 32) + 7,
    u64::MAX / 2,
    u64::MAX,
];

fn random_hashes(n: usize, seed: u64) -> Vec<u64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let mut hashes = (0..n).map(|_| rng.random::<u64>()).collect::<Vec<_>>();
    hashes.extend([0, 1, T1 - 1, T1, T2 - 1, T2, u64::MAX - 1, u64::MAX]);
    hashes
}

fn check_range<B: Bucketer>() {
    let hashes = random_hashes(10_000, 0);
    for n in NUM_BUCKETS {
        let bucketer = B::new(n);
        assert_eq!(bucketer.num_buckets(), n);
        for &hash in &hashes {
            assert!(bucketer.bucket(hash) < n, "{}: hash {}", bucketer, hash);
        }
    }
}

#[test]
fn test_range() {
    check_range::<UniformBucketer>();
    check_range::<SkewBucketer>();
}

#[test]
fn test_skew_tiers_sum() {
    for n in (1..100_000).chain(NUM_BUCKETS) {
        let bucketer = SkewBucketer::new(n);
        assert_eq!(
            bucketer.num_dense_buckets1()
                + bucketer.num_dense_buckets2()
                + bucketer.num_sparse_buckets(),
            n
        );
    }
}

fn check_determinism<B: Bucketer>() {
    let hashes = random_hashes(10_000, 1);
    for n in NUM_BUCKETS {
        let a = B::new(n);
        let b = B::new(n);
        let forward = hashes.iter().map(|&h| a.bucket(h)).collect::<Vec<_>>();
        let backward = hashes
            .iter()
            .rev()
            .map(|&h| b.bucket(h))
            .collect::<Vec<_>>();
        assert!(forward.iter().eq(backward.iter().rev()));
        // Repeated calls
        for (&hash, &bucket) in hashes.iter().zip(&forward) {
            assert_eq!(a.bucket(hash), bucket);
        }
    }
}

#[test]
fn test_determinism() {
    check_determinism::<UniformBucketer>();
    check_determinism::<SkewBucketer>();
}

fn check_init_and_swap<B: Bucketer + PartialEq + std::fmt::Debug>() {
    let mut a = B::default();
    a.init(1000);
    assert_eq!(a, B::new(1000));
    a.init(77);
    assert_eq!(a, B::new(77));

    let mut b = B::new(1000);
    a.swap(&mut b);
    assert_eq!(a.num_buckets(), 1000);
    assert_eq!(b.num_buckets(), 77);
    assert_eq!(a, B::new(1000));
    assert_eq!(b, B::new(77));
}

#[test]
fn test_init_and_swap() {
    check_init_and_swap::<UniformBucketer>();
    check_init_and_swap::<SkewBucketer>();
}

#[test]
fn test_concurrent_reads() {
    let bucketer = SkewBucketer::new(1_000_003);
    let hashes = random_hashes(100_000, 2);
    let expected = hashes
        .iter()
        .map(|&h| bucketer.bucket(h))
        .collect::<Vec<_>>();

    std::thread::scope(|s| {
        for chunk in 0..4 {
            let (bucketer, hashes, expected) = (&bucketer, &hashes, &expected);
            s.spawn(move || {
                for i in (chunk..hashes.len()).step_by(4) {
                    assert_eq!(bucketer.bucket(hashes[i]), expected[i]);
                }
            });
        }
    });
}

#[test]
fn test_display() {
    assert_eq!(
        UniformBucketer::new(10).to_string(),
        "Uniform bucketer with 10 buckets"
    );
    assert_eq!(
        SkewBucketer::new(1000).to_string(),
        "Skew bucketer with 1000 buckets (dense: 300 + 200, sparse: 500)"
    );
    assert_eq!(BucketerKind::Skew.to_string(), "skew");
    assert_eq!(BucketerKind::default(), BucketerKind::Skew);
}

#[test]
#[should_panic]
fn test_skew_no_buckets() {
    let _ = SkewBucketer::new(0);
}
