//! End-to-end factorization scenarios: single-node reference check, global
//! shape guarantees, and distributed-vs-serial equivalence on a 2x2 grid.

use approx::assert_relative_eq;
use faer::Mat;
use faun::engine::{normal_block, update_h, update_w};
use faun::{DenseOps, FaunConfig, FaunError, approximate, factorize};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn sequential(m: usize, n: usize, from: f64) -> Mat<f64> {
    let data: Vec<f64> = (0..m * n).map(|v| v as f64 + from).collect();
    Mat::from_row_major(m, n, &data)
}

#[test]
fn rejects_mismatched_input_shape() {
    let a = sequential(4, 4, 0.0);
    let cfg = FaunConfig::new(8, 8, 2, 2, 2);
    assert!(matches!(
        factorize(&a, &cfg),
        Err(FaunError::ShapeMismatch { .. })
    ));
}

#[test]
fn rejects_invalid_grid_before_launch() {
    let a = sequential(6, 6, 0.0);
    // 6 not divisible by p = 4
    let cfg = FaunConfig::new(6, 6, 2, 2, 2);
    assert!(matches!(
        factorize(&a, &cfg),
        Err(FaunError::NotDivisible { .. })
    ));
}

#[test]
fn single_node_iteration_matches_hand_reference() {
    let (m, n, k) = (4, 4, 2);
    let a = sequential(m, n, 0.0);
    let cfg = FaunConfig::new(m, n, k, 1, 1).with_max_iter(1).with_seed(42);
    let factors = factorize(&a, &cfg).unwrap();
    assert_eq!(factors.w.shape(), (m, k));
    assert_eq!(factors.h.shape(), (k, n));

    // replay the node's draws: H first, then W, with seed = cfg.seed + id
    let mut rng = StdRng::seed_from_u64(42);
    let h0 = normal_block(k, n, &mut rng);
    let w0 = normal_block(m, k, &mut rng);

    // one multiplicative update, written with bare loops
    let mut h_gram = vec![vec![0.0; k]; k];
    for r in 0..k {
        for c in 0..k {
            for t in 0..n {
                h_gram[r][c] += h0[(r, t)] * h0[(c, t)];
            }
        }
    }
    let mut w1 = vec![vec![0.0; k]; m];
    for i in 0..m {
        for j in 0..k {
            let mut denom = 0.0;
            for l in 0..k {
                denom += w0[(i, l)] * h_gram[l][j];
            }
            let mut numer = 0.0;
            for t in 0..n {
                numer += a[(i, t)] * h0[(j, t)];
            }
            w1[i][j] = w0[(i, j)] * (numer / denom);
        }
    }
    for i in 0..m {
        for j in 0..k {
            assert_relative_eq!(
                factors.w[(i, j)],
                w1[i][j],
                max_relative = 1e-10,
                epsilon = 1e-10
            );
        }
    }

    // the H half sees the already-updated W
    let mut w_gram = vec![vec![0.0; k]; k];
    for r in 0..k {
        for c in 0..k {
            for i in 0..m {
                w_gram[r][c] += w1[i][r] * w1[i][c];
            }
        }
    }
    let mut h1 = vec![vec![0.0; n]; k];
    for r in 0..k {
        for c in 0..n {
            let mut denom = 0.0;
            for l in 0..k {
                denom += w_gram[r][l] * h0[(l, c)];
            }
            let mut numer = 0.0;
            for i in 0..m {
                numer += w1[i][r] * a[(i, c)];
            }
            h1[r][c] = h0[(r, c)] * (numer / denom);
        }
    }
    for r in 0..k {
        for c in 0..n {
            assert_relative_eq!(
                factors.h[(r, c)],
                h1[r][c],
                max_relative = 1e-10,
                epsilon = 1e-10
            );
        }
    }
}

#[test]
fn reassembled_factors_have_exact_global_shapes() {
    let a = sequential(8, 8, 1.0);
    let cfg = FaunConfig::new(8, 8, 2, 2, 2).with_max_iter(4).with_seed(1);
    let factors = factorize(&a, &cfg).unwrap();
    assert_eq!(factors.w.shape(), (8, 2));
    assert_eq!(factors.h.shape(), (2, 8));
    assert_eq!(approximate(&factors).shape(), (8, 8));
}

#[test]
fn distributed_run_matches_serial_reference() {
    let (m, n, k) = (8, 8, 2);
    let a = sequential(m, n, 1.0);
    let cfg = FaunConfig::new(m, n, k, 2, 2).with_max_iter(2).with_seed(9);
    let factors = factorize(&a, &cfg).unwrap();

    // assemble the same initial blocks the four nodes drew
    let (wb, hb, cb) = (m / 4, n / 4, n / 2); // m/p, n/p, n/p_c
    let mut w_blocks = Vec::new();
    let mut h_blocks = Vec::new();
    for id in 0..4u64 {
        let mut rng = StdRng::seed_from_u64(9 + id);
        h_blocks.push(normal_block(k, hb, &mut rng));
        w_blocks.push(normal_block(wb, k, &mut rng));
    }
    // global W0: node id's rows at id*(m/p);
    // global H0: node (i, j)'s columns at j*(n/p_c) + i*(n/p)
    let mut w = Mat::from_fn(m, k, |r, c| w_blocks[r / wb][(r % wb, c)]);
    let mut h = Mat::from_fn(k, n, |r, c| {
        let (j, within) = (c / cb, c % cb);
        let node = within / hb * 2 + j;
        h_blocks[node][(r, within % hb)]
    });

    // the same global multiplicative updates, computed serially
    for _ in 0..cfg.max_iter {
        let h_gram = h.matmul(&h.transposed());
        w = update_w(&w, &h_gram, &a.matmul(&h.transposed()));
        let w_gram = w.transposed().matmul(&w);
        h = update_h(&h, &w_gram, &w.transposed().matmul(&a));
    }

    // sums inside the collectives associate differently than the serial
    // matmuls, so compare with a tolerance; non-finite entries (permitted by
    // the numeric policy) must at least agree on finiteness
    for i in 0..m {
        for j in 0..k {
            let (got, want) = (factors.w[(i, j)], w[(i, j)]);
            assert_eq!(got.is_finite(), want.is_finite());
            if want.is_finite() {
                assert_relative_eq!(got, want, max_relative = 1e-6, epsilon = 1e-6);
            }
        }
    }
    for r in 0..k {
        for c in 0..n {
            let (got, want) = (factors.h[(r, c)], h[(r, c)]);
            assert_eq!(got.is_finite(), want.is_finite());
            if want.is_finite() {
                assert_relative_eq!(got, want, max_relative = 1e-6, epsilon = 1e-6);
            }
        }
    }
}
