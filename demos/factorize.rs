//! End-to-end demo: factor a small sequential matrix on a 2x2 grid and
//! report the reconstruction error.

use faer::Mat;
use faun::{DenseOps, FaunConfig, approximate, factorize};

fn main() -> Result<(), faun::FaunError> {
    let (m, n, k) = (16, 8, 2);
    let data: Vec<f64> = (0..m * n).map(|v| v as f64).collect();
    let a = Mat::from_row_major(m, n, &data);

    let cfg = FaunConfig::new(m, n, k, 2, 2).with_max_iter(50).with_seed(7);
    let factors = factorize(&a, &cfg)?;
    let approx = approximate(&factors);

    let mut gap = 0.0;
    for i in 0..m {
        for j in 0..n {
            let d = a[(i, j)] - approx[(i, j)];
            gap += d * d;
        }
    }
    println!(
        "W: {}x{}, H: {}x{}",
        factors.w.nrows(),
        factors.w.ncols(),
        factors.h.nrows(),
        factors.h.ncols()
    );
    println!("||A - round(W*H)||_F = {:.3}", gap.sqrt());
    Ok(())
}
