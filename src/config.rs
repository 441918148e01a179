//! Run parameters for a factorization.
//!
//! All dimensional constraints are checked by [`FaunConfig::validate`] before
//! any node task is launched; a violation is a configuration error reported
//! with the offending dimensions, never a mid-run failure.

use crate::comm::transport::DEFAULT_WINDOW;
use crate::error::FaunError;

/// Problem, grid and flow-control parameters.
#[derive(Debug, Clone)]
pub struct FaunConfig {
    /// Global row count of A (and of W).
    pub m: usize,
    /// Global column count of A (and of H).
    pub n: usize,
    /// Factorization rank.
    pub k: usize,
    /// Process-grid rows (p_r).
    pub rows: usize,
    /// Process-grid columns (p_c).
    pub cols: usize,
    /// Fixed iteration count; there is no convergence check or early exit.
    pub max_iter: usize,
    /// Base RNG seed; node id is added to it for per-node generators.
    pub seed: u64,
    /// Flow-control credits per directed node pair.
    pub window: usize,
}

impl FaunConfig {
    pub fn new(m: usize, n: usize, k: usize, rows: usize, cols: usize) -> Self {
        Self {
            m,
            n,
            k,
            rows,
            cols,
            max_iter: 100,
            seed: 0,
            window: DEFAULT_WINDOW,
        }
    }

    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Total node count p = p_r * p_c.
    pub fn nodes(&self) -> usize {
        self.rows * self.cols
    }

    /// Row extent of one A-block: m / p_r.
    pub fn row_block(&self) -> usize {
        self.m / self.rows
    }

    /// Column extent of one A-block: n / p_c.
    pub fn col_block(&self) -> usize {
        self.n / self.cols
    }

    /// Row extent of one local W-block: m / p.
    pub fn w_block(&self) -> usize {
        self.m / self.nodes()
    }

    /// Column extent of one local H-block: n / p.
    pub fn h_block(&self) -> usize {
        self.n / self.nodes()
    }

    /// Fail-fast consistency check, run before any task exists.
    pub fn validate(&self) -> Result<(), FaunError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(FaunError::InvalidGrid {
                rows: self.rows,
                cols: self.cols,
            });
        }
        for (name, value) in [
            ("m", self.m),
            ("n", self.n),
            ("k", self.k),
            ("max_iter", self.max_iter),
            ("window", self.window),
        ] {
            if value == 0 {
                return Err(FaunError::NotPositive { name, value });
            }
        }
        let p = self.nodes();
        for (name, value, divisor) in [
            ("m", self.m, self.rows),
            ("n", self.n, self.cols),
            ("m", self.m, p),
            ("n", self.n, p),
        ] {
            if value % divisor != 0 {
                return Err(FaunError::NotDivisible {
                    name,
                    value,
                    divisor,
                });
            }
        }
        Ok(())
    }
}
