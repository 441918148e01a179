//! Per-node MPI-FAUN iteration engine.
//!
//! Each worker owns one A-block and drives the fixed collective sequence for
//! `max_iter` iterations: Gram all-reduce, factor all-gather, product
//! reduce-scatter, multiplicative update, mirrored for W and H. There is no
//! convergence check and no early exit, and zero denominators in the updates
//! propagate as NaN/Inf rather than being guarded.

use faer::Mat;
use rand::Rng;
use rand::rngs::StdRng;
use rand_distr::StandardNormal;

use crate::comm::transport::CreditedSender;
use crate::comm::{GridComm, Message, MessageKind};
use crate::error::FaunError;
use crate::grid::Communicator;
use crate::matrix::{Axis, DenseOps};

/// Multiplicative update for W: `W <- W .* (HProd ./ (W * HGram))`.
///
/// With strictly non-negative operands the result stays non-negative; that is
/// the property that makes the iteration an NMF.
pub fn update_w(w: &Mat<f64>, h_gram: &Mat<f64>, h_prod: &Mat<f64>) -> Mat<f64> {
    let denom = w.matmul(h_gram);
    w.elem_mul(&h_prod.elem_div(&denom))
}

/// Multiplicative update for H: `H <- H .* (WProd ./ (WGram * H))`.
pub fn update_h(h: &Mat<f64>, w_gram: &Mat<f64>, w_prod: &Mat<f64>) -> Mat<f64> {
    let denom = w_gram.matmul(h);
    h.elem_mul(&w_prod.elem_div(&denom))
}

/// Standard-normal block drawn from an explicit generator, so runs are
/// reproducible per seed.
pub fn normal_block(nrows: usize, ncols: usize, rng: &mut StdRng) -> Mat<f64> {
    let data: Vec<f64> = (0..nrows * ncols)
        .map(|_| rng.sample(StandardNormal))
        .collect();
    Mat::from_row_major(nrows, ncols, &data)
}

/// One grid node's task state.
pub struct Worker {
    pub id: usize,
    /// Local A-block (m/p_r x n/p_c), never mutated after construction.
    pub a_block: Mat<f64>,
    pub comm: GridComm,
    /// All p nodes.
    pub world: Communicator,
    /// Nodes sharing this grid row, ascending column.
    pub row_comm: Communicator,
    /// Nodes sharing this grid column, ascending row.
    pub col_comm: Communicator,
    pub orchestrator: CreditedSender,
    pub k: usize,
    /// m / p.
    pub w_block: usize,
    /// n / p.
    pub h_block: usize,
    pub max_iter: usize,
}

impl Worker {
    /// Run the full iteration loop, then emit the final W and H blocks to the
    /// orchestrator and exit.
    pub fn run(mut self, rng: &mut StdRng) -> Result<(), FaunError> {
        // H from a normal draw per the reference; W likewise (the reference
        // deliberately initializes W too, not only H).
        let mut h = normal_block(self.k, self.h_block, rng);
        let mut w = normal_block(self.w_block, self.k, rng);

        for _ in 0..self.max_iter {
            // W half
            let u = h.matmul(&h.transposed()); // k x k
            let h_gram = self.comm.all_reduce(&u, &self.world)?;
            let hj = self.comm.all_gather(&h, &self.col_comm, Axis::Cols)?; // k x n/p_c
            let v = self.a_block.matmul(&hj.transposed()); // m/p_r x k
            let h_prod = self.comm.reduce_scatter(&v, &self.row_comm, Axis::Rows)?; // m/p x k
            w = update_w(&w, &h_gram, &h_prod);

            // H half
            let x = w.transposed().matmul(&w); // k x k
            let w_gram = self.comm.all_reduce(&x, &self.world)?;
            let wi = self.comm.all_gather(&w, &self.row_comm, Axis::Rows)?; // m/p_r x k
            let y = wi.transposed().matmul(&self.a_block); // k x n/p_c
            let w_prod = self.comm.reduce_scatter(&y, &self.col_comm, Axis::Cols)?; // k x n/p
            h = update_h(&h, &w_gram, &w_prod);
        }

        self.orchestrator.send(Message {
            source: self.id,
            kind: MessageKind::FinalW,
            payload: w,
        })?;
        self.orchestrator.send(Message {
            source: self.id,
            kind: MessageKind::FinalH,
            payload: h,
        })?;
        Ok(())
    }
}
