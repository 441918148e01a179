//! Run setup, node launch and factor reassembly.
//!
//! The orchestrator validates the configuration, partitions A row-major into
//! per-node blocks, wires the mesh, runs one thread per node inside a scoped
//! join, consumes exactly 2p final envelopes (one W and one H per node, in
//! whatever order they arrive) and reassembles the global factors. Nodes
//! never compute W*H; only [`approximate`] reconstructs the product, for
//! inspection.

use std::thread;

use faer::Mat;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::comm::transport::wire;
use crate::comm::{GridComm, MessageKind};
use crate::config::FaunConfig;
use crate::engine::Worker;
use crate::error::FaunError;
use crate::grid::{Communicator, GridTopology};
use crate::matrix::DenseOps;

/// Reassembled global factors.
pub struct NmfFactors {
    /// m x k.
    pub w: Mat<f64>,
    /// k x n.
    pub h: Mat<f64>,
}

/// Rounded W*H for inspection of the reconstruction.
pub fn approximate(factors: &NmfFactors) -> Mat<f64> {
    let product = factors.w.matmul(&factors.h);
    Mat::from_fn(product.nrows(), product.ncols(), |i, j| {
        product[(i, j)].round()
    })
}

/// Partition `a` into p blocks in row-major grid order, each an independent
/// copy.
fn partition(a: &Mat<f64>, cfg: &FaunConfig) -> Vec<Mat<f64>> {
    let (rb, cb) = (cfg.row_block(), cfg.col_block());
    let mut blocks = Vec::with_capacity(cfg.nodes());
    for i in 0..cfg.rows {
        for j in 0..cfg.cols {
            blocks.push(a.block(i * rb..(i + 1) * rb, j * cb..(j + 1) * cb));
        }
    }
    blocks
}

/// Factor `a` (m x n) into non-negative W (m x k) and H (k x n) on a
/// p_r x p_c in-process node grid.
pub fn factorize(a: &Mat<f64>, cfg: &FaunConfig) -> Result<NmfFactors, FaunError> {
    cfg.validate()?;
    if a.shape() != (cfg.m, cfg.n) {
        return Err(FaunError::ShapeMismatch {
            expected: (cfg.m, cfg.n),
            got: a.shape(),
        });
    }

    let grid = GridTopology::new(cfg.rows, cfg.cols);
    let p = grid.size();
    let blocks = partition(a, cfg);
    let (endpoints, orch_mailbox) = wire(p, cfg.window);

    let mut workers = Vec::with_capacity(p);
    for (endpoint, a_block) in endpoints.into_iter().zip(blocks) {
        let id = endpoint.id;
        let (row, col) = grid.coordinate(id);
        workers.push(Worker {
            id,
            a_block,
            comm: GridComm::new(id, endpoint.mailbox, endpoint.peers),
            world: Communicator::new((0..p).collect(), id)?,
            row_comm: Communicator::new(grid.row_communicator(row), id)?,
            col_comm: Communicator::new(grid.col_communicator(col), id)?,
            orchestrator: endpoint.orchestrator,
            k: cfg.k,
            w_block: cfg.w_block(),
            h_block: cfg.h_block(),
            max_iter: cfg.max_iter,
        });
    }

    let mut w_parts: Vec<Option<Mat<f64>>> = vec![None; p];
    let mut h_parts: Vec<Option<Mat<f64>>> = vec![None; p];

    thread::scope(|scope| -> Result<(), FaunError> {
        let mut handles = Vec::with_capacity(p);
        for worker in workers {
            let id = worker.id;
            let seed = cfg.seed.wrapping_add(id as u64);
            handles.push((
                id,
                scope.spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    worker.run(&mut rng)
                }),
            ));
        }

        // exactly one final W and one final H per node; cross-node arrival
        // order is unconstrained
        for _ in 0..2 * p {
            let msg = orch_mailbox.recv()?;
            match msg.kind {
                MessageKind::FinalW => w_parts[msg.source] = Some(msg.payload),
                MessageKind::FinalH => h_parts[msg.source] = Some(msg.payload),
                MessageKind::Collective { .. } => {
                    return Err(FaunError::UnexpectedMessage(
                        "collective envelope at the orchestrator",
                    ));
                }
            }
        }

        for (id, handle) in handles {
            match handle.join() {
                Ok(result) => result?,
                Err(_) => return Err(FaunError::NodeFailed(id)),
            }
        }
        Ok(())
    })?;

    let (wb, hb, cb) = (cfg.w_block(), cfg.h_block(), cfg.col_block());

    let mut w_blocks = Vec::with_capacity(p);
    for (id, part) in w_parts.into_iter().enumerate() {
        let part = part.ok_or(FaunError::NodeFailed(id))?;
        if part.shape() != (wb, cfg.k) {
            return Err(FaunError::ShapeMismatch {
                expected: (wb, cfg.k),
                got: part.shape(),
            });
        }
        w_blocks.push(part);
    }
    let mut h_blocks = Vec::with_capacity(p);
    for (id, part) in h_parts.into_iter().enumerate() {
        let part = part.ok_or(FaunError::NodeFailed(id))?;
        if part.shape() != (cfg.k, hb) {
            return Err(FaunError::ShapeMismatch {
                expected: (cfg.k, hb),
                got: part.shape(),
            });
        }
        h_blocks.push(part);
    }

    // W: node id's block sits at rows id*(m/p); with the row-major id
    // mapping this equals row i*(m/p_r) + col j*(m/p), the same layout the
    // row-communicator gather produces.
    let w = Mat::from_fn(cfg.m, cfg.k, |i, j| w_blocks[i / wb][(i % wb, j)]);

    // H: node (i, j)'s block sits at columns j*(n/p_c) + i*(n/p), matching
    // the column-communicator gather/scatter layout.
    let h = Mat::from_fn(cfg.k, cfg.n, |r, c| {
        let (j, within) = (c / cb, c % cb);
        let node = grid.node_id(within / hb, j);
        h_blocks[node][(r, within % hb)]
    });

    Ok(NmfFactors { w, h })
}
