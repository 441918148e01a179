//! faun: communication-avoiding distributed NMF over an in-process node grid.
//!
//! This crate factors a dense matrix A (m x n) into non-negative W (m x k)
//! and H (k x n) with the MPI-FAUN parallel algorithm. The computation is
//! distributed over a simulated p_r x p_c grid of nodes, one thread each,
//! that exchange messages through a flow-controlled point-to-point substrate
//! and synchronize exclusively via three collectives: global all-reduce,
//! axis-restricted all-gather and axis-restricted reduce-scatter.

pub mod comm;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod matrix;
pub mod orchestrator;

// Re-exports for convenience
pub use comm::{GridComm, Message, MessageKind};
pub use config::FaunConfig;
pub use error::FaunError;
pub use grid::{Communicator, GridTopology};
pub use matrix::{Axis, DenseOps, concat, split};
pub use orchestrator::{NmfFactors, approximate, factorize};
