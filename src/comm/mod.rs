//! Message envelope, flow-controlled transport and grid collectives.

pub mod collective;
pub mod transport;

pub use collective::GridComm;
pub use transport::{CreditedSender, DEFAULT_WINDOW, Mailbox, NodeEndpoints, wire};

use faer::Mat;

/// Tagged payload used uniformly for intra-grid traffic and for the final
/// deliveries to the orchestrator.
pub struct Message {
    pub source: usize,
    pub kind: MessageKind,
    pub payload: Mat<f64>,
}

/// Envelope discriminant plus the sequencing the receiver needs to place a
/// contribution during gather/scatter reassembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Contribution to a collective. `epoch` is the sender's monotone
    /// collective sequence number; every node issues the identical SPMD
    /// sequence of collective calls, so equal epochs identify the same
    /// logical collective across peers. `slot` is the sender's index within
    /// the communicator.
    Collective { epoch: u64, slot: usize },
    /// A node's final W block.
    FinalW,
    /// A node's final H block.
    FinalH,
}
