//! Grid collectives: global all-reduce, axis all-gather, axis reduce-scatter.
//!
//! Each operation is a synchronous barrier over its communicator: it does not
//! return until the full semantic contract is satisfied, which requires every
//! member to issue the same call with the same epoch. A member that skips or
//! reorders a call blocks the communicator forever; that is the central
//! correctness contract, surfaced as a hang rather than silently tolerated.
//!
//! Arrival order across peers is unconstrained. A contribution from a peer
//! that has already raced ahead into a later collective is stashed by
//! (epoch, slot) and drained when its epoch begins.

use std::collections::HashMap;

use faer::Mat;

use crate::comm::transport::{CreditedSender, Mailbox};
use crate::comm::{Message, MessageKind};
use crate::error::FaunError;
use crate::grid::Communicator;
use crate::matrix::{Axis, DenseOps, concat, split};

/// One node's view of the interconnect.
pub struct GridComm {
    id: usize,
    mailbox: Mailbox,
    peers: HashMap<usize, CreditedSender>,
    pending: HashMap<(u64, usize), Mat<f64>>,
    epoch: u64,
}

impl GridComm {
    pub fn new(id: usize, mailbox: Mailbox, peers: HashMap<usize, CreditedSender>) -> Self {
        Self {
            id,
            mailbox,
            peers,
            pending: HashMap::new(),
            epoch: 0,
        }
    }

    fn next_epoch(&mut self) -> u64 {
        let epoch = self.epoch;
        self.epoch += 1;
        epoch
    }

    fn send_to(
        &mut self,
        dest: usize,
        epoch: u64,
        slot: usize,
        payload: Mat<f64>,
    ) -> Result<(), FaunError> {
        let link = self
            .peers
            .get_mut(&dest)
            .ok_or(FaunError::Disconnected("unknown peer"))?;
        link.send(Message {
            source: self.id,
            kind: MessageKind::Collective { epoch, slot },
            payload,
        })
    }

    /// Next contribution for `epoch`, buffering messages that belong to a
    /// later collective.
    fn recv_contribution(&mut self, epoch: u64) -> Result<(usize, Mat<f64>), FaunError> {
        if let Some(key) = self.pending.keys().find(|&&(e, _)| e == epoch).copied()
            && let Some(payload) = self.pending.remove(&key)
        {
            return Ok((key.1, payload));
        }
        loop {
            let msg = self.mailbox.recv()?;
            match msg.kind {
                MessageKind::Collective { epoch: e, slot } => {
                    if e == epoch {
                        return Ok((slot, msg.payload));
                    }
                    self.pending.insert((e, slot), msg.payload);
                }
                MessageKind::FinalW | MessageKind::FinalH => {
                    return Err(FaunError::UnexpectedMessage("final block at a grid node"));
                }
            }
        }
    }

    /// Element-wise sum of every member's same-shaped contribution, delivered
    /// identically to all members.
    pub fn all_reduce(
        &mut self,
        local: &Mat<f64>,
        comm: &Communicator,
    ) -> Result<Mat<f64>, FaunError> {
        let epoch = self.next_epoch();
        for dest in comm.peers() {
            self.send_to(dest, epoch, comm.slot(), local.clone())?;
        }
        let mut sum = local.clone();
        for _ in 0..comm.len() - 1 {
            let (_, contribution) = self.recv_contribution(epoch)?;
            if contribution.shape() != local.shape() {
                return Err(FaunError::ShapeMismatch {
                    expected: local.shape(),
                    got: contribution.shape(),
                });
            }
            sum = sum.elem_add(&contribution);
        }
        Ok(sum)
    }

    /// Concatenation of every member's slice in communicator order along
    /// `axis`, delivered identically to all members.
    pub fn all_gather(
        &mut self,
        local: &Mat<f64>,
        comm: &Communicator,
        axis: Axis,
    ) -> Result<Mat<f64>, FaunError> {
        let epoch = self.next_epoch();
        for dest in comm.peers() {
            self.send_to(dest, epoch, comm.slot(), local.clone())?;
        }
        let mut parts: Vec<Option<Mat<f64>>> = vec![None; comm.len()];
        parts[comm.slot()] = Some(local.clone());
        for _ in 0..comm.len() - 1 {
            let (slot, contribution) = self.recv_contribution(epoch)?;
            if slot >= comm.len() || parts[slot].is_some() {
                return Err(FaunError::UnexpectedMessage("bad gather slot"));
            }
            let across = match axis {
                Axis::Rows => contribution.ncols() == local.ncols(),
                Axis::Cols => contribution.nrows() == local.nrows(),
            };
            if !across {
                return Err(FaunError::ShapeMismatch {
                    expected: local.shape(),
                    got: contribution.shape(),
                });
            }
            parts[slot] = Some(contribution);
        }
        let parts: Vec<Mat<f64>> = parts.into_iter().flatten().collect();
        Ok(concat(&parts, axis))
    }

    /// Element-wise sum of every member's full-sized contribution, sliced
    /// into |comm| equal shards along `axis`; each member receives only its
    /// own shard. Shards travel individually, so no member ever assembles the
    /// full sum (this is what bounds per-node traffic as the grid grows).
    pub fn reduce_scatter(
        &mut self,
        local: &Mat<f64>,
        comm: &Communicator,
        axis: Axis,
    ) -> Result<Mat<f64>, FaunError> {
        let epoch = self.next_epoch();
        let extent = local.extent(axis);
        if extent % comm.len() != 0 {
            return Err(FaunError::UnevenScatter {
                len: extent,
                parts: comm.len(),
            });
        }
        let shards = split(local, comm.len(), axis);
        let mut own = shards[comm.slot()].clone();
        for (slot, shard) in shards.into_iter().enumerate() {
            if slot == comm.slot() {
                continue;
            }
            self.send_to(comm.member(slot), epoch, comm.slot(), shard)?;
        }
        for _ in 0..comm.len() - 1 {
            let (_, contribution) = self.recv_contribution(epoch)?;
            if contribution.shape() != own.shape() {
                return Err(FaunError::ShapeMismatch {
                    expected: own.shape(),
                    got: contribution.shape(),
                });
            }
            own = own.elem_add(&contribution);
        }
        Ok(own)
    }
}
