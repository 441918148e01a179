//! Point-to-point transport with credit-based flow control.
//!
//! Every directed node pair has an unbounded data channel plus a credit
//! channel running the opposite way. A sender starts with `window` credits,
//! spends one per message and blocks once they run out; the receiver returns
//! one credit after consuming a message. A fast sender therefore never holds
//! more than `window` unconsumed messages at a given receiver and cannot race
//! into a future collective's message space. Per-pair delivery is FIFO, so
//! together with the epoch tags each (source, destination, epoch) message is
//! matched exactly once.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

use crate::comm::Message;
use crate::error::FaunError;

/// Default outstanding-message budget per directed pair.
pub const DEFAULT_WINDOW: usize = 4;

/// Sending half of a flow-controlled link.
pub struct CreditedSender {
    data: Sender<Message>,
    credits: Receiver<()>,
    available: usize,
}

impl CreditedSender {
    /// Send, blocking while the credit window is exhausted.
    pub fn send(&mut self, msg: Message) -> Result<(), FaunError> {
        while self.available == 0 {
            self.credits
                .recv()
                .map_err(|_| FaunError::Disconnected("credit channel"))?;
            self.available += 1;
        }
        // fold in any credits that arrived since the last send
        loop {
            match self.credits.try_recv() {
                Ok(()) => self.available += 1,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.available -= 1;
        self.data
            .send(msg)
            .map_err(|_| FaunError::Disconnected("data channel"))
    }
}

/// Receiving half: one inbox fed by every peer, plus per-source credit
/// returns.
pub struct Mailbox {
    inbox: Receiver<Message>,
    credit_return: HashMap<usize, Sender<()>>,
}

impl Mailbox {
    /// Receive the next message and return a credit to its sender.
    pub fn recv(&self) -> Result<Message, FaunError> {
        let msg = self
            .inbox
            .recv()
            .map_err(|_| FaunError::Disconnected("inbox"))?;
        if let Some(tx) = self.credit_return.get(&msg.source) {
            // a sender that already exited has dropped its credit receiver
            let _ = tx.send(());
        }
        Ok(msg)
    }
}

/// Everything one node task needs to talk: its own mailbox, a link to every
/// peer and a link to the orchestrator.
pub struct NodeEndpoints {
    pub id: usize,
    pub mailbox: Mailbox,
    pub peers: HashMap<usize, CreditedSender>,
    pub orchestrator: CreditedSender,
}

/// Build the full p-node mesh plus the orchestrator's mailbox.
pub fn wire(p: usize, window: usize) -> (Vec<NodeEndpoints>, Mailbox) {
    let (orch_tx, orch_rx) = channel();
    let mut node_tx = Vec::with_capacity(p);
    let mut node_rx = Vec::with_capacity(p);
    for _ in 0..p {
        let (tx, rx) = channel();
        node_tx.push(tx);
        node_rx.push(rx);
    }

    let mut node_credits: Vec<HashMap<usize, Sender<()>>> =
        (0..p).map(|_| HashMap::new()).collect();
    let mut orch_credits: HashMap<usize, Sender<()>> = HashMap::new();
    let mut peer_links: Vec<HashMap<usize, CreditedSender>> =
        (0..p).map(|_| HashMap::new()).collect();
    let mut orch_links = Vec::with_capacity(p);

    for source in 0..p {
        for dest in 0..p {
            if dest == source {
                continue;
            }
            let (credit_tx, credit_rx) = channel();
            node_credits[dest].insert(source, credit_tx);
            peer_links[source].insert(
                dest,
                CreditedSender {
                    data: node_tx[dest].clone(),
                    credits: credit_rx,
                    available: window,
                },
            );
        }
        let (credit_tx, credit_rx) = channel();
        orch_credits.insert(source, credit_tx);
        orch_links.push(CreditedSender {
            data: orch_tx.clone(),
            credits: credit_rx,
            available: window,
        });
    }

    let endpoints = node_rx
        .into_iter()
        .zip(node_credits)
        .zip(peer_links)
        .zip(orch_links)
        .enumerate()
        .map(
            |(id, (((inbox, credit_return), peers), orchestrator))| NodeEndpoints {
                id,
                mailbox: Mailbox {
                    inbox,
                    credit_return,
                },
                peers,
                orchestrator,
            },
        )
        .collect();

    let orch_mailbox = Mailbox {
        inbox: orch_rx,
        credit_return: orch_credits,
    };
    (endpoints, orch_mailbox)
}
