//! 2-D process-grid topology and communicator membership.
//!
//! Node ids map row-major onto the grid: `row = id / cols`, `col = id % cols`.
//! Partitioning, the collectives and final reassembly all rely on this one
//! mapping. Communicator ordering is load-bearing: all-gather concatenates
//! slices and reduce-scatter assigns shards in communicator order, so every
//! member derives the identical ordered list from the topology alone.

use crate::error::FaunError;

/// Immutable grid shape shared by every node.
#[derive(Debug, Clone, Copy)]
pub struct GridTopology {
    pub rows: usize,
    pub cols: usize,
}

impl GridTopology {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// Total node count.
    pub fn size(&self) -> usize {
        self.rows * self.cols
    }

    /// (row, col) coordinate of a linear node id.
    pub fn coordinate(&self, id: usize) -> (usize, usize) {
        (id / self.cols, id % self.cols)
    }

    /// Linear node id of a (row, col) coordinate.
    pub fn node_id(&self, row: usize, col: usize) -> usize {
        row * self.cols + col
    }

    /// Ids sharing `row`, ordered by ascending column.
    pub fn row_communicator(&self, row: usize) -> Vec<usize> {
        (0..self.cols).map(|col| self.node_id(row, col)).collect()
    }

    /// Ids sharing `col`, ordered by ascending row.
    pub fn col_communicator(&self, col: usize) -> Vec<usize> {
        (0..self.rows).map(|row| self.node_id(row, col)).collect()
    }
}

/// A fixed ordered set of nodes that jointly execute collectives, plus this
/// node's position (slot) within it.
#[derive(Debug, Clone)]
pub struct Communicator {
    members: Vec<usize>,
    slot: usize,
}

impl Communicator {
    pub fn new(members: Vec<usize>, me: usize) -> Result<Self, FaunError> {
        match members.iter().position(|&id| id == me) {
            Some(slot) => Ok(Self { members, slot }),
            None => Err(FaunError::NotAMember(me)),
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// This node's index in communicator order.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Id of the member occupying `slot`.
    pub fn member(&self, slot: usize) -> usize {
        self.members[slot]
    }

    /// Member ids excluding this node, in communicator order.
    pub fn peers(&self) -> impl Iterator<Item = usize> + '_ {
        let me = self.slot;
        self.members
            .iter()
            .enumerate()
            .filter(move |&(slot, _)| slot != me)
            .map(|(_, &id)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_coordinates() {
        let grid = GridTopology::new(2, 3);
        assert_eq!(grid.size(), 6);
        assert_eq!(grid.coordinate(0), (0, 0));
        assert_eq!(grid.coordinate(2), (0, 2));
        assert_eq!(grid.coordinate(3), (1, 0));
        assert_eq!(grid.coordinate(5), (1, 2));
        for id in 0..grid.size() {
            let (row, col) = grid.coordinate(id);
            assert_eq!(grid.node_id(row, col), id);
        }
    }

    #[test]
    fn communicator_ordering() {
        let grid = GridTopology::new(2, 3);
        assert_eq!(grid.row_communicator(1), vec![3, 4, 5]);
        assert_eq!(grid.col_communicator(2), vec![2, 5]);
    }

    #[test]
    fn every_node_in_exactly_one_row_and_column_communicator() {
        let grid = GridTopology::new(3, 4);
        for id in 0..grid.size() {
            let row_hits = (0..grid.rows)
                .filter(|&r| grid.row_communicator(r).contains(&id))
                .count();
            let col_hits = (0..grid.cols)
                .filter(|&c| grid.col_communicator(c).contains(&id))
                .count();
            assert_eq!(row_hits, 1);
            assert_eq!(col_hits, 1);
        }
        assert_eq!(grid.row_communicator(0).len(), grid.cols);
        assert_eq!(grid.col_communicator(0).len(), grid.rows);
    }

    #[test]
    fn communicator_slot_and_peers() {
        let comm = Communicator::new(vec![2, 5, 8], 5).unwrap();
        assert_eq!(comm.len(), 3);
        assert_eq!(comm.slot(), 1);
        assert_eq!(comm.member(2), 8);
        assert_eq!(comm.peers().collect::<Vec<_>>(), vec![2, 8]);
    }

    #[test]
    fn non_member_rejected() {
        assert!(matches!(
            Communicator::new(vec![0, 1], 7),
            Err(FaunError::NotAMember(7))
        ));
    }
}
