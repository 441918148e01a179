use thiserror::Error;

// Unified error type for faun

#[derive(Error, Debug)]
pub enum FaunError {
    #[error("degenerate {rows}x{cols} process grid")]
    InvalidGrid { rows: usize, cols: usize },
    #[error("{name} must be positive (got {value})")]
    NotPositive { name: &'static str, value: usize },
    #[error("{name} = {value} is not divisible by {divisor}")]
    NotDivisible {
        name: &'static str,
        value: usize,
        divisor: usize,
    },
    #[error("shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        got: (usize, usize),
    },
    #[error("cannot scatter extent {len} into {parts} equal shards")]
    UnevenScatter { len: usize, parts: usize },
    #[error("node {0} is not a member of the communicator")]
    NotAMember(usize),
    #[error("channel disconnected: {0}")]
    Disconnected(&'static str),
    #[error("unexpected message: {0}")]
    UnexpectedMessage(&'static str),
    #[error("node task {0} failed")]
    NodeFailed(usize),
}
