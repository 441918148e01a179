//! Dense-matrix API on top of Faer.
//!
//! The engine only needs a small set of primitives: construction from a
//! row-major buffer, products, element-wise multiply/divide, transpose-copy
//! and copy-on-slice blocks, plus axis-wise concatenation and splitting for
//! the collectives. They are provided as an extension trait over
//! `faer::Mat<T>` built from `Mat::from_fn` and plain index loops.

use core::ops::Range;

use faer::Mat;

/// Concatenation / scatter direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Rows,
    Cols,
}

/// Dense primitives used by the NMF engine and collectives.
pub trait DenseOps<T>: Sized {
    /// Construct from raw row-major storage.
    fn from_row_major(nrows: usize, ncols: usize, data: &[T]) -> Self;
    /// (nrows, ncols).
    fn shape(&self) -> (usize, usize);
    /// Extent along `axis`.
    fn extent(&self, axis: Axis) -> usize;
    /// Matrix product self * rhs.
    fn matmul(&self, rhs: &Self) -> Self;
    /// Independent transposed copy.
    fn transposed(&self) -> Self;
    /// Element-wise sum.
    fn elem_add(&self, rhs: &Self) -> Self;
    /// Element-wise product.
    fn elem_mul(&self, rhs: &Self) -> Self;
    /// Element-wise quotient. Zero denominators propagate as NaN/Inf per IEEE
    /// rules; callers are expected to keep inputs strictly positive.
    fn elem_div(&self, rhs: &Self) -> Self;
    /// Independent copy of the given row/column ranges.
    fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Self;
}

impl<T: Copy + num_traits::Float> DenseOps<T> for Mat<T> {
    fn from_row_major(nrows: usize, ncols: usize, data: &[T]) -> Self {
        Mat::from_fn(nrows, ncols, |i, j| data[i * ncols + j])
    }

    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Rows => self.nrows(),
            Axis::Cols => self.ncols(),
        }
    }

    fn matmul(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.ncols(), rhs.nrows());
        Mat::from_fn(self.nrows(), rhs.ncols(), |i, j| {
            let mut acc = T::zero();
            for l in 0..self.ncols() {
                acc = acc + self[(i, l)] * rhs[(l, j)];
            }
            acc
        })
    }

    fn transposed(&self) -> Self {
        Mat::from_fn(self.ncols(), self.nrows(), |i, j| self[(j, i)])
    }

    fn elem_add(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.shape(), rhs.shape());
        Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            self[(i, j)] + rhs[(i, j)]
        })
    }

    fn elem_mul(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.shape(), rhs.shape());
        Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            self[(i, j)] * rhs[(i, j)]
        })
    }

    fn elem_div(&self, rhs: &Self) -> Self {
        debug_assert_eq!(self.shape(), rhs.shape());
        Mat::from_fn(self.nrows(), self.ncols(), |i, j| {
            self[(i, j)] / rhs[(i, j)]
        })
    }

    fn block(&self, rows: Range<usize>, cols: Range<usize>) -> Self {
        Mat::from_fn(rows.len(), cols.len(), |i, j| {
            self[(rows.start + i, cols.start + j)]
        })
    }
}

/// Concatenate `parts` in order along `axis`. Parts must agree on the other
/// dimension.
pub fn concat<T: Copy + num_traits::Float>(parts: &[Mat<T>], axis: Axis) -> Mat<T> {
    match axis {
        Axis::Rows => {
            let ncols = parts.first().map_or(0, |p| p.ncols());
            let nrows = parts.iter().map(|p| p.nrows()).sum();
            let mut data = Vec::with_capacity(nrows * ncols);
            for part in parts {
                for i in 0..part.nrows() {
                    for j in 0..ncols {
                        data.push(part[(i, j)]);
                    }
                }
            }
            Mat::from_row_major(nrows, ncols, &data)
        }
        Axis::Cols => {
            let nrows = parts.first().map_or(0, |p| p.nrows());
            let ncols = parts.iter().map(|p| p.ncols()).sum();
            let mut data = Vec::with_capacity(nrows * ncols);
            for i in 0..nrows {
                for part in parts {
                    for j in 0..part.ncols() {
                        data.push(part[(i, j)]);
                    }
                }
            }
            Mat::from_row_major(nrows, ncols, &data)
        }
    }
}

/// Split into `parts` equal contiguous blocks along `axis`. The extent along
/// `axis` must be divisible by `parts`.
pub fn split<T: Copy + num_traits::Float>(mat: &Mat<T>, parts: usize, axis: Axis) -> Vec<Mat<T>> {
    match axis {
        Axis::Rows => {
            let step = mat.nrows() / parts;
            (0..parts)
                .map(|p| mat.block(p * step..(p + 1) * step, 0..mat.ncols()))
                .collect()
        }
        Axis::Cols => {
            let step = mat.ncols() / parts;
            (0..parts)
                .map(|p| mat.block(0..mat.nrows(), p * step..(p + 1) * step))
                .collect()
        }
    }
}
