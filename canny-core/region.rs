use crate::error::{GridError, GridResult};
use crate::shape::GridShape;

/// Axis-aligned box of pixels: a start index and a per-axis size.
///
/// Starts are signed so that a padded region may reach past the grid origin
/// before it is cropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    index: Vec<isize>,
    size: Vec<usize>,
}

impl Region {
    pub fn new(index: Vec<isize>, size: Vec<usize>) -> GridResult<Self> {
        if index.len() != size.len() {
            return Err(GridError::DimensionMismatch {
                expected: index.len(),
                actual: size.len(),
            });
        }
        Ok(Self { index, size })
    }

    /// The whole grid described by `shape`
    pub fn from_shape(shape: &GridShape) -> Self {
        Self {
            index: vec![0; shape.dims()],
            size: shape.extent().to_vec(),
        }
    }

    pub fn dims(&self) -> usize {
        self.size.len()
    }

    pub fn index(&self) -> &[isize] {
        &self.index
    }

    pub fn size(&self) -> &[usize] {
        &self.size
    }

    pub fn volume(&self) -> usize {
        self.size.iter().product()
    }

    /// Grows the region by `radius[axis]` pixels on both sides of every axis
    pub fn pad_by(&mut self, radius: &[usize]) {
        for ((start, size), &r) in self.index.iter_mut().zip(self.size.iter_mut()).zip(radius) {
            *start -= r as isize;
            *size += 2 * r;
        }
    }

    /// Clips the region to `bounds`.
    ///
    /// Returns false and leaves the region untouched when the two do not
    /// overlap on some axis.
    pub fn crop(&mut self, bounds: &Region) -> bool {
        if bounds.dims() != self.dims() {
            return false;
        }
        let overlaps = (0..self.dims()).all(|i| {
            let (lo, hi) = self.bounds_of(i);
            let (blo, bhi) = bounds.bounds_of(i);
            lo < bhi && hi > blo
        });
        if !overlaps {
            return false;
        }

        for i in 0..self.dims() {
            let (lo, hi) = self.bounds_of(i);
            let (blo, bhi) = bounds.bounds_of(i);
            let lo = lo.max(blo);
            let hi = hi.min(bhi);
            self.index[i] = lo;
            self.size[i] = (hi - lo) as usize;
        }
        true
    }

    /// True iff every pixel of `other` also lies in `self`
    pub fn contains(&self, other: &Region) -> bool {
        other.dims() == self.dims()
            && (0..self.dims()).all(|i| {
                let (lo, hi) = self.bounds_of(i);
                let (olo, ohi) = other.bounds_of(i);
                olo >= lo && ohi <= hi
            })
    }

    fn bounds_of(&self, axis: usize) -> (isize, isize) {
        let lo = self.index[axis];
        (lo, lo + self.size[axis] as isize)
    }
}
