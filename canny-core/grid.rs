use crate::error::{GridError, GridResult};
use crate::shape::GridShape;

/// Dense D-dimensional grid stored with axis 0 fastest
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    shape: GridShape,
    data: Vec<T>,
}

impl<T: Clone> Grid<T> {
    /// Allocates a grid filled with `value`
    pub fn new(shape: GridShape, value: T) -> Self {
        let data = vec![value; shape.volume()];
        Self { shape, data }
    }
}

impl<T> Grid<T> {
    /// Wraps existing samples, validating their count against the shape
    pub fn from_vec(shape: GridShape, data: Vec<T>) -> GridResult<Self> {
        if data.len() != shape.volume() {
            return Err(GridError::InvalidGridData {
                expected_len: shape.volume(),
                actual_len: data.len(),
            });
        }
        Ok(Self { shape, data })
    }

    /// Row-major 2-D grid, `width` along axis 0
    pub fn from_2d(width: usize, height: usize, data: Vec<T>) -> GridResult<Self> {
        Self::from_vec(GridShape::new(&[width, height])?, data)
    }

    pub fn shape(&self) -> &GridShape {
        &self.shape
    }

    pub fn extent(&self) -> &[usize] {
        self.shape.extent()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, index: &[usize]) -> Option<&T> {
        self.shape.checked_offset_of(index).map(|o| &self.data[o])
    }

    pub fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        self.shape.checked_offset_of(index).map(move |o| &mut self.data[o])
    }

    /// Writes `value` at `index`; returns false when the index is out of bounds
    pub fn set(&mut self, index: &[usize], value: T) -> bool {
        match self.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Grid<U> {
        Grid {
            shape: self.shape.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Fails unless `other` has the same extent
    pub fn ensure_same_shape<U>(&self, other: &Grid<U>) -> GridResult<()> {
        if self.shape != other.shape {
            return Err(GridError::ShapeMismatch {
                expected: self.extent().to_vec(),
                actual: other.extent().to_vec(),
            });
        }
        Ok(())
    }
}
