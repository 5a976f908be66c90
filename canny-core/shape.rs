use crate::error::{GridError, GridResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Extent of a D-dimensional grid together with its linear strides.
///
/// Axis 0 varies fastest, so the stride of axis `i` is the product of the
/// extents of axes `0..i`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GridShape {
    extent: Vec<usize>,
    strides: Vec<usize>,
    volume: usize,
}

impl GridShape {
    /// Creates a shape, rejecting zero axes and empty extents
    pub fn new(extent: &[usize]) -> GridResult<Self> {
        if extent.is_empty() {
            return Err(GridError::EmptyShape);
        }
        if let Some((axis, &e)) = extent.iter().enumerate().find(|&(_, &e)| e == 0) {
            return Err(GridError::ZeroExtent { axis, extent: e });
        }

        // Linear offsets and neighbor steps are signed, so the volume must fit in isize
        let overflow = || GridError::VolumeOverflow {
            extent: extent.to_vec(),
        };
        let mut strides = Vec::with_capacity(extent.len());
        let mut volume = 1usize;
        for &e in extent {
            strides.push(volume);
            volume = volume.checked_mul(e).ok_or_else(overflow)?;
        }
        if volume > isize::MAX as usize {
            return Err(overflow());
        }

        Ok(Self {
            extent: extent.to_vec(),
            strides,
            volume,
        })
    }

    pub fn dims(&self) -> usize {
        self.extent.len()
    }

    pub fn extent(&self) -> &[usize] {
        &self.extent
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total number of pixels
    pub fn volume(&self) -> usize {
        self.volume
    }

    /// True iff every coordinate lies in `[0, extent)`
    pub fn in_bounds(&self, index: &[isize]) -> bool {
        index.len() == self.extent.len()
            && index
                .iter()
                .zip(&self.extent)
                .all(|(&c, &e)| c >= 0 && (c as usize) < e)
    }

    /// Linear offset of a multi-index. The caller guarantees the index is in bounds.
    pub fn offset_of(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.dims());
        index.iter().zip(&self.strides).map(|(&c, &s)| c * s).sum()
    }

    /// Checked variant of [`GridShape::offset_of`]
    pub fn checked_offset_of(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.dims() || index.iter().zip(&self.extent).any(|(&c, &e)| c >= e) {
            return None;
        }
        Some(self.offset_of(index))
    }

    /// Decodes a linear offset into `coords`
    pub fn coords_of(&self, offset: usize, coords: &mut [usize]) {
        debug_assert!(offset < self.volume);
        let mut rest = offset;
        for (c, &e) in coords.iter_mut().zip(&self.extent) {
            *c = rest % e;
            rest /= e;
        }
    }
}

/// A strided run of neighborhood positions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSlice {
    pub start: usize,
    pub len: usize,
    pub stride: usize,
}

impl AxisSlice {
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let (start, stride) = (self.start, self.stride);
        (0..self.len).map(move |i| start + i * stride)
    }
}

/// The 3^D box of positions surrounding (and including) a center pixel.
///
/// Positions are numbered with axis 0 fastest. `slices[axis]` enumerates the
/// three positions on the line through the center along `axis`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighborhood {
    dims: usize,
    size: usize,
    strides: Vec<usize>,
    center: usize,
    slices: Vec<AxisSlice>,
}

impl Neighborhood {
    pub fn new(dims: usize) -> Self {
        let mut strides = Vec::with_capacity(dims);
        let mut size = 1usize;
        for _ in 0..dims {
            strides.push(size);
            size *= 3;
        }
        let center = size / 2;
        let slices = strides
            .iter()
            .map(|&stride| AxisSlice {
                start: center - stride,
                len: 3,
                stride,
            })
            .collect();

        Self {
            dims,
            size,
            strides,
            center,
            slices,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn center(&self) -> usize {
        self.center
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn slice(&self, axis: usize) -> AxisSlice {
        self.slices[axis]
    }

    pub fn slices(&self) -> &[AxisSlice] {
        &self.slices
    }

    /// Per-axis step (-1, 0 or 1) of a neighborhood position relative to the center
    pub fn delta_of(&self, position: usize, delta: &mut [isize]) {
        let mut rest = position;
        for d in delta.iter_mut().take(self.dims) {
            *d = (rest % 3) as isize - 1;
            rest /= 3;
        }
    }
}

/// Which neighbors are considered adjacent during edge linking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Connectivity {
    /// One step along a single axis: 2·D neighbors
    Face,
    /// Every other position of the 3^D box: 3^D - 1 neighbors
    #[default]
    Full,
}

impl Connectivity {
    pub fn neighbor_count(self, dims: usize) -> usize {
        match self {
            Connectivity::Face => 2 * dims,
            Connectivity::Full => 3usize.pow(dims as u32) - 1,
        }
    }
}

impl std::str::FromStr for Connectivity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "face" => Ok(Connectivity::Face),
            "full" => Ok(Connectivity::Full),
            other => Err(format!("unknown connectivity '{}' (expected face or full)", other)),
        }
    }
}

/// Precomputed neighbor steps for one shape and connectivity.
///
/// Axes of extent 1 admit no step other than 0, so only the remaining
/// `axes` are enumerated. Row `k` of `deltas` holds the step of neighbor `k`
/// along each of those axes, and `linear[k]` the matching change in linear
/// offset.
#[derive(Debug, Clone)]
pub struct NeighborOffsets {
    axes: Vec<usize>,
    deltas: Vec<isize>,
    linear: Vec<isize>,
}

impl NeighborOffsets {
    pub fn new(shape: &GridShape, connectivity: Connectivity) -> Self {
        let axes: Vec<usize> = (0..shape.dims()).filter(|&a| shape.extent()[a] > 1).collect();
        let width = axes.len();
        let hood = Neighborhood::new(width);
        let positions: Vec<usize> = match connectivity {
            Connectivity::Face => hood
                .slices()
                .iter()
                .flat_map(|s| s.indices().filter(|&p| p != hood.center()))
                .collect(),
            Connectivity::Full => (0..hood.size()).filter(|&p| p != hood.center()).collect(),
        };

        let mut deltas = vec![0isize; positions.len() * width];
        let mut linear = Vec::with_capacity(positions.len());
        for (k, &p) in positions.iter().enumerate() {
            let row = &mut deltas[k * width..(k + 1) * width];
            hood.delta_of(p, row);
            linear.push(
                row.iter()
                    .zip(&axes)
                    .map(|(&d, &axis)| d * shape.strides()[axis] as isize)
                    .sum(),
            );
        }

        Self { axes, deltas, linear }
    }

    /// Axes a neighbor can step along
    pub fn axes(&self) -> &[usize] {
        &self.axes
    }

    pub fn len(&self) -> usize {
        self.linear.len()
    }

    pub fn is_empty(&self) -> bool {
        self.linear.is_empty()
    }

    /// `(delta, linear)` per neighbor; `delta` is indexed like [`NeighborOffsets::axes`]
    pub fn iter(&self) -> impl Iterator<Item = (&[isize], isize)> {
        let width = self.axes.len();
        self.linear
            .iter()
            .enumerate()
            .map(move |(k, &l)| (&self.deltas[k * width..(k + 1) * width], l))
    }

    /// Linear offset of the neighbor `delta` away from the pixel at
    /// `offset`/`coords`, or `None` when it falls outside the grid.
    pub fn step(&self, shape: &GridShape, offset: usize, coords: &[usize], delta: &[isize], linear: isize) -> Option<usize> {
        for (&axis, &d) in self.axes.iter().zip(delta) {
            let n = coords[axis] as isize + d;
            if n < 0 || n as usize >= shape.extent()[axis] {
                return None;
            }
        }
        Some((offset as isize + linear) as usize)
    }
}
