use canny_core::GridShape;
use std::ops::Range;

/// Splits the linear pixel range of `shape` into at most `workers`
/// contiguous, disjoint ranges.
///
/// Ranges are whole slabs of the slowest axis, so each worker owns complete
/// hyperplanes of the grid.
pub fn partition(shape: &GridShape, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let last = shape.dims() - 1;
    let slab = shape.strides()[last];
    let slabs = shape.extent()[last];
    let per_worker = slabs.div_ceil(workers);

    (0..slabs)
        .step_by(per_worker)
        .map(|first| {
            let end = (first + per_worker).min(slabs);
            first * slab..end * slab
        })
        .collect()
}

/// Borrows one mutable sub-slice per range.
///
/// `ranges` must be sorted, disjoint and lie within `data`.
pub fn split_disjoint<'a, T>(mut data: &'a mut [T], ranges: &[Range<usize>]) -> Vec<&'a mut [T]> {
    let mut parts = Vec::with_capacity(ranges.len());
    let mut consumed = 0;
    for range in ranges {
        let (_, rest) = std::mem::take(&mut data).split_at_mut(range.start - consumed);
        let (part, rest) = rest.split_at_mut(range.len());
        parts.push(part);
        data = rest;
        consumed = range.end;
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(ranges: &[Range<usize>], volume: usize) {
        let mut next = 0;
        for r in ranges {
            assert_eq!(r.start, next);
            assert!(r.end > r.start);
            next = r.end;
        }
        assert_eq!(next, volume);
    }

    #[test]
    fn test_partition_1d() {
        let shape = GridShape::new(&[10]).unwrap();
        let ranges = partition(&shape, 4);
        assert_eq!(ranges, vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn test_partition_whole_slabs() {
        let shape = GridShape::new(&[5, 4, 3]).unwrap();
        let ranges = partition(&shape, 2);
        assert_eq!(ranges, vec![0..40, 40..60]);
        assert_covers(&ranges, shape.volume());
    }

    #[test]
    fn test_more_workers_than_slabs() {
        let shape = GridShape::new(&[8, 2]).unwrap();
        let ranges = partition(&shape, 16);
        assert_eq!(ranges.len(), 2);
        assert_covers(&ranges, shape.volume());
    }

    #[test]
    fn test_zero_workers_means_one() {
        let shape = GridShape::new(&[3, 3]).unwrap();
        assert_eq!(partition(&shape, 0), vec![0..9]);
    }

    #[test]
    fn test_split_disjoint() {
        let mut data: Vec<u32> = (0..10).collect();
        let parts = split_disjoint(&mut data, &[0..3, 3..6, 6..9, 9..10]);
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[1], &[3, 4, 5]);
        assert_eq!(parts[3], &[9]);
    }
}
