//! Binary morphology over `Array2<bool>` masks.
//!
//! Border handling follows the usual convention for binary closing: dilation
//! treats out-of-image pixels as background, erosion treats them as
//! foreground, so regions touching the edge are not eaten.

use log::debug;
use ndarray::{Array2, Axis};
use rayon::prelude::*;
use std::collections::VecDeque;

/// Relative (row, col) offsets of a structuring element
pub type Footprint = Vec<(isize, isize)>;

/// Disk footprint: all offsets with `dy² + dx² <= radius²`
pub fn disk(radius: usize) -> Footprint {
    let r = radius as isize;
    let r2 = r * r;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dy * dy + dx * dx <= r2 {
                offsets.push((dy, dx));
            }
        }
    }
    offsets
}

/// 4-neighbour cross including the centre
pub fn cross() -> Footprint {
    vec![(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)]
}

#[inline]
fn neighbour(
    row: usize,
    col: usize,
    (dy, dx): (isize, isize),
    nrows: usize,
    ncols: usize,
) -> Option<(usize, usize)> {
    let r = row as isize + dy;
    let c = col as isize + dx;
    if r < 0 || c < 0 || r >= nrows as isize || c >= ncols as isize {
        None
    } else {
        Some((r as usize, c as usize))
    }
}

/// A pixel is set if any in-image pixel under the footprint is set
pub fn dilate(mask: &Array2<bool>, footprint: &[(isize, isize)]) -> Array2<bool> {
    let (nrows, ncols) = mask.dim();
    let mut out = Array2::from_elem((nrows, ncols), false);

    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut out_row)| {
            for col in 0..ncols {
                out_row[col] = footprint.iter().any(|&offset| {
                    neighbour(row, col, offset, nrows, ncols)
                        .map(|idx| mask[idx])
                        .unwrap_or(false)
                });
            }
        });

    out
}

/// A pixel stays set only if every in-image pixel under the footprint is set
pub fn erode(mask: &Array2<bool>, footprint: &[(isize, isize)]) -> Array2<bool> {
    let (nrows, ncols) = mask.dim();
    let mut out = Array2::from_elem((nrows, ncols), false);

    out.axis_iter_mut(Axis(0))
        .into_par_iter()
        .enumerate()
        .for_each(|(row, mut out_row)| {
            for col in 0..ncols {
                out_row[col] = footprint.iter().all(|&offset| {
                    neighbour(row, col, offset, nrows, ncols)
                        .map(|idx| mask[idx])
                        .unwrap_or(true)
                });
            }
        });

    out
}

/// Dilation followed by erosion with a disk of the given radius
pub fn binary_closing(mask: &Array2<bool>, radius: usize) -> Array2<bool> {
    let footprint = disk(radius);
    debug!(
        "Closing with disk radius {} ({} offsets)",
        radius,
        footprint.len()
    );
    erode(&dilate(mask, &footprint), &footprint)
}

/// Drop 4-connected components smaller than `min_size` pixels
pub fn remove_small_objects(mask: &Array2<bool>, min_size: usize) -> Array2<bool> {
    let (nrows, ncols) = mask.dim();
    let mut out = mask.clone();
    if min_size <= 1 {
        return out;
    }

    let mut visited = Array2::from_elem((nrows, ncols), false);
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();
    let mut component: Vec<(usize, usize)> = Vec::new();
    let mut removed = 0usize;

    for row in 0..nrows {
        for col in 0..ncols {
            if !mask[[row, col]] || visited[[row, col]] {
                continue;
            }

            component.clear();
            visited[[row, col]] = true;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                component.push((r, c));
                for &offset in &[(-1, 0), (1, 0), (0, -1), (0, 1)] {
                    if let Some(idx) = neighbour(r, c, offset, nrows, ncols) {
                        if mask[idx] && !visited[idx] {
                            visited[idx] = true;
                            queue.push_back(idx);
                        }
                    }
                }
            }

            if component.len() < min_size {
                removed += 1;
                for &idx in &component {
                    out[idx] = false;
                }
            }
        }
    }

    debug!("Removed {} components smaller than {} pixels", removed, min_size);
    out
}

/// Pixels reached by one 4-neighbour dilation step but not in the mask
pub fn outer_boundary(mask: &Array2<bool>) -> Array2<bool> {
    let dilated = dilate(mask, &cross());
    let mut boundary = dilated;
    boundary.zip_mut_with(mask, |b, &m| *b ^= m);
    boundary
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    fn count(mask: &Array2<bool>) -> usize {
        mask.iter().filter(|&&v| v).count()
    }

    #[test]
    fn test_disk_sizes() {
        assert_eq!(disk(0).len(), 1);
        assert_eq!(disk(1).len(), 5);
        // Radius 5 disk has 81 pixels
        assert_eq!(disk(5).len(), 81);
    }

    #[test]
    fn test_closing_fills_gap() {
        let mut mask = Array2::from_elem((30, 30), false);
        for r in 10..20 {
            for c in 10..20 {
                mask[[r, c]] = true;
            }
        }
        mask[[15, 15]] = false;
        mask[[14, 15]] = false;

        let closed = binary_closing(&mask, 5);
        assert!(closed[[15, 15]]);
        assert!(closed[[14, 15]]);
        assert_eq!(count(&closed), 100);
    }

    #[test]
    fn test_closing_keeps_edge_regions() {
        let mut mask = Array2::from_elem((20, 20), false);
        for r in 0..5 {
            for c in 0..20 {
                mask[[r, c]] = true;
            }
        }
        let closed = binary_closing(&mask, 5);
        assert_eq!(closed, mask);
    }

    #[test]
    fn test_closing_is_extensive() {
        let mask = arr2(&[
            [true, false, false, true],
            [false, true, false, false],
            [false, false, false, true],
        ]);
        let closed = binary_closing(&mask, 2);
        for (m, c) in mask.iter().zip(closed.iter()) {
            assert!(!*m || *c);
        }
    }

    #[test]
    fn test_remove_isolated_pixel() {
        let mut mask = Array2::from_elem((5, 5), false);
        mask[[2, 2]] = true;
        let cleaned = remove_small_objects(&mask, 2);
        assert_eq!(count(&cleaned), 0);
    }

    #[test]
    fn test_remove_keeps_large_component() {
        let mask = arr2(&[
            [true, true, false, false],
            [true, true, false, true],
            [false, false, false, false],
        ]);
        let cleaned = remove_small_objects(&mask, 3);
        assert_eq!(count(&cleaned), 4);
        assert!(!cleaned[[1, 3]]);
    }

    #[test]
    fn test_remove_uses_four_connectivity() {
        // Diagonal neighbours are separate components
        let mask = arr2(&[[true, false], [false, true]]);
        let cleaned = remove_small_objects(&mask, 2);
        assert_eq!(count(&cleaned), 0);
    }

    #[test]
    fn test_outer_boundary_of_single_pixel() {
        let mut mask = Array2::from_elem((3, 3), false);
        mask[[1, 1]] = true;
        let boundary = outer_boundary(&mask);
        assert_eq!(count(&boundary), 4);
        assert!(!boundary[[1, 1]]);
        assert!(boundary[[0, 1]] && boundary[[2, 1]] && boundary[[1, 0]] && boundary[[1, 2]]);
    }
}
