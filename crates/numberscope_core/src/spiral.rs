//! Spiral fill order for a grid of `rows` by `cols` cells.
//!
//! Cells are addressed 1-based as `(x, y)` = (column, row). The path starts
//! near the center of the grid and winds outward until it finishes at the
//! top left corner, so step `k` of the spiral is step `rows*cols - 1 - k` of
//! the clockwise walk that peels the grid from the outside in.

/// First outside-in index of the ring `depth` cells in from the border.
fn ring_start(depth: i64, rows: i64, cols: i64) -> i64 {
    2 * depth * (rows + cols) - 4 * depth * depth
}

fn ring_of(i: i64, rows: i64, cols: i64) -> i64 {
    let max_depth = (rows.min(cols) - 1) / 2;
    let s = (rows + cols) as f64;
    let estimate = ((s - (s * s - 4.0 * i as f64).max(0.0).sqrt()) / 4.0).floor() as i64;
    let mut depth = estimate.clamp(0, max_depth);
    while depth < max_depth && ring_start(depth + 1, rows, cols) <= i {
        depth += 1;
    }
    while depth > 0 && ring_start(depth, rows, cols) > i {
        depth -= 1;
    }
    depth
}

fn outside_in(i: i64, rows: i64, cols: i64) -> (i64, i64) {
    let depth = ring_of(i, rows, cols);
    let (h, w) = (rows - 2 * depth, cols - 2 * depth);
    let origin = depth + 1;
    let mut t = i - ring_start(depth, rows, cols);
    if t < w {
        return (origin + t, origin);
    }
    t -= w;
    if t < h - 1 {
        return (origin + w - 1, origin + 1 + t);
    }
    t -= h - 1;
    if t < w - 1 {
        return (origin + w - 2 - t, origin + h - 1);
    }
    t -= w - 1;
    (origin, origin + h - 2 - t)
}

/// Cell visited at step `k` (0-based) of the spiral, or `None` past the end.
pub fn position(k: u64, rows: u64, cols: u64) -> Option<(u64, u64)> {
    let cells = rows.checked_mul(cols)?;
    if k >= cells {
        return None;
    }
    let (rows, cols) = (i64::try_from(rows).ok()?, i64::try_from(cols).ok()?);
    let i = i64::try_from(cells - 1 - k).ok()?;
    let (x, y) = outside_in(i, rows, cols);
    Some((x as u64, y as u64))
}

/// Step of the spiral (0-based) at which cell `(x, y)` is visited.
pub fn index(x: u64, y: u64, rows: u64, cols: u64) -> Option<u64> {
    if x == 0 || y == 0 || x > cols || y > rows {
        return None;
    }
    let (x, y) = (x as i64, y as i64);
    let (rows, cols) = (i64::try_from(rows).ok()?, i64::try_from(cols).ok()?);
    let depth = (x - 1).min(y - 1).min(cols - x).min(rows - y);
    let (h, w) = (rows - 2 * depth, cols - 2 * depth);
    let origin = depth + 1;
    let offset = if y == origin {
        x - origin
    } else if x == origin + w - 1 {
        w + (y - origin - 1)
    } else if y == origin + h - 1 {
        w + h - 1 + (origin + w - 2 - x)
    } else {
        w + h - 1 + w - 1 + (origin + h - 2 - y)
    };
    let walked = ring_start(depth, rows, cols) + offset;
    Some((rows * cols - 1 - walked) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn three_by_five_path() {
        let path: Vec<(u64, u64)> = (0..15).filter_map(|k| position(k, 3, 5)).collect();
        assert_eq!(
            path,
            vec![
                (4, 2),
                (3, 2),
                (2, 2),
                (1, 2),
                (1, 3),
                (2, 3),
                (3, 3),
                (4, 3),
                (5, 3),
                (5, 2),
                (5, 1),
                (4, 1),
                (3, 1),
                (2, 1),
                (1, 1),
            ]
        );
        assert_eq!(position(15, 3, 5), None);
    }

    #[test]
    fn covers_every_cell_once_with_adjacent_steps() {
        for rows in 1..=12u64 {
            for cols in 1..=12u64 {
                let mut seen = HashSet::new();
                let mut previous: Option<(u64, u64)> = None;
                for k in 0..rows * cols {
                    let cell = position(k, rows, cols).expect("inside grid");
                    assert!(cell.0 >= 1 && cell.0 <= cols && cell.1 >= 1 && cell.1 <= rows);
                    assert!(seen.insert(cell), "{rows}x{cols} revisits {cell:?}");
                    if let Some(prev) = previous {
                        let step = prev.0.abs_diff(cell.0) + prev.1.abs_diff(cell.1);
                        assert_eq!(step, 1, "{rows}x{cols} jumps at step {k}");
                    }
                    assert_eq!(index(cell.0, cell.1, rows, cols), Some(k));
                    previous = Some(cell);
                }
                assert_eq!(seen.len() as u64, rows * cols);
            }
        }
    }

    #[test]
    fn ends_in_top_left_corner() {
        assert_eq!(position(4 * 7 - 1, 4, 7), Some((1, 1)));
        assert_eq!(index(1, 1, 10, 13), Some(129));
        assert_eq!(index(0, 1, 3, 3), None);
        assert_eq!(index(4, 1, 3, 3), None);
    }
}
