//! Synthetic grid generators.
//!
//! All grids are row-major, row 0 first.

/// Grid whose cells encode their own address: `col * 1000 + row`.
///
/// ```
/// use test_utils::create_index_grid;
///
/// let grid = create_index_grid(10, 5);
/// assert_eq!(grid[1], 1000.0);
/// assert_eq!(grid[10], 1.0);
/// ```
pub fn create_index_grid(width: usize, height: usize) -> Vec<f32> {
    (0..height)
        .flat_map(|row| (0..width).map(move |col| (col * 1000 + row) as f32))
        .collect()
}

pub fn create_uniform_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Dry grid with one circular rain cell.
///
/// Intensity falls off linearly from `peak` at `center` (col, row) to 0 at
/// `radius` cells.
pub fn create_rain_cell_grid(
    width: usize,
    height: usize,
    center: (usize, usize),
    radius: f32,
    peak: f32,
) -> Vec<f32> {
    let (cx, cy) = (center.0 as f32, center.1 as f32);
    (0..height)
        .flat_map(|row| {
            (0..width).map(move |col| {
                let d = (col as f32 - cx).hypot(row as f32 - cy);
                (peak * (1.0 - d / radius)).max(0.0)
            })
        })
        .collect()
}

/// Uniform grid with missing (NaN) cells at `gaps` given as (col, row).
///
/// Positions outside the grid are ignored.
pub fn create_grid_with_gaps(
    width: usize,
    height: usize,
    value: f32,
    gaps: &[(usize, usize)],
) -> Vec<f32> {
    let mut grid = create_uniform_grid(width, height, value);
    gaps.iter()
        .filter(|(col, row)| *col < width && *row < height)
        .for_each(|(col, row)| grid[row * width + col] = f32::NAN);
    grid
}
