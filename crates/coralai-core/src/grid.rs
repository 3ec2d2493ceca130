//! Toroidal addressing over the `(width, height, depth)` cell buffer.

use serde::{Deserialize, Serialize};

/// Moore offsets in scan order, excluding the centre cell.
const MOORE_OFFSETS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// Shape of a unified buffer; cells are stored x-major and each cell holds `depth` scalars.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridLayout {
    width: usize,
    height: usize,
    depth: usize,
}

impl GridLayout {
    #[must_use]
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Number of grid cells (`width * height`).
    #[must_use]
    pub const fn cells(&self) -> usize {
        self.width * self.height
    }

    /// Total number of scalars in the buffer.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.cells() * self.depth
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat cell index for `(x, y)` without bounds checks.
    #[inline]
    #[must_use]
    pub const fn cell(&self, x: usize, y: usize) -> usize {
        x * self.height + y
    }

    /// Inverse of [`GridLayout::cell`].
    #[inline]
    #[must_use]
    pub const fn coords(&self, cell: usize) -> (usize, usize) {
        (cell / self.height, cell % self.height)
    }

    /// Buffer offset of depth index `k` at `(x, y)`.
    #[inline]
    #[must_use]
    pub const fn offset(&self, x: usize, y: usize, k: usize) -> usize {
        self.cell(x, y) * self.depth + k
    }

    /// Buffer offset of depth index `k` in flat cell `cell`.
    #[inline]
    #[must_use]
    pub const fn cell_offset(&self, cell: usize, k: usize) -> usize {
        cell * self.depth + k
    }

    /// Step `(x, y)` by `(dx, dy)` with wrap-around on both axes.
    #[inline]
    #[must_use]
    pub fn wrap(&self, x: usize, y: usize, dx: isize, dy: isize) -> (usize, usize) {
        let nx = (x as isize + dx).rem_euclid(self.width as isize) as usize;
        let ny = (y as isize + dy).rem_euclid(self.height as isize) as usize;
        (nx, ny)
    }

    /// The 8 toroidal Moore neighbours of `(x, y)` as flat cell indices.
    ///
    /// On grids narrower than 3 cells the same neighbour can appear more than once.
    #[must_use]
    pub fn moore(&self, x: usize, y: usize) -> [usize; 8] {
        MOORE_OFFSETS.map(|(dx, dy)| {
            let (nx, ny) = self.wrap(x, y, dx, dy);
            self.cell(nx, ny)
        })
    }

    /// Distinct cells of the closed Moore neighbourhood (the cell itself first).
    ///
    /// Returns the buffer of candidates and how many of its leading entries are valid.
    #[must_use]
    pub fn closed_moore(&self, x: usize, y: usize) -> ([usize; 9], usize) {
        let mut cells = [self.cell(x, y); 9];
        let mut len = 1;
        for neighbour in self.moore(x, y) {
            if !cells[..len].contains(&neighbour) {
                cells[len] = neighbour;
                len += 1;
            }
        }
        (cells, len)
    }
}
