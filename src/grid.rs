//! Structured 3D grid geometry.
//!
//! Cells are stored level-major: `flat = level·size2d + row·size1d + col`, so the column
//! index varies fastest. The six stencil neighbours of a cell lie at offsets `±1`
//! (columns), `±size1d` (rows) and `±size2d` (levels).

use crate::error::StencilError;
use bitflags::bitflags;
use std::fmt;

/// Grid axis, ordered from the fastest to the slowest varying index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Col,
    Row,
    Level,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::Col, Axis::Row, Axis::Level];

    /// Position of this axis in per-axis arrays.
    pub fn index(self) -> usize {
        match self {
            Axis::Col => 0,
            Axis::Row => 1,
            Axis::Level => 2,
        }
    }

    /// Direction towards the neighbour with the smaller index along this axis.
    pub fn lower(self) -> Direction {
        match self {
            Axis::Col => Direction::ColLower,
            Axis::Row => Direction::RowLower,
            Axis::Level => Direction::LevelLower,
        }
    }

    pub fn upper(self) -> Direction {
        match self {
            Axis::Col => Direction::ColUpper,
            Axis::Row => Direction::RowUpper,
            Axis::Level => Direction::LevelUpper,
        }
    }
}

/// One of the six neighbour directions of the 7-point stencil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    LevelLower,
    RowLower,
    ColLower,
    ColUpper,
    RowUpper,
    LevelUpper,
}

impl Direction {
    /// All directions in stencil order (lowest flat offset first).
    pub const ALL: [Direction; 6] = [
        Direction::LevelLower,
        Direction::RowLower,
        Direction::ColLower,
        Direction::ColUpper,
        Direction::RowUpper,
        Direction::LevelUpper,
    ];

    pub fn axis(self) -> Axis {
        match self {
            Direction::ColLower | Direction::ColUpper => Axis::Col,
            Direction::RowLower | Direction::RowUpper => Axis::Row,
            Direction::LevelLower | Direction::LevelUpper => Axis::Level,
        }
    }

    pub fn is_upper(self) -> bool {
        matches!(self, Direction::ColUpper | Direction::RowUpper | Direction::LevelUpper)
    }

    /// The boundary face a cell touches when it has no neighbour in this direction.
    pub fn face(self) -> Faces {
        match self {
            Direction::LevelLower => Faces::LEVEL_LOWER,
            Direction::RowLower => Faces::ROW_LOWER,
            Direction::ColLower => Faces::COL_LOWER,
            Direction::ColUpper => Faces::COL_UPPER,
            Direction::RowUpper => Faces::ROW_UPPER,
            Direction::LevelUpper => Faces::LEVEL_UPPER,
        }
    }
}

bitflags! {
    /// Set of domain faces a cell lies on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Faces: u8 {
        const LEVEL_LOWER = 1 << 0;
        const ROW_LOWER   = 1 << 1;
        const COL_LOWER   = 1 << 2;
        const COL_UPPER   = 1 << 3;
        const ROW_UPPER   = 1 << 4;
        const LEVEL_UPPER = 1 << 5;
    }
}

/// Immutable grid dimensions `(cols, rows, levels)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Grid {
    cols: usize,
    rows: usize,
    levels: usize,
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.cols, self.rows, self.levels)
    }
}

impl Grid {
    /// Build a grid; every dimension must be at least 2 so interior cells have neighbours.
    pub fn new(cols: usize, rows: usize, levels: usize) -> Result<Self, StencilError> {
        let invalid = StencilError::InvalidGrid { cols, rows, levels };
        if cols < 2 || rows < 2 || levels < 2 {
            return Err(invalid);
        }
        // size3d must be addressable
        cols.checked_mul(rows)
            .and_then(|s| s.checked_mul(levels))
            .ok_or(invalid)?;
        Ok(Self { cols, rows, levels })
    }

    /// An `n × n × n` cube.
    pub fn cube(n: usize) -> Result<Self, StencilError> {
        Self::new(n, n, n)
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn levels(&self) -> usize {
        self.levels
    }

    pub fn size1d(&self) -> usize {
        self.cols
    }

    pub fn size2d(&self) -> usize {
        self.cols * self.rows
    }

    pub fn size3d(&self) -> usize {
        self.cols * self.rows * self.levels
    }

    /// Flat distance between neighbours along `axis`.
    pub fn stride(&self, axis: Axis) -> usize {
        match axis {
            Axis::Col => 1,
            Axis::Row => self.size1d(),
            Axis::Level => self.size2d(),
        }
    }

    /// Number of cells along `axis`.
    pub fn extent(&self, axis: Axis) -> usize {
        match axis {
            Axis::Col => self.cols,
            Axis::Row => self.rows,
            Axis::Level => self.levels,
        }
    }

    pub fn index(&self, col: usize, row: usize, level: usize) -> usize {
        debug_assert!(col < self.cols && row < self.rows && level < self.levels);
        level * self.size2d() + row * self.size1d() + col
    }

    /// Inverse of [`Grid::index`]: `(col, row, level)`.
    pub fn coords(&self, flat: usize) -> (usize, usize, usize) {
        debug_assert!(flat < self.size3d());
        let level = flat / self.size2d();
        let rem = flat % self.size2d();
        (rem % self.size1d(), rem / self.size1d(), level)
    }

    fn coord(&self, flat: usize, axis: Axis) -> usize {
        let (col, row, level) = self.coords(flat);
        match axis {
            Axis::Col => col,
            Axis::Row => row,
            Axis::Level => level,
        }
    }

    /// Flat index of the neighbour of `flat` in direction `dir`, if it lies inside the grid.
    pub fn neighbor(&self, flat: usize, dir: Direction) -> Option<usize> {
        let axis = dir.axis();
        let c = self.coord(flat, axis);
        let stride = self.stride(axis);
        if dir.is_upper() {
            (c + 1 < self.extent(axis)).then(|| flat + stride)
        } else {
            (c > 0).then(|| flat - stride)
        }
    }

    /// Valid neighbours of `flat` (between three and six of them).
    pub fn neighbors(&self, flat: usize) -> impl Iterator<Item = (Direction, usize)> + '_ {
        Direction::ALL
            .into_iter()
            .filter_map(move |dir| self.neighbor(flat, dir).map(|j| (dir, j)))
    }

    /// Domain faces `flat` lies on; empty for interior cells.
    pub fn boundary_faces(&self, flat: usize) -> Faces {
        Direction::ALL
            .into_iter()
            .filter(|&dir| self.neighbor(flat, dir).is_none())
            .fold(Faces::empty(), |acc, dir| acc | dir.face())
    }

    pub fn is_boundary(&self, flat: usize) -> bool {
        !self.boundary_faces(flat).is_empty()
    }
}
