use crate::{Coords, TermInt};
use Direction::*;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Direction {
    /// +x
    #[default]
    Right,
    /// +y
    Down,
    /// -x
    Left,
    /// -y
    Up,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Right, Down, Left, Up];

    pub fn reverse(self) -> Direction {
        match self {
            Right => Left,
            Down => Up,
            Left => Right,
            Up => Down,
        }
    }

    pub fn delta(self) -> (i32, i32) {
        match self {
            Right => (1, 0),
            Down => (0, 1),
            Left => (-1, 0),
            Up => (0, -1),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Right => 0,
            Down => 1,
            Left => 2,
            Up => 3,
        }
    }

    pub fn from_u8(raw: u8) -> Option<Direction> {
        Direction::ALL.get(raw as usize).copied()
    }
}

/// What a cell holds, derived from its two flags.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CellKind {
    Empty,
    Food,
    Body,
    FedBody,
}

/// A body cell remembers the heading the snake had when this cell was the
/// head, so stepping along it from the tail walks toward the head.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Cell {
    pub direction: Direction,
    pub is_body: bool,
    pub is_food: bool,
}

impl Cell {
    pub const EMPTY: Cell = Cell { direction: Right, is_body: false, is_food: false };

    pub fn new(direction: Direction, is_body: bool, is_food: bool) -> Self {
        Cell { direction, is_body, is_food }
    }

    pub fn body(direction: Direction) -> Self {
        Cell::new(direction, true, false)
    }

    pub fn kind(&self) -> CellKind {
        match (self.is_body, self.is_food) {
            (false, false) => CellKind::Empty,
            (false, true) => CellKind::Food,
            (true, false) => CellKind::Body,
            (true, true) => CellKind::FedBody,
        }
    }
}

/// Fixed-size toroidal board, stored row-major.
pub struct Grid {
    width: TermInt,
    height: TermInt,
    cells: Vec<Cell>,
}

impl Grid {
    pub fn new(width: TermInt, height: TermInt) -> Self {
        let cells = vec![Cell::EMPTY; width as usize * height as usize];
        Grid { width, height, cells }
    }

    pub fn width(&self) -> TermInt {
        self.width
    }

    pub fn height(&self) -> TermInt {
        self.height
    }

    pub fn area(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, pos: Coords) -> &Cell {
        &self.cells[self.index(pos)]
    }

    pub fn cell_mut(&mut self, pos: Coords) -> &mut Cell {
        let i = self.index(pos);
        &mut self.cells[i]
    }

    /// One step from `pos` along `dir`, wrapping on both axes.
    pub fn step(&self, pos: Coords, dir: Direction) -> Coords {
        let (dx, dy) = dir.delta();
        let x = (pos.0 as i32 + dx).rem_euclid(self.width as i32);
        let y = (pos.1 as i32 + dy).rem_euclid(self.height as i32);
        (x as TermInt, y as TermInt)
    }

    #[cfg(test)]
    pub fn positions(&self) -> impl Iterator<Item = Coords> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| (x, y)))
    }

    fn index(&self, pos: Coords) -> usize {
        debug_assert!(pos.0 < self.width && pos.1 < self.height, "{:?} off the grid", pos);
        self.width as usize * pos.1 as usize + pos.0 as usize
    }
}
