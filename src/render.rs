use std::io;

use crossterm::style;
use tracing::trace;

use crate::grid::{CellKind, Grid};
use crate::snake::{MoveResult, Snake};
use crate::term::{Canvas, ClearScope};
use crate::Coords;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Color {
    Empty,
    Food,
    Body,
    FedBody,
    Head,
    Border,
    Reset,
}

impl From<CellKind> for Color {
    fn from(kind: CellKind) -> Self {
        match kind {
            CellKind::Empty => Color::Empty,
            CellKind::Food => Color::Food,
            CellKind::Body => Color::Body,
            CellKind::FedBody => Color::FedBody,
        }
    }
}

impl From<Color> for style::Color {
    fn from(color: Color) -> Self {
        match color {
            Color::Empty | Color::Reset => style::Color::Reset,
            Color::Food => style::Color::Green,
            Color::Body => style::Color::White,
            Color::FedBody => style::Color::Cyan,
            Color::Head => style::Color::Red,
            Color::Border => style::Color::DarkYellow,
        }
    }
}

/// Turns engine state into cell repaints. The board sits at the top-left of
/// the screen with the border along its right and bottom edges.
#[derive(Copy, Clone, Debug)]
pub struct Renderer {
    width: u16,
    height: u16,
}

impl Renderer {
    pub fn new(width: u16, height: u16) -> Self {
        Renderer { width, height }
    }

    pub fn for_grid(grid: &Grid) -> Self {
        Renderer::new(grid.width(), grid.height())
    }

    /// First row below the border, used for status and messages.
    pub fn status_row(&self) -> Coords {
        (0, self.height + 1)
    }

    pub fn message_row(&self) -> Coords {
        (0, self.height + 2)
    }

    pub fn draw_border(&self, canvas: &mut impl Canvas) -> io::Result<()> {
        for x in 0..self.width {
            canvas.paint_cell((x, self.height), Color::Border)?;
        }
        for y in 0..=self.height {
            canvas.paint_cell((self.width, y), Color::Border)?;
        }
        Ok(())
    }

    /// Clears the screen and paints border, body and food from scratch.
    pub fn draw_full(&self, canvas: &mut impl Canvas, snake: &Snake) -> io::Result<()> {
        canvas.clear(ClearScope::Screen)?;
        self.draw_border(canvas)?;
        for pos in snake.body().filter(|pos| *pos != snake.head()) {
            self.paint(canvas, snake, pos)?;
        }
        canvas.paint_cell(snake.head(), Color::Head)?;
        if let Some(food) = snake.food() {
            self.paint(canvas, snake, food)?;
        }
        Ok(())
    }

    /// Repaints only the cells one tick touched. The head gets its own
    /// color and turns back into body on the next tick.
    pub fn draw_tick(
        &self,
        canvas: &mut impl Canvas,
        snake: &Snake,
        mov: &MoveResult,
    ) -> io::Result<()> {
        trace!(?mov, "render tick");

        if let Some(old_tail) = mov.old_tail {
            self.paint(canvas, snake, old_tail)?;
        }
        if mov.old_head != mov.new_head {
            self.paint(canvas, snake, mov.old_head)?;
        }
        canvas.paint_cell(mov.new_head, Color::Head)?;
        if let Some(food) = mov.new_food {
            self.paint(canvas, snake, food)?;
        }
        if mov.resync_border {
            self.draw_border(canvas)?;
        }
        Ok(())
    }

    fn paint(&self, canvas: &mut impl Canvas, snake: &Snake, pos: Coords) -> io::Result<()> {
        canvas.paint_cell(pos, snake.grid().cell(pos).kind().into())
    }
}
