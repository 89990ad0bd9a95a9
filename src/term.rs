use crate::error::{GameError, Result};
use crate::render::Color;
use crate::Coords;
use std::{
    io::{self, stdout, Stdout, Write},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, style, terminal};
use tracing::{debug, error};

/// Which part of the screen a clear applies to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClearScope {
    Screen,
    Line,
}

/// The small set of drawing primitives the game needs. Every call is
/// flushed before it returns.
pub trait Canvas {
    /// Paints one grid cell; a cell is two terminal columns wide.
    fn paint_cell(&mut self, pos: Coords, color: Color) -> io::Result<()>;
    /// Moves the cursor to the start of grid cell `pos`.
    fn move_cursor(&mut self, pos: Coords) -> io::Result<()>;
    fn print(&mut self, text: &str) -> io::Result<()>;
    fn next_line(&mut self) -> io::Result<()>;
    fn clear(&mut self, scope: ClearScope) -> io::Result<()>;
    fn clear_to_end(&mut self, scope: ClearScope) -> io::Result<()>;

    fn print_lines(&mut self, lines: &[&str]) -> io::Result<()> {
        for line in lines {
            self.print(line)?;
            self.next_line()?;
        }
        Ok(())
    }
}

pub struct TermCanvas {
    stdout: Stdout,
}

impl TermCanvas {
    pub fn new() -> Self {
        TermCanvas { stdout: stdout() }
    }
}

impl Default for TermCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl Canvas for TermCanvas {
    fn paint_cell(&mut self, pos: Coords, color: Color) -> io::Result<()> {
        queue!(
            self.stdout,
            cursor::SavePosition,
            style::SetBackgroundColor(color.into()),
            cursor::MoveTo(pos.0 * 2, pos.1),
            style::Print("  "),
            style::ResetColor,
            cursor::RestorePosition
        )?;
        self.stdout.flush()
    }

    fn move_cursor(&mut self, pos: Coords) -> io::Result<()> {
        execute!(self.stdout, cursor::MoveTo(pos.0 * 2, pos.1))
    }

    fn print(&mut self, text: &str) -> io::Result<()> {
        execute!(self.stdout, style::Print(text))
    }

    fn next_line(&mut self) -> io::Result<()> {
        execute!(self.stdout, cursor::MoveToNextLine(1))
    }

    fn clear(&mut self, scope: ClearScope) -> io::Result<()> {
        let ty = match scope {
            ClearScope::Screen => ClearType::All,
            ClearScope::Line => ClearType::CurrentLine,
        };
        execute!(self.stdout, style::SetBackgroundColor(Color::Reset.into()), terminal::Clear(ty))
    }

    fn clear_to_end(&mut self, scope: ClearScope) -> io::Result<()> {
        let ty = match scope {
            ClearScope::Screen => ClearType::FromCursorDown,
            ClearScope::Line => ClearType::UntilNewLine,
        };
        execute!(self.stdout, style::SetBackgroundColor(Color::Reset.into()), terminal::Clear(ty))
    }
}

/// Owns the terminal modes the game switches on, so that every exit path
/// (normal, error, signal) can put them back exactly once.
pub struct TermSession {
    raw_mode: AtomicBool,
    alternate_screen: AtomicBool,
}

impl TermSession {
    pub fn enter() -> Result<Self> {
        let session = TermSession {
            raw_mode: AtomicBool::new(false),
            alternate_screen: AtomicBool::new(false),
        };

        let mut out = stdout();
        execute!(out, EnterAlternateScreen).map_err(GameError::Terminal)?;
        session.alternate_screen.store(true, Ordering::SeqCst);

        terminal::enable_raw_mode().map_err(GameError::Terminal)?;
        session.raw_mode.store(true, Ordering::SeqCst);

        execute!(out, cursor::Hide, cursor::DisableBlinking).map_err(GameError::Terminal)?;
        debug!("terminal session entered");
        Ok(session)
    }

    /// Tests stand in for an entered session without touching the terminal.
    #[cfg(test)]
    pub fn assume_active() -> Self {
        TermSession {
            raw_mode: AtomicBool::new(true),
            alternate_screen: AtomicBool::new(true),
        }
    }

    #[cfg(test)]
    pub fn is_active(&self) -> bool {
        self.raw_mode.load(Ordering::SeqCst) || self.alternate_screen.load(Ordering::SeqCst)
    }

    /// Restores the terminal when the returned guard goes out of scope,
    /// however the scope is left. The session itself may outlive it (the
    /// signal handler keeps a handle for the whole process).
    pub fn guard(&self) -> RestoreGuard<'_> {
        RestoreGuard(self)
    }

    /// Idempotent; safe to call from the signal handler.
    pub fn restore(&self) {
        let mut out = stdout();

        if self.raw_mode.swap(false, Ordering::SeqCst) {
            if let Err(err) = terminal::disable_raw_mode() {
                error!(?err, "failed to disable raw mode");
            }
        }

        if self.alternate_screen.swap(false, Ordering::SeqCst) {
            if let Err(err) = execute!(
                out,
                style::ResetColor,
                cursor::Show,
                cursor::EnableBlinking,
                LeaveAlternateScreen
            ) {
                error!(?err, "failed to leave alternate screen");
            }
        }
    }
}

impl Drop for TermSession {
    fn drop(&mut self) {
        self.restore();
    }
}

pub struct RestoreGuard<'a>(&'a TermSession);

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.0.restore();
    }
}

/// Source of raw keystrokes for the input thread.
pub trait KeySource {
    /// Waits up to `timeout` for one key press.
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>>;
}

pub struct TermKeys;

impl KeySource for TermKeys {
    fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }

        match event::read()? {
            Event::Key(ev) if ev.kind == KeyEventKind::Press => Ok(Some(ev)),
            _ => Ok(None),
        }
    }
}
