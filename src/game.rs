use std::{sync::{Arc, Mutex}, thread::sleep};

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::control::{lock, spawn_input, Control};
use crate::error::{GameError, Result};
use crate::render::Renderer;
use crate::snake::Snake;
use crate::term::{Canvas, ClearScope, KeySource};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub score: u32,
    pub dead: bool,
    pub interrupted: bool,
}

/// Drives the snake at a fixed tick. Only this type touches the grid; the
/// input thread talks to it through [`Control`].
pub struct SnakeGame<C: Canvas> {
    snake: Snake,
    renderer: Renderer,
    control: Arc<Control>,
    canvas: Arc<Mutex<C>>,
}

impl<C: Canvas> SnakeGame<C> {
    pub fn new(config: &Config, control: Arc<Control>, canvas: Arc<Mutex<C>>) -> Self {
        let snake = Snake::new(config);
        let renderer = Renderer::for_grid(snake.grid());
        SnakeGame { snake, renderer, control, canvas }
    }

    pub fn renderer(&self) -> Renderer {
        self.renderer
    }

    #[cfg(test)]
    pub fn score(&self) -> u32 {
        self.snake.score()
    }

    pub fn play(&mut self) -> Result<Outcome> {
        self.repaint()?;
        info!(length = self.snake.len(), "game started");

        loop {
            if self.control.is_finished() {
                break;
            }
            if self.step()? {
                break;
            }
            self.wait()?;
        }

        let outcome = Outcome {
            score: self.snake.score(),
            dead: self.snake.is_dead(),
            interrupted: self.control.was_interrupted(),
        };
        info!(?outcome, head = ?self.snake.head(), direction = ?self.snake.get_direction(), "game over");
        Ok(outcome)
    }

    /// One tick. Returns true when the snake died.
    pub fn step(&mut self) -> Result<bool> {
        let mov = self.snake.advance(self.control.next_direction());

        let mut canvas = lock(&self.canvas);
        self.renderer.draw_tick(&mut *canvas, &self.snake, &mov).map_err(GameError::Draw)?;

        canvas.move_cursor(self.renderer.status_row()).map_err(GameError::Draw)?;
        canvas.clear_to_end(ClearScope::Line).map_err(GameError::Draw)?;
        if mov.dead {
            canvas.print("You're dead!").map_err(GameError::Draw)?;
            return Ok(true);
        }

        let status = format!("input `?` print help, score: {}", self.snake.score());
        canvas.print(&status).map_err(GameError::Draw)?;
        Ok(false)
    }

    /// Sleeps one tick, then keeps sleeping while paused.
    fn wait(&mut self) -> Result<()> {
        loop {
            sleep(self.control.tick_interval());

            if self.control.take_repaint() {
                debug!("full repaint requested");
                self.repaint()?;
            }
            if !self.control.is_paused() || self.control.is_finished() {
                return Ok(());
            }
        }
    }

    fn repaint(&mut self) -> Result<()> {
        let mut canvas = lock(&self.canvas);
        self.renderer.draw_full(&mut *canvas, &self.snake).map_err(GameError::Draw)
    }
}

/// Runs a game with `keys` read on a second thread. Death and quit both end
/// here: the input thread is told to stop and joined before returning.
pub fn play_with_input<K, C>(
    config: &Config,
    control: Arc<Control>,
    keys: K,
    canvas: Arc<Mutex<C>>,
) -> Result<Outcome>
where
    K: KeySource + Send + 'static,
    C: Canvas + Send + 'static,
{
    let mut game = SnakeGame::new(config, Arc::clone(&control), Arc::clone(&canvas));
    let input = spawn_input(Arc::clone(&control), keys, canvas, game.renderer())?;

    let played = game.play();

    control.finish();
    let input_res = input.join().map_err(|_| GameError::InputPanicked)?;

    let outcome = played?;
    if let Err(err) = input_res {
        warn!(%err, "input thread failed");
        return Err(err);
    }
    Ok(outcome)
}
