use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{GameError, Result};
use crate::grid::Direction::{self, *};
use crate::render::Renderer;
use crate::term::{Canvas, ClearScope, KeySource};

const NO_DIRECTION: u8 = u8::MAX;
const KEY_POLL: Duration = Duration::from_millis(50);

pub const HELP_LINES: &[&str] = &[
    "wasd / hjkl: change move direction",
    "r: redraw box",
    "R: clear screen",
    "+/-: change sleep time",
    "space: pause",
    "Q: exit",
];

/// State shared between the input thread and the game loop. Each field has
/// a single writer; the loop may see a value one tick late.
#[derive(Debug)]
pub struct Control {
    finished: AtomicBool,
    interrupted: AtomicBool,
    next_direction: AtomicU8,
    tick_interval_ms: AtomicU64,
    paused: AtomicBool,
    repaint: AtomicBool,
    min_tick_interval_ms: u64,
    tick_step_ms: u64,
}

impl Control {
    pub fn new(config: &Config) -> Self {
        Control {
            finished: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            next_direction: AtomicU8::new(NO_DIRECTION),
            tick_interval_ms: AtomicU64::new(config.tick_interval_ms),
            paused: AtomicBool::new(false),
            repaint: AtomicBool::new(false),
            min_tick_interval_ms: config.min_tick_interval_ms,
            tick_step_ms: config.tick_step_ms,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Returns whether the game had already been asked to finish.
    pub fn finish(&self) -> bool {
        self.finished.swap(true, Ordering::SeqCst)
    }

    pub fn interrupt(&self) -> bool {
        self.interrupted.store(true, Ordering::SeqCst);
        self.finish()
    }

    pub fn was_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn next_direction(&self) -> Option<Direction> {
        Direction::from_u8(self.next_direction.load(Ordering::Relaxed))
    }

    pub fn steer(&self, dir: Direction) {
        self.next_direction.store(dir.to_u8(), Ordering::Relaxed);
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms())
    }

    pub fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms.load(Ordering::Relaxed)
    }

    pub fn slow_down(&self) -> u64 {
        let ms = self.tick_interval_ms().saturating_add(self.tick_step_ms);
        self.tick_interval_ms.store(ms, Ordering::Relaxed);
        ms
    }

    /// Never goes below the configured floor.
    pub fn speed_up(&self) -> u64 {
        let ms = self
            .tick_interval_ms()
            .saturating_sub(self.tick_step_ms)
            .max(self.min_tick_interval_ms);
        self.tick_interval_ms.store(ms, Ordering::Relaxed);
        ms
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn toggle_pause(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::Relaxed)
    }

    pub fn request_repaint(&self) {
        self.repaint.store(true, Ordering::Relaxed);
    }

    pub fn take_repaint(&self) -> bool {
        self.repaint.swap(false, Ordering::Relaxed)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Steer(Direction),
    TogglePause,
    SlowDown,
    SpeedUp,
    Help,
    RedrawBorder,
    ClearScreen,
    Quit,
    Interrupt,
}

/// Key bindings; anything else is ignored.
pub fn action_for(key: &KeyEvent) -> Option<Action> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::Interrupt),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Char('l') | KeyCode::Char('d') => Action::Steer(Right),
        KeyCode::Char('j') | KeyCode::Char('s') => Action::Steer(Down),
        KeyCode::Char('h') | KeyCode::Char('a') => Action::Steer(Left),
        KeyCode::Char('k') | KeyCode::Char('w') => Action::Steer(Up),
        KeyCode::Char(' ') => Action::TogglePause,
        KeyCode::Char('+') => Action::SlowDown,
        KeyCode::Char('-') => Action::SpeedUp,
        KeyCode::Char('?') => Action::Help,
        KeyCode::Char('r') => Action::RedrawBorder,
        KeyCode::Char('R') => Action::ClearScreen,
        KeyCode::Char('Q') => Action::Quit,
        KeyCode::Char('\u{3}') => Action::Interrupt,
        _ => return None,
    };
    Some(action)
}

/// Reads keys until the game finishes, or until a quit/interrupt key.
pub fn input_loop<K, C>(
    control: &Control,
    keys: &mut K,
    canvas: &Mutex<C>,
    renderer: Renderer,
) -> Result<()>
where
    K: KeySource,
    C: Canvas,
{
    while !control.is_finished() {
        let key = match keys.next_key(KEY_POLL).map_err(GameError::Input)? {
            Some(key) => key,
            None => continue,
        };
        let action = match action_for(&key) {
            Some(action) => action,
            None => continue,
        };

        debug!(?action, "key");
        match action {
            Action::Steer(dir) => control.steer(dir),
            Action::TogglePause => {
                let paused = control.toggle_pause();
                info!(paused, "pause toggled");
            }
            Action::SlowDown | Action::SpeedUp => {
                let ms = if action == Action::SlowDown {
                    control.slow_down()
                } else {
                    control.speed_up()
                };
                let line = format!("sleep_time: {}", ms);
                show_message(canvas, renderer, &[line.as_str()])?;
            }
            Action::Help => show_message(canvas, renderer, HELP_LINES)?,
            Action::RedrawBorder => {
                let mut canvas = lock(canvas);
                renderer.draw_border(&mut *canvas).map_err(GameError::Draw)?;
            }
            Action::ClearScreen => {
                let mut canvas = lock(canvas);
                canvas.clear(ClearScope::Screen).map_err(GameError::Draw)?;
                renderer.draw_border(&mut *canvas).map_err(GameError::Draw)?;
                control.request_repaint();
            }
            Action::Quit => {
                info!("quit requested");
                control.finish();
                return Ok(());
            }
            Action::Interrupt => {
                info!("interrupted from keyboard");
                control.interrupt();
                return Ok(());
            }
        }
    }

    Ok(())
}

pub fn spawn_input<K, C>(
    control: Arc<Control>,
    mut keys: K,
    canvas: Arc<Mutex<C>>,
    renderer: Renderer,
) -> Result<JoinHandle<Result<()>>>
where
    K: KeySource + Send + 'static,
    C: Canvas + Send + 'static,
{
    thread::Builder::new()
        .name("input".into())
        .spawn(move || {
            // The game cannot be steered once this thread is gone, even if
            // it unwinds.
            let _finish = FinishOnExit(&control);
            let res = input_loop(&control, &mut keys, &canvas, renderer);
            if let Err(err) = &res {
                warn!(%err, "input thread stopped");
            }
            res
        })
        .map_err(GameError::Input)
}

struct FinishOnExit<'a>(&'a Control);

impl Drop for FinishOnExit<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Replaces whatever is below the status line with `lines`.
fn show_message<C: Canvas>(canvas: &Mutex<C>, renderer: Renderer, lines: &[&str]) -> Result<()> {
    let mut canvas = lock(canvas);
    canvas.move_cursor(renderer.message_row()).map_err(GameError::Draw)?;
    canvas.clear_to_end(ClearScope::Screen).map_err(GameError::Draw)?;
    canvas.print_lines(lines).map_err(GameError::Draw)
}

/// A panic while drawing leaves the canvas usable, so poisoning is ignored.
pub fn lock<C>(canvas: &Mutex<C>) -> std::sync::MutexGuard<'_, C> {
    canvas.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::testing::{Op, RecordingCanvas, ScriptedKeys};

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn run_keys(keys: &str) -> (Control, RecordingCanvas) {
        let control = Control::new(&Config::default());
        let canvas = Mutex::new(RecordingCanvas::default());
        let mut source = ScriptedKeys(keys.chars().map(key).collect());
        input_loop(&control, &mut source, &canvas, Renderer::new(40, 30)).unwrap();
        (control, canvas.into_inner().unwrap())
    }

    #[test]
    fn movement_keys_map_to_directions() {
        for (c, dir) in [
            ('w', Up), ('a', Left), ('s', Down), ('d', Right),
            ('k', Up), ('h', Left), ('j', Down), ('l', Right),
        ] {
            assert_eq!(action_for(&key(c)), Some(Action::Steer(dir)), "key {:?}", c);
        }
    }

    #[test]
    fn unknown_keys_do_nothing() {
        assert_eq!(action_for(&key('x')), None);
        assert_eq!(action_for(&key('q')), None);
        assert_eq!(action_for(&KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)), None);
    }

    #[test]
    fn ctrl_c_interrupts() {
        let ev = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(action_for(&ev), Some(Action::Interrupt));
        assert_eq!(action_for(&key('\u{3}')), Some(Action::Interrupt));
    }

    #[test]
    fn initial_state() {
        let control = Control::new(&Config::default());
        assert!(!control.is_finished());
        assert!(!control.is_paused());
        assert_eq!(control.next_direction(), None);
        assert_eq!(control.tick_interval_ms(), 100);
    }

    #[test]
    fn interrupt_reports_earlier_finish() {
        let control = Control::new(&Config::default());
        assert!(!control.interrupt());
        assert!(control.interrupt());
        assert!(control.was_interrupted());

        let control = Control::new(&Config::default());
        assert!(!control.finish());
        assert!(control.interrupt());
    }

    #[test]
    fn interval_never_drops_below_floor() {
        let keys: String = std::iter::repeat('-').take(20).chain(std::iter::once('Q')).collect();
        let (control, canvas) = run_keys(&keys);
        assert_eq!(control.tick_interval_ms(), 20);
        assert!(canvas.text().contains("sleep_time: 20"));
    }

    #[test]
    fn plus_slows_down() {
        let (control, _) = run_keys("++Q");
        assert_eq!(control.tick_interval_ms(), 120);
    }

    #[test]
    fn last_direction_key_wins() {
        let (control, _) = run_keys("wasdjQ");
        assert_eq!(control.next_direction(), Some(Down));
    }

    #[test]
    fn space_toggles_pause() {
        let (control, _) = run_keys(" Q");
        assert!(control.is_paused());
        let (control, _) = run_keys("  Q");
        assert!(!control.is_paused());
    }

    #[test]
    fn quit_finishes_and_stops_reading() {
        let (control, _) = run_keys("Qw");
        assert!(control.is_finished());
        assert!(!control.was_interrupted());
        assert_eq!(control.next_direction(), None);
    }

    #[test]
    fn interrupt_marks_interrupted() {
        let (control, _) = run_keys("\u{3}d");
        assert!(control.is_finished());
        assert!(control.was_interrupted());
        assert_eq!(control.next_direction(), None);
    }

    #[test]
    fn help_prints_every_line() {
        let (_, canvas) = run_keys("?Q");
        for line in HELP_LINES {
            assert!(canvas.text().contains(line));
        }
    }

    #[test]
    fn full_clear_requests_repaint() {
        let (control, canvas) = run_keys("RQ");
        assert_eq!(canvas.ops[0], Op::Clear(ClearScope::Screen));
        assert!(canvas.paints().len() > 0);
        assert!(control.take_repaint());
        assert!(!control.take_repaint());
    }

    #[test]
    fn loop_returns_once_finished_elsewhere() {
        let control = Arc::new(Control::new(&Config::default()));
        let canvas = Arc::new(Mutex::new(RecordingCanvas::default()));
        let keys = ScriptedKeys(Default::default());
        let handle = spawn_input(Arc::clone(&control), keys, canvas, Renderer::new(40, 30)).unwrap();

        control.finish();
        assert!(handle.join().unwrap().is_ok());
    }

    struct PanickingKeys;

    impl KeySource for PanickingKeys {
        fn next_key(&mut self, _timeout: Duration) -> std::io::Result<Option<KeyEvent>> {
            panic!("keyboard vanished");
        }
    }

    #[test]
    fn panicking_input_thread_still_finishes_the_game() {
        let control = Arc::new(Control::new(&Config::default()));
        let canvas = Arc::new(Mutex::new(RecordingCanvas::default()));
        let handle = spawn_input(Arc::clone(&control), PanickingKeys, canvas, Renderer::new(40, 30)).unwrap();

        assert!(handle.join().is_err());
        assert!(control.is_finished());
    }
}
