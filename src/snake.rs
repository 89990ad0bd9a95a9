use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info};

use crate::config::Config;
use crate::grid::{Cell, Direction, Grid};
use crate::Coords;

/// Everything that changed during one call to [`Snake::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveResult {
    pub old_head: Coords,
    pub new_head: Coords,
    /// Cell the tail left behind, if the tail moved.
    pub old_tail: Option<Coords>,
    /// Food consumed this tick (always the new head).
    pub eaten: Option<Coords>,
    pub new_food: Option<Coords>,
    /// Periodic request to repaint the whole border.
    pub resync_border: bool,
    pub dead: bool,
}

/// The snake lives inside the grid: each body cell stores the heading it was
/// left with, so the body is walked from `tail` to `head` without a list.
pub struct Snake {
    grid: Grid,
    head: Coords,
    tail: Coords,
    direction: Direction,
    food: Option<Coords>,
    length: usize,
    score: u32,
    resync_every: u32,
    dead: bool,
    rng: StdRng,
}

impl Snake {
    pub fn new(config: &Config) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut grid = Grid::new(config.width, config.height);
        let tail = config.origin;
        let mut head = tail;
        *grid.cell_mut(head) = Cell::body(Direction::Right);
        for _ in 1..config.initial_length {
            head = grid.step(head, Direction::Right);
            *grid.cell_mut(head) = Cell::body(Direction::Right);
        }

        let mut snake = Snake {
            grid,
            head,
            tail,
            direction: Direction::Right,
            food: None,
            length: config.initial_length as usize,
            score: 0,
            resync_every: config.resync_every,
            dead: false,
            rng,
        };
        snake.food = snake.spawn_food();
        snake
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn head(&self) -> Coords {
        self.head
    }

    #[cfg(test)]
    pub fn tail(&self) -> Coords {
        self.tail
    }

    pub fn food(&self) -> Option<Coords> {
        self.food
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn get_direction(&self) -> Direction {
        self.direction
    }

    /// Reversing onto the neck is ignored.
    pub fn set_direction(&mut self, new_direction: Direction) {
        if new_direction != self.direction.reverse() {
            self.direction = new_direction;
        }
    }

    /// Body cells from tail to head, following the stored headings.
    pub fn body(&self) -> impl Iterator<Item = Coords> + '_ {
        let head = self.head;
        let mut next = Some(self.tail);
        let mut budget = self.grid.area();

        std::iter::from_fn(move || {
            let pos = next?;
            budget = budget.checked_sub(1)?;
            next = if pos == head {
                None
            } else {
                Some(self.grid.step(pos, self.grid.cell(pos).direction))
            };
            Some(pos)
        })
    }

    /// One game tick. `requested` is applied first unless it is a reversal.
    pub fn advance(&mut self, requested: Option<Direction>) -> MoveResult {
        if let Some(dir) = requested {
            self.set_direction(dir);
        }

        let old_head = self.head;
        let new_head = self.grid.step(old_head, self.direction);
        *self.grid.cell_mut(old_head) = Cell::body(self.direction);

        let grew = self.grid.cell(new_head).is_food;
        let mut result = MoveResult {
            old_head,
            new_head,
            old_tail: None,
            eaten: None,
            new_food: None,
            resync_border: false,
            dead: false,
        };

        if grew {
            self.grid.cell_mut(new_head).is_food = false;
            self.food = None;
            self.score += 1;
            self.length += 1;
            result.eaten = Some(new_head);
            debug!(score = self.score, pos = ?new_head, "food eaten");
        }

        // The tail cell is vacated this tick unless the snake grows.
        if self.grid.cell(new_head).is_body && (grew || new_head != self.tail) {
            self.head = new_head;
            self.dead = true;
            result.dead = true;
            info!(score = self.score, length = self.length, pos = ?new_head, "snake bit itself");
            return result;
        }

        self.head = new_head;

        if !grew {
            let old_tail = self.tail;
            let tail_dir = self.grid.cell(old_tail).direction;
            self.tail = self.grid.step(old_tail, tail_dir);
            *self.grid.cell_mut(old_tail) = Cell::EMPTY;
            result.old_tail = Some(old_tail);
        }

        *self.grid.cell_mut(new_head) = Cell::body(self.direction);

        if grew {
            self.food = self.spawn_food();
            result.new_food = self.food;
            if self.score % self.resync_every == 0 {
                debug!(score = self.score, "periodic border resync");
                result.resync_border = true;
            }
        }

        result
    }

    /// Rejection-samples a free cell; gives up only when the board is full.
    fn spawn_food(&mut self) -> Option<Coords> {
        if self.length >= self.grid.area() {
            info!(length = self.length, "board is full, no room for food");
            return None;
        }

        let (width, height) = (self.grid.width(), self.grid.height());
        loop {
            let pos = (self.rng.gen_range(0..width), self.rng.gen_range(0..height));
            let cell = self.grid.cell_mut(pos);
            if !cell.is_body {
                cell.is_food = true;
                return Some(pos);
            }
        }
    }

    /// Moves the single food item to `pos`.
    #[cfg(test)]
    pub fn place_food_at(&mut self, pos: Coords) {
        if let Some(old) = self.food.take() {
            self.grid.cell_mut(old).is_food = false;
        }
        assert!(!self.grid.cell(pos).is_body, "food on body at {:?}", pos);
        self.grid.cell_mut(pos).is_food = true;
        self.food = Some(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::*;

    fn snake() -> Snake {
        let config = Config { seed: Some(7), ..Config::default() };
        let mut snake = Snake::new(&config);
        // Keep food well away from the paths used below.
        snake.place_food_at((20, 20));
        snake
    }

    fn assert_threaded(snake: &Snake) {
        let body: Vec<Coords> = snake.body().collect();
        assert_eq!(body.len(), snake.len(), "body {:?}", body);
        assert_eq!(body.first(), Some(&snake.tail()));
        assert_eq!(body.last(), Some(&snake.head()));

        let mut seen = body.clone();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), body.len(), "revisited a cell: {:?}", body);

        let marked = snake.grid().positions().filter(|p| snake.grid().cell(*p).is_body).count();
        assert_eq!(marked, snake.len());
    }

    fn food_cells(snake: &Snake) -> Vec<Coords> {
        snake.grid().positions().filter(|p| snake.grid().cell(*p).is_food).collect()
    }

    #[test]
    fn starts_as_three_cells_heading_right() {
        let snake = Snake::new(&Config { seed: Some(1), ..Config::default() });
        assert_eq!(snake.tail(), (0, 0));
        assert_eq!(snake.head(), (2, 0));
        assert_eq!(snake.get_direction(), Right);
        assert_eq!(snake.body().collect::<Vec<_>>(), vec![(0, 0), (1, 0), (2, 0)]);
        assert_eq!(food_cells(&snake), vec![snake.food().unwrap()]);
        assert_threaded(&snake);
    }

    #[test]
    fn three_plain_moves_keep_length() {
        let mut snake = snake();
        for _ in 0..3 {
            let res = snake.advance(Some(Right));
            assert!(!res.dead);
            assert_threaded(&snake);
        }
        assert_eq!(snake.head(), (5, 0));
        assert_eq!(snake.tail(), (3, 0));
        assert_eq!(snake.len(), 3);
    }

    #[test]
    fn plain_move_advances_tail_one_step() {
        let mut snake = snake();
        let res = snake.advance(None);
        assert_eq!(res.old_tail, Some((0, 0)));
        assert_eq!(snake.tail(), (1, 0));
        assert_eq!(*snake.grid().cell((0, 0)), Cell::EMPTY);
        assert_eq!(res.eaten, None);
        assert_eq!(res.new_food, None);
    }

    #[test]
    fn reversal_is_ignored() {
        let mut snake = snake();
        let res = snake.advance(Some(Left));
        assert!(!res.dead);
        assert_eq!(snake.get_direction(), Right);
        assert_eq!(snake.head(), (3, 0));
    }

    #[test]
    fn eating_grows_and_keeps_tail() {
        let mut snake = snake();
        snake.place_food_at((3, 0));

        let res = snake.advance(None);
        assert_eq!(res.eaten, Some((3, 0)));
        assert_eq!(res.old_tail, None);
        assert_eq!(snake.tail(), (0, 0));
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.score(), 1);
        assert_threaded(&snake);

        let food = res.new_food.expect("food respawns");
        assert_eq!(snake.food(), Some(food));
        assert!(!snake.grid().cell(food).is_body);
        assert_eq!(food_cells(&snake), vec![food]);
    }

    #[test]
    fn food_right_ahead_after_eating_is_legal() {
        let mut snake = snake();
        snake.place_food_at((3, 0));
        snake.advance(None);
        snake.place_food_at((4, 0));
        let res = snake.advance(None);
        assert!(!res.dead);
        assert_eq!(snake.len(), 5);
        assert_eq!(snake.score(), 2);
        assert_threaded(&snake);
    }

    #[test]
    fn food_never_lands_on_body() {
        let config = Config { width: 6, height: 2, seed: Some(99), ..Config::default() };
        let mut snake = Snake::new(&config);
        for _ in 0..200 {
            if snake.is_dead() || snake.food().is_none() {
                break;
            }
            let food = snake.food().unwrap();
            assert!(!snake.grid().cell(food).is_body);
            assert_eq!(food_cells(&snake).len(), 1);
            snake.advance(Some(if snake.head().1 == 0 { Down } else { Right }));
        }
    }

    #[test]
    fn steering_into_own_body_kills() {
        let mut snake = snake();
        snake.place_food_at((3, 0));
        snake.advance(None);
        snake.place_food_at((4, 0));
        snake.advance(None);
        snake.place_food_at((20, 20));
        assert_eq!(snake.len(), 5);

        assert!(!snake.advance(Some(Down)).dead);
        assert!(!snake.advance(Some(Left)).dead);
        let score = snake.score();

        let res = snake.advance(Some(Up));
        assert!(res.dead);
        assert!(snake.is_dead());
        assert_eq!(snake.head(), (3, 0));
        assert_eq!(snake.score(), score);
    }

    #[test]
    fn chasing_the_tail_is_legal() {
        // A snake filling a whole row follows its own tail around the torus.
        let config = Config { width: 4, height: 1, initial_length: 3, seed: Some(3), ..Config::default() };
        let mut snake = Snake::new(&config);
        assert_eq!(snake.food(), Some((3, 0)));

        snake.advance(None);
        assert_eq!(snake.len(), 4);
        assert_eq!(snake.food(), None);

        for _ in 0..8 {
            let res = snake.advance(None);
            assert!(!res.dead);
            assert_threaded(&snake);
        }
    }

    #[test]
    fn wraps_at_right_edge() {
        let config = Config { origin: (36, 4), seed: Some(5), ..Config::default() };
        let mut snake = Snake::new(&config);
        snake.place_food_at((20, 20));
        assert_eq!(snake.head(), (38, 4));

        snake.advance(None);
        assert_eq!(snake.head(), (39, 4));
        snake.advance(None);
        assert_eq!(snake.head(), (0, 4));
        assert_threaded(&snake);
    }

    #[test]
    fn border_resync_every_third_food() {
        let mut snake = snake();
        let mut resyncs = vec![];
        for x in 3..9 {
            snake.place_food_at((x, 0));
            resyncs.push(snake.advance(None).resync_border);
        }
        assert_eq!(resyncs, vec![false, false, true, false, false, true]);
    }

    #[test]
    fn long_random_walk_keeps_body_threaded() {
        let config = Config { width: 12, height: 9, seed: Some(42), ..Config::default() };
        let mut snake = Snake::new(&config);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..500 {
            let dir = Direction::ALL[rng.gen_range(0..4)];
            let before = snake.len();
            let res = snake.advance(Some(dir));
            if res.dead {
                break;
            }
            if res.eaten.is_some() {
                assert_eq!(snake.len(), before + 1);
            } else {
                assert_eq!(snake.len(), before);
            }
            assert_threaded(&snake);
        }
    }
}
