//! Space shooter hidden behind the sponsor wall.
//!
//! A fixed-step simulation: the driver calls [`Game::tick`] with the number of
//! milliseconds since the game started, and the game advances at most one
//! frame per [`FRAME_MS`]. All randomness comes from a seeded [`StdRng`] owned
//! by the game, so a seed and an input script fully determine a run.
//!
//! The game knows nothing about the carousel; the only state that outlives a
//! run is the [`HighScore`].

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Largest playfield.
pub const MAX_FIELD_WIDTH: f64 = 800.0;
pub const MAX_FIELD_HEIGHT: f64 = 600.0;
/// Smallest playfield, for very small viewports.
pub const MIN_FIELD_SIDE: f64 = 160.0;

pub const PLAYER_SIZE: f64 = 40.0;
/// Distance from the bottom edge to the top of the player.
pub const PLAYER_BOTTOM_OFFSET: f64 = 60.0;
/// Pixels per frame.
pub const PLAYER_SPEED: f64 = 4.0;

pub const BULLET_WIDTH: f64 = 6.0;
pub const BULLET_HEIGHT: f64 = 15.0;
/// Pixels per frame, upwards.
pub const BULLET_SPEED: f64 = 5.0;
/// Minimum gap between auto-fired shots.
pub const FIRE_COOLDOWN_MS: u64 = 200;

pub const ENEMY_SIZE: f64 = 35.0;
pub const ENEMY_KINDS: u8 = 3;
const ENEMY_SPAWN_Y: f64 = -40.0;
const ENEMY_SPAWN_MARGIN: f64 = 40.0;

/// Frames closer together than this are skipped.
pub const FRAME_MS: u64 = 16;
/// Points per enemy shot down.
pub const HIT_POINTS: u32 = 10;

/// Milliseconds between enemy spawns at a given score.
///
/// Starts at 2000 and shrinks by 1.5 ms per point, never below 800.
#[must_use]
pub fn spawn_interval_ms(score: u32) -> f64 {
    (2000.0 - f64::from(score) * 1.5).max(800.0)
}

/// Axis-aligned rectangle in playfield pixels. `y` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Strict overlap; touching edges do not collide.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }
}

/// Playfield dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub width: f64,
    pub height: f64,
}

impl Field {
    /// Fit the field inside a browser viewport, leaving room for the
    /// overlay's title and buttons.
    #[must_use]
    pub fn fit(viewport_width: f64, viewport_height: f64) -> Self {
        Self {
            width: (viewport_width - 40.0).clamp(MIN_FIELD_SIDE, MAX_FIELD_WIDTH),
            height: (viewport_height - 200.0).clamp(MIN_FIELD_SIDE, MAX_FIELD_HEIGHT),
        }
    }
}

impl Default for Field {
    fn default() -> Self {
        Self {
            width: MAX_FIELD_WIDTH,
            height: MAX_FIELD_HEIGHT,
        }
    }
}

/// A descending enemy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Enemy {
    #[serde(flatten)]
    pub rect: Rect,
    /// Pixels per frame.
    pub speed: f64,
    /// Sprite variant, `0..ENEMY_KINDS`.
    pub kind: u8,
}

/// Keys currently held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controls {
    pub left: bool,
    pub right: bool,
    pub fire: bool,
}

/// Best score seen by this visitor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HighScore(pub u32);

impl HighScore {
    /// Keep `score` if it beats the current best. Returns whether it did.
    pub const fn record(&mut self, score: u32) -> bool {
        if score > self.0 {
            self.0 = score;
            true
        } else {
            false
        }
    }
}

/// Result of one call to [`Game::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// False when the frame was skipped by the frame cap or the game is over.
    pub advanced: bool,
    pub hits: u32,
    /// Set on the frame the player was hit.
    pub game_over: bool,
    /// Set when that game over beat the high score.
    pub new_high_score: bool,
}

/// Serializable view of a frame, sent to the browser for drawing.
#[derive(Debug, Serialize)]
pub struct Snapshot<'a> {
    pub field: Field,
    pub player: &'a Rect,
    pub bullets: &'a [Rect],
    pub enemies: &'a [Enemy],
    pub score: u32,
    pub high_score: u32,
    pub game_over: bool,
}

/// One run of the shooter.
#[derive(Debug, Clone)]
pub struct Game {
    field: Field,
    player: Rect,
    bullets: Vec<Rect>,
    enemies: Vec<Enemy>,
    controls: Controls,
    score: u32,
    high_score: HighScore,
    over: bool,
    last_frame_ms: u64,
    last_shot_ms: u64,
    last_spawn_ms: u64,
    rng: StdRng,
}

impl Game {
    /// Start a game on `field`, seeded with `seed`.
    #[must_use]
    pub fn new(field: Field, seed: u64, high_score: HighScore) -> Self {
        Self {
            field,
            player: Self::starting_player(field),
            bullets: Vec::new(),
            enemies: Vec::new(),
            controls: Controls::default(),
            score: 0,
            high_score,
            over: false,
            last_frame_ms: 0,
            last_shot_ms: 0,
            last_spawn_ms: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn starting_player(field: Field) -> Rect {
        Rect::new(
            field.width / 2.0 - PLAYER_SIZE / 2.0,
            field.height - PLAYER_BOTTOM_OFFSET,
            PLAYER_SIZE,
            PLAYER_SIZE,
        )
    }

    /// Clear every transient value for a new run.
    ///
    /// Keeps the field, the high score and the random stream. The driver's
    /// clock restarts at zero along with the frame, shot and spawn timers.
    pub fn restart(&mut self) {
        self.player = Self::starting_player(self.field);
        self.bullets.clear();
        self.enemies.clear();
        self.controls = Controls::default();
        self.score = 0;
        self.over = false;
        self.last_frame_ms = 0;
        self.last_shot_ms = 0;
        self.last_spawn_ms = 0;
    }

    /// Replace the set of held keys.
    pub const fn set_controls(&mut self, controls: Controls) {
        self.controls = controls;
    }

    /// Fire a single shot (click or tap). Not subject to the cooldown.
    pub fn fire(&mut self) {
        if !self.over {
            self.bullets.push(self.muzzle());
        }
    }

    fn muzzle(&self) -> Rect {
        Rect::new(
            self.player.x + self.player.width / 2.0 - BULLET_WIDTH / 2.0,
            self.player.y,
            BULLET_WIDTH,
            BULLET_HEIGHT,
        )
    }

    /// Advance one frame at `now_ms` milliseconds since the run started.
    pub fn tick(&mut self, now_ms: u64) -> FrameReport {
        let mut report = FrameReport::default();
        if self.over || now_ms.saturating_sub(self.last_frame_ms) < FRAME_MS {
            return report;
        }
        self.last_frame_ms = now_ms;
        report.advanced = true;

        self.move_player();

        if self.controls.fire && now_ms.saturating_sub(self.last_shot_ms) > FIRE_COOLDOWN_MS {
            self.bullets.push(self.muzzle());
            self.last_shot_ms = now_ms;
        }

        for bullet in &mut self.bullets {
            bullet.y -= BULLET_SPEED;
        }
        self.bullets.retain(|b| b.y >= -b.height);

        #[allow(clippy::cast_precision_loss)]
        let since_spawn = now_ms.saturating_sub(self.last_spawn_ms) as f64;
        if since_spawn > spawn_interval_ms(self.score) {
            self.spawn_enemy();
            self.last_spawn_ms = now_ms;
        }

        self.resolve_enemies(&mut report);
        report
    }

    fn move_player(&mut self) {
        if self.controls.left && self.player.x > 0.0 {
            self.player.x = (self.player.x - PLAYER_SPEED).max(0.0);
        }
        let right_edge = self.field.width - self.player.width;
        if self.controls.right && self.player.x < right_edge {
            self.player.x = (self.player.x + PLAYER_SPEED).min(right_edge);
        }
    }

    fn spawn_enemy(&mut self) {
        let x = self.rng.random::<f64>() * (self.field.width - ENEMY_SPAWN_MARGIN).max(0.0);
        let speed = 1.0 + self.rng.random::<f64>() * 1.5 + f64::from(self.score) / 1000.0;
        let kind = self.rng.random_range(0..ENEMY_KINDS);
        self.enemies.push(Enemy {
            rect: Rect::new(x, ENEMY_SPAWN_Y, ENEMY_SIZE, ENEMY_SIZE),
            speed,
            kind,
        });
    }

    fn resolve_enemies(&mut self, report: &mut FrameReport) {
        let mut survivors = Vec::with_capacity(self.enemies.len());

        for mut enemy in self.enemies.drain(..) {
            enemy.rect.y += enemy.speed;

            if enemy.rect.intersects(&self.player) {
                if !self.over {
                    self.over = true;
                    report.game_over = true;
                    report.new_high_score = self.high_score.record(self.score);
                }
                continue;
            }

            if let Some(pos) = self.bullets.iter().rposition(|b| enemy.rect.intersects(b)) {
                self.bullets.remove(pos);
                self.score += HIT_POINTS;
                report.hits += 1;
                continue;
            }

            if enemy.rect.y > self.field.height {
                continue;
            }

            survivors.push(enemy);
        }

        self.enemies = survivors;
    }

    #[must_use]
    pub const fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub const fn high_score(&self) -> HighScore {
        self.high_score
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.over
    }

    #[must_use]
    pub const fn field(&self) -> Field {
        self.field
    }

    #[must_use]
    pub const fn player(&self) -> &Rect {
        &self.player
    }

    #[must_use]
    pub fn bullets(&self) -> &[Rect] {
        &self.bullets
    }

    #[must_use]
    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            field: self.field,
            player: &self.player,
            bullets: &self.bullets,
            enemies: &self.enemies,
            score: self.score,
            high_score: self.high_score.0.max(self.score),
            game_over: self.over,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    fn game() -> Game {
        Game::new(Field::default(), 42, HighScore::default())
    }

    fn enemy_at(x: f64, y: f64) -> Enemy {
        Enemy {
            rect: Rect::new(x, y, ENEMY_SIZE, ENEMY_SIZE),
            speed: 1.0,
            kind: 0,
        }
    }

    #[test]
    fn test_player_starts_centered_near_bottom() {
        let g = game();
        assert_eq!(g.player().x, 380.0);
        assert_eq!(g.player().y, 540.0);
    }

    #[test]
    fn test_field_fit() {
        assert_eq!(Field::fit(1920.0, 1080.0), Field::default());
        let small = Field::fit(400.0, 700.0);
        assert_eq!(small.width, 360.0);
        assert_eq!(small.height, 500.0);
        assert_eq!(Field::fit(100.0, 100.0).width, MIN_FIELD_SIDE);
    }

    #[test]
    fn test_frame_cap() {
        let mut g = game();
        assert!(g.tick(16).advanced);
        assert!(!g.tick(31).advanced);
        assert!(g.tick(32).advanced);
    }

    #[test]
    fn test_player_moves_and_clamps() {
        let mut g = game();
        g.set_controls(Controls {
            left: true,
            ..Controls::default()
        });
        g.tick(16);
        assert_eq!(g.player().x, 376.0);

        for frame in 2..200 {
            g.tick(frame * 16);
        }
        assert_eq!(g.player().x, 0.0);
    }

    #[test]
    fn test_autofire_cooldown() {
        let mut g = game();
        g.set_controls(Controls {
            fire: true,
            ..Controls::default()
        });
        g.tick(16);
        assert_eq!(g.bullets().len(), 0, "cooldown counts from the start of the run");

        g.tick(208);
        assert_eq!(g.bullets().len(), 1);
        g.tick(400);
        assert_eq!(g.bullets().len(), 1, "200ms since last shot is not enough");
        g.tick(416);
        assert_eq!(g.bullets().len(), 2);
    }

    #[test]
    fn test_bullets_rise_and_leave() {
        let mut g = game();
        g.fire();
        let start_y = g.bullets()[0].y;
        g.tick(16);
        assert_eq!(g.bullets()[0].y, start_y - BULLET_SPEED);

        for frame in 2..200 {
            g.tick(frame * 16);
        }
        assert!(g.bullets().is_empty());
    }

    #[test]
    fn test_spawn_interval() {
        assert_eq!(spawn_interval_ms(0), 2000.0);
        assert_eq!(spawn_interval_ms(400), 1400.0);
        assert_eq!(spawn_interval_ms(800), 800.0);
        assert_eq!(spawn_interval_ms(5000), 800.0);
    }

    #[test]
    fn test_first_enemy_spawns_after_interval() {
        let mut g = game();
        g.tick(2000);
        assert!(g.enemies().is_empty());
        g.tick(2016);
        assert_eq!(g.enemies().len(), 1);

        let enemy = g.enemies()[0];
        assert!(enemy.kind < ENEMY_KINDS);
        assert!(enemy.speed >= 1.0 && enemy.speed < 2.5);
        assert!(enemy.rect.x >= 0.0 && enemy.rect.x <= MAX_FIELD_WIDTH - 40.0);
    }

    #[test]
    fn test_bullet_hit_scores() {
        let mut g = game();
        g.enemies.push(enemy_at(100.0, 100.0));
        g.bullets.push(Rect::new(110.0, 140.0, BULLET_WIDTH, BULLET_HEIGHT));

        let report = g.tick(16);

        assert_eq!(report.hits, 1);
        assert_eq!(g.score(), HIT_POINTS);
        assert!(g.enemies().is_empty());
        assert!(g.bullets().is_empty());
    }

    #[test]
    fn test_collision_ends_game_and_records_high_score() {
        let mut g = Game::new(Field::default(), 1, HighScore(5));
        g.score = 30;
        let player = *g.player();
        g.enemies.push(enemy_at(player.x, player.y - ENEMY_SIZE));

        let report = g.tick(16);

        assert!(report.game_over);
        assert!(report.new_high_score);
        assert!(g.is_over());
        assert_eq!(g.high_score(), HighScore(30));
        assert!(!g.tick(32).advanced);
    }

    #[test]
    fn test_lower_score_keeps_high_score() {
        let mut g = Game::new(Field::default(), 1, HighScore(500));
        let player = *g.player();
        g.enemies.push(enemy_at(player.x, player.y));

        let report = g.tick(16);

        assert!(report.game_over);
        assert!(!report.new_high_score);
        assert_eq!(g.high_score(), HighScore(500));
    }

    #[test]
    fn test_enemies_leaving_field_are_dropped() {
        let mut g = game();
        g.enemies.push(enemy_at(0.0, MAX_FIELD_HEIGHT));
        g.tick(16);
        assert!(g.enemies().is_empty());
        assert!(!g.is_over());
    }

    #[test]
    fn test_restart_resets_transient_state() {
        let mut g = Game::new(Field::default(), 1, HighScore(0));
        g.score = 70;
        g.fire();
        let player = *g.player();
        g.enemies.push(enemy_at(player.x, player.y));
        g.tick(16);
        assert!(g.is_over());

        g.restart();

        assert!(!g.is_over());
        assert_eq!(g.score(), 0);
        assert!(g.bullets().is_empty());
        assert!(g.enemies().is_empty());
        assert_eq!(g.player().x, 380.0);
        assert_eq!(g.high_score(), HighScore(70));
        assert!(g.tick(16).advanced);
    }

    #[test]
    fn test_fire_ignored_after_game_over() {
        let mut g = game();
        g.over = true;
        g.fire();
        assert!(g.bullets().is_empty());
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = game();
        let mut b = game();
        for frame in 1..400 {
            a.tick(frame * 16);
            b.tick(frame * 16);
        }
        assert_eq!(a.enemies(), b.enemies());
    }

    #[test]
    fn test_snapshot_serializes() {
        let g = game();
        let json = serde_json::to_value(g.snapshot()).unwrap();
        assert_eq!(json["score"], 0);
        assert_eq!(json["game_over"], false);
        assert_eq!(json["field"]["width"], 800.0);
    }
}
