//! Arcade frame loop.
//!
//! [`GameLoop`] drives a [`Game`] at one frame per [`FRAME_MS`] on a tokio
//! task and publishes each frame as JSON. Restarting renews the loop's
//! [`TimerSlot`] before spawning the next task, so after any number of
//! restarts exactly one task advances the game.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use celesta_core::arcade::{Controls, FRAME_MS, Field, Game, HighScore};
use celesta_core::timer::{TimerSlot, TimerToken};

/// Message sent by the browser.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArcadeInput {
    /// A key went down or up.
    Key { key: String, down: bool },
    /// Click or tap: one shot.
    Fire,
    Restart,
}

/// A published frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Serialized [`Snapshot`](celesta_core::arcade::Snapshot).
    pub json: Arc<str>,
    pub score: u32,
    pub high_score: HighScore,
    pub game_over: bool,
}

/// Owns one game and the task that advances it.
pub struct GameLoop {
    game: Arc<Mutex<Game>>,
    controls: Mutex<Controls>,
    slot: TimerSlot,
    task: Mutex<Option<JoinHandle<()>>>,
    frames: Arc<watch::Sender<Frame>>,
    live: Arc<AtomicUsize>,
}

impl GameLoop {
    /// Create a game loop. Nothing runs until [`GameLoop::start`].
    #[must_use]
    pub fn new(field: Field, seed: u64, high_score: HighScore) -> Self {
        let game = Game::new(field, seed, high_score);
        let (frames, _rx) = watch::channel(render(&game));

        Self {
            game: Arc::new(Mutex::new(game)),
            controls: Mutex::new(Controls::default()),
            slot: TimerSlot::new(),
            task: Mutex::new(None),
            frames: Arc::new(frames),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Start a fresh run, cancelling any running one.
    pub fn start(&self) {
        let token = self.slot.renew();

        {
            let mut game = lock(&self.game);
            game.restart();
            self.frames.send_replace(render(&game));
        }
        *lock(&self.controls) = Controls::default();

        let handle = tokio::spawn(frame_loop(
            Arc::clone(&self.game),
            token,
            Arc::clone(&self.frames),
            LiveGuard::enter(&self.live),
        ));

        if let Some(previous) = lock(&self.task).replace(handle) {
            previous.abort();
        }
    }

    /// Same as [`GameLoop::start`].
    pub fn restart(&self) {
        self.start();
    }

    /// Stop the running loop, if any.
    pub fn stop(&self) {
        self.slot.cancel();
        if let Some(task) = lock(&self.task).take() {
            task.abort();
        }
    }

    /// Apply one browser message.
    pub fn apply(&self, input: ArcadeInput) {
        match input {
            ArcadeInput::Key { key, down } => {
                let mut controls = lock(&self.controls);
                match key.as_str() {
                    "ArrowLeft" | "a" | "A" => controls.left = down,
                    "ArrowRight" | "d" | "D" => controls.right = down,
                    " " | "Space" | "ArrowUp" => controls.fire = down,
                    _ => return,
                }
                lock(&self.game).set_controls(*controls);
            }
            ArcadeInput::Fire => lock(&self.game).fire(),
            ArcadeInput::Restart => self.restart(),
        }
    }

    /// Watch published frames.
    #[must_use]
    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.subscribe()
    }

    #[must_use]
    pub fn high_score(&self) -> HighScore {
        lock(&self.game).high_score()
    }

    /// Number of frame tasks currently running.
    #[must_use]
    pub fn live_loops(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

impl Drop for GameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn render(game: &Game) -> Frame {
    let json = serde_json::to_string(&game.snapshot()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to serialize arcade frame");
        String::from("{}")
    });

    Frame {
        json: json.into(),
        score: game.score(),
        high_score: HighScore(game.high_score().0.max(game.score())),
        game_over: game.is_over(),
    }
}

/// Counts running frame tasks; decrements when the task ends or is aborted.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(live: &Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::AcqRel);
        Self(Arc::clone(live))
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

async fn frame_loop(
    game: Arc<Mutex<Game>>,
    token: TimerToken,
    frames: Arc<watch::Sender<Frame>>,
    _live: LiveGuard,
) {
    let started = Instant::now();
    let mut interval = tokio::time::interval(Duration::from_millis(FRAME_MS));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        if !token.is_live() {
            return;
        }

        let now_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let (report, frame) = {
            let mut game = lock(&game);
            let report = game.tick(now_ms);
            (report, report.advanced.then(|| render(&game)))
        };

        if let Some(frame) = frame {
            frames.send_if_modified(|current| {
                if !token.is_live() {
                    return false;
                }
                *current = frame;
                true
            });
        }

        if report.game_over {
            tracing::debug!(new_high_score = report.new_high_score, "Arcade run over");
            return;
        }
    }
}
