//! Live resend countdowns.
//!
//! Each [`CountdownTimer`] runs one tokio task that decrements a
//! [`Countdown`] once per second and publishes the remaining seconds on a
//! `watch` channel. Restarting renews the timer's [`TimerSlot`], aborts the
//! previous task and spawns a new one, so a timer never has two tasks
//! decrementing it.
//!
//! Timers are kept per registration challenge in a [`TimerRegistry`].

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use moka::future::Cache;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use celesta_core::countdown::Countdown;
use celesta_core::timer::{TimerSlot, TimerToken};

const TICK: Duration = Duration::from_secs(1);

/// A restartable one-second countdown.
pub struct CountdownTimer {
    initial: u32,
    slot: TimerSlot,
    remaining: Arc<watch::Sender<u32>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl CountdownTimer {
    /// Create a timer and start counting down from `initial_secs`.
    #[must_use]
    pub fn start(initial_secs: u32) -> Self {
        let timer = Self::idle(initial_secs);
        timer.run(Countdown::new(initial_secs));
        timer
    }

    /// Continue a countdown whose deadline was recorded earlier.
    #[must_use]
    pub fn resume(initial_secs: u32, deadline: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let timer = Self::idle(initial_secs);
        timer.run(Countdown::resume(initial_secs, deadline, now));
        timer
    }

    fn idle(initial_secs: u32) -> Self {
        let (tx, _rx) = watch::channel(initial_secs);
        Self {
            initial: initial_secs,
            slot: TimerSlot::new(),
            remaining: Arc::new(tx),
            task: Mutex::new(None),
        }
    }

    /// Start over from `secs`, cancelling the running countdown.
    pub fn restart(&self, secs: u32) {
        let mut countdown = Countdown::new(self.initial);
        countdown.restart(secs);
        self.run(countdown);
    }

    /// Start over from the initial duration.
    pub fn reset(&self) {
        self.run(Countdown::new(self.initial));
    }

    /// Stop ticking. The remaining value is frozen.
    pub fn stop(&self) {
        self.slot.cancel();
        if let Some(task) = self.lock_task().take() {
            task.abort();
        }
    }

    fn run(&self, countdown: Countdown) {
        let token = self.slot.renew();
        self.remaining.send_replace(countdown.time_left());

        let handle = if countdown.is_complete() {
            None
        } else {
            Some(tokio::spawn(tick_loop(
                countdown,
                token,
                Arc::clone(&self.remaining),
            )))
        };

        if let Some(previous) = std::mem::replace(&mut *self.lock_task(), handle) {
            previous.abort();
        }
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Seconds left.
    #[must_use]
    pub fn time_left(&self) -> u32 {
        *self.remaining.borrow()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.time_left() == 0
    }

    /// Watch the remaining seconds.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.subscribe()
    }

    /// Remaining seconds as a stream that ends after yielding zero.
    pub fn stream(&self) -> impl Stream<Item = u32> + Send + 'static {
        let mut rx = self.subscribe();
        async_stream::stream! {
            loop {
                let left = *rx.borrow_and_update();
                yield left;
                if left == 0 {
                    break;
                }
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn tick_loop(mut countdown: Countdown, token: TimerToken, remaining: Arc<watch::Sender<u32>>) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + TICK, TICK);

    while !countdown.is_complete() {
        interval.tick().await;
        if !token.is_live() {
            return;
        }
        let left = countdown.tick();
        // The check happens under the channel lock so a restart that raced
        // with this tick always publishes last.
        remaining.send_if_modified(|value| {
            if !token.is_live() {
                return false;
            }
            *value = left;
            true
        });
    }
}

/// Resend countdowns keyed by registration challenge.
///
/// Entries idle for ten minutes are evicted, which also stops their task.
#[derive(Clone)]
pub struct TimerRegistry {
    timers: Cache<Uuid, Arc<CountdownTimer>>,
    initial_secs: u32,
}

impl TimerRegistry {
    #[must_use]
    pub fn new(initial_secs: u32) -> Self {
        let timers = Cache::builder()
            .max_capacity(10_000)
            .time_to_idle(Duration::from_secs(600))
            .build();

        Self {
            timers,
            initial_secs,
        }
    }

    /// Length of a fresh countdown.
    #[must_use]
    pub const fn initial_secs(&self) -> u32 {
        self.initial_secs
    }

    /// Start a fresh countdown for `challenge`.
    pub async fn start(&self, challenge: Uuid) -> Arc<CountdownTimer> {
        let timer = Arc::new(CountdownTimer::start(self.initial_secs));
        self.timers.insert(challenge, Arc::clone(&timer)).await;
        timer
    }

    /// The countdown for `challenge`, rebuilt from `deadline` if it was evicted.
    pub async fn get_or_resume(
        &self,
        challenge: Uuid,
        deadline: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Arc<CountdownTimer> {
        let initial = self.initial_secs;
        self.timers
            .get_with(challenge, async move {
                Arc::new(CountdownTimer::resume(initial, deadline, now))
            })
            .await
    }

    /// Forget the countdown for `challenge`.
    pub async fn remove(&self, challenge: Uuid) {
        if let Some(timer) = self.timers.remove(&challenge).await {
            timer.stop();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use futures::StreamExt;

    use super::*;

    async fn wait(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_to_zero() {
        let timer = CountdownTimer::start(5);
        assert_eq!(timer.time_left(), 5);

        wait(2_500).await;
        assert_eq!(timer.time_left(), 3);

        wait(3_000).await;
        assert_eq!(timer.time_left(), 0);
        assert!(timer.is_complete());

        wait(2_000).await;
        assert_eq!(timer.time_left(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_mid_way_has_single_interval() {
        let timer = CountdownTimer::start(5);
        wait(2_500).await;
        assert_eq!(timer.time_left(), 3);

        timer.restart(10);
        assert_eq!(timer.time_left(), 10);

        wait(1_500).await;
        assert_eq!(timer.time_left(), 9);

        wait(3_000).await;
        assert_eq!(timer.time_left(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_many_restarts_single_decrement() {
        let timer = CountdownTimer::start(30);
        for _ in 0..20 {
            timer.restart(30);
        }
        wait(1_500).await;
        assert_eq!(timer.time_left(), 29);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_returns_to_initial() {
        let timer = CountdownTimer::start(3);
        wait(3_500).await;
        assert!(timer.is_complete());

        timer.reset();
        assert_eq!(timer.time_left(), 3);
        wait(1_500).await;
        assert_eq!(timer.time_left(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_is_complete_immediately() {
        let timer = CountdownTimer::start(0);
        assert!(timer.is_complete());
        let values: Vec<u32> = timer.stream().collect().await;
        assert_eq!(values, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_ends_at_zero() {
        let timer = CountdownTimer::start(3);
        let values: Vec<u32> = timer.stream().collect().await;
        assert_eq!(values, vec![3, 2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_freezes_value() {
        let timer = CountdownTimer::start(5);
        wait(1_500).await;
        timer.stop();
        wait(3_000).await;
        assert_eq!(timer.time_left(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_registry_resumes_from_deadline() {
        let registry = TimerRegistry::new(30);
        let id = Uuid::new_v4();
        let now = Utc::now();

        let timer = registry
            .get_or_resume(id, now + chrono::Duration::seconds(12), now)
            .await;
        assert_eq!(timer.time_left(), 12);

        let fresh = registry.start(id).await;
        assert_eq!(fresh.time_left(), 30);
        let again = registry
            .get_or_resume(id, now + chrono::Duration::seconds(12), now)
            .await;
        assert_eq!(again.time_left(), 30);

        registry.remove(id).await;
        assert!(fresh.time_left() == 30);
    }
}
