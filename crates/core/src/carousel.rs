//! Sponsor carousel engine.
//!
//! The sponsor wall shows a fixed list as pages of `columns x 3` cards. The
//! page index is a signed, unbounded counter; the page on screen is that
//! counter wrapped into `0..page_count` in both directions.
//!
//! All time-dependent behaviour (auto-advance, wheel debounce, long press,
//! logo taps) takes `now` from the caller so the engine stays deterministic.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Rows per page regardless of viewport.
pub const ROWS_PER_PAGE: usize = 3;
/// Viewport width assumed before the browser reports one.
pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1200;
/// Auto-advance period.
pub const AUTO_ADVANCE_MS: i64 = 1_500;
/// Minimum `|deltaY|` for a wheel event to turn the page.
pub const WHEEL_THRESHOLD: f64 = 1.0;
/// Wheel events are ignored for this long after one turns the page.
pub const WHEEL_DEBOUNCE_MS: i64 = 800;
/// Hold duration that launches the arcade.
pub const LONG_PRESS_MS: i64 = 6_000;
/// Logo taps that launch the arcade.
pub const LOGO_TAP_TARGET: u32 = 7;
/// Silence after which the tap counter resets.
pub const LOGO_TAP_RESET_MS: i64 = 2_000;
/// Length of the celebration shown before the arcade opens.
pub const CELEBRATION_MS: i64 = 3_000;

/// Grid columns for a viewport width.
#[must_use]
pub const fn columns_for_width(width: u32) -> usize {
    match width {
        0..500 => 1,
        500..768 => 2,
        768..1024 => 3,
        _ => 4,
    }
}

/// Cards per page for a column count.
#[must_use]
pub const fn page_size(columns: usize) -> usize {
    columns * ROWS_PER_PAGE
}

/// Pages needed to show `total` entries, `ceil(total / page_size)`.
#[must_use]
pub const fn page_count(total: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total.div_ceil(page_size)
}

/// Wrap a raw index into `0..page_count`.
///
/// `display_index(-1, 4) == 3`, `display_index(5, 4) == 1`. Returns 0 when
/// there are no pages.
#[must_use]
pub fn display_index(raw: i64, page_count: usize) -> usize {
    let Ok(count) = i64::try_from(page_count) else {
        return 0;
    };
    if count == 0 {
        return 0;
    }
    usize::try_from(raw.rem_euclid(count)).unwrap_or(0)
}

/// Which way the last page change went.
///
/// Stored with the index so the entering and exiting pages of one transition
/// animate from the same side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Forward,
    Backward,
}

impl Direction {
    /// Direction for the sign of a delta; `None` for zero.
    #[must_use]
    pub fn from_delta(delta: f64) -> Option<Self> {
        if delta > 0.0 {
            Some(Self::Forward)
        } else if delta < 0.0 {
            Some(Self::Backward)
        } else {
            None
        }
    }

    #[must_use]
    pub const fn step(self) -> i64 {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }

    /// CSS class for the entering page.
    #[must_use]
    pub const fn enter_class(self) -> &'static str {
        match self {
            Self::Forward => "enter-from-right",
            Self::Backward => "enter-from-left",
        }
    }
}

/// Paging state for one visitor's sponsor wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carousel {
    raw_index: i64,
    direction: Direction,
    paused: bool,
    viewport_width: u32,
    last_manual_at: Option<DateTime<Utc>>,
    wheel_locked_until: Option<DateTime<Utc>>,
}

impl Default for Carousel {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH)
    }
}

impl Carousel {
    #[must_use]
    pub const fn new(viewport_width: u32) -> Self {
        Self {
            raw_index: 0,
            direction: Direction::Forward,
            paused: false,
            viewport_width,
            last_manual_at: None,
            wheel_locked_until: None,
        }
    }

    pub const fn set_viewport_width(&mut self, width: u32) {
        self.viewport_width = width;
    }

    #[must_use]
    pub const fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    #[must_use]
    pub const fn columns(&self) -> usize {
        columns_for_width(self.viewport_width)
    }

    #[must_use]
    pub const fn page_size(&self) -> usize {
        page_size(self.columns())
    }

    #[must_use]
    pub const fn page_count(&self, total: usize) -> usize {
        page_count(total, self.page_size())
    }

    #[must_use]
    pub const fn raw_index(&self) -> i64 {
        self.raw_index
    }

    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }

    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Page currently on screen for a list of `total` entries.
    #[must_use]
    pub fn current_page(&self, total: usize) -> usize {
        display_index(self.raw_index, self.page_count(total))
    }

    /// Entries on the current page.
    #[must_use]
    pub fn visible<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let size = self.page_size();
        let start = self.current_page(items.len()) * size;
        let end = (start + size).min(items.len());
        items.get(start..end).unwrap_or_default()
    }

    /// Turn one page in `direction`. Used by the arrow buttons and logo taps.
    pub fn paginate(&mut self, direction: Direction, now: DateTime<Utc>) {
        self.step(direction);
        self.last_manual_at = Some(now);
    }

    /// Timer tick. Advances one page forward unless paused.
    ///
    /// A manual page change restarts the period, so a tick that lands within
    /// [`AUTO_ADVANCE_MS`] of one is skipped. Returns whether the page changed.
    pub fn auto_advance(&mut self, now: DateTime<Utc>) -> bool {
        if self.paused {
            return false;
        }
        if self
            .last_manual_at
            .is_some_and(|at| now - at < Duration::milliseconds(AUTO_ADVANCE_MS))
        {
            return false;
        }
        self.step(Direction::Forward);
        true
    }

    /// Pause while a pointer hovers the carousel; resume when it leaves.
    pub const fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Handle a wheel event.
    ///
    /// Events inside the debounce window, and events with `|delta_y|` at or
    /// below [`WHEEL_THRESHOLD`], are ignored. Otherwise the page turns once in
    /// the sign of `delta_y` and the window opens. Returns the direction turned.
    pub fn wheel(&mut self, delta_y: f64, now: DateTime<Utc>) -> Option<Direction> {
        if self.wheel_locked_until.is_some_and(|until| now < until) {
            return None;
        }
        if delta_y.abs() <= WHEEL_THRESHOLD {
            return None;
        }

        let direction = Direction::from_delta(delta_y)?;
        self.paginate(direction, now);
        self.wheel_locked_until = Some(now + Duration::milliseconds(WHEEL_DEBOUNCE_MS));
        Some(direction)
    }

    const fn step(&mut self, direction: Direction) {
        self.raw_index = self.raw_index.wrapping_add(direction.step());
        self.direction = direction;
    }
}

/// What a logo tap did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapOutcome {
    /// Counted, and the carousel should advance one page.
    Advance { taps: u32 },
    /// Seventh tap: launch the arcade.
    Launch,
}

/// Counter for rapid taps on the festival logo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoTaps {
    count: u32,
    last_tap_at: Option<DateTime<Utc>>,
}

impl LogoTaps {
    /// Register a tap at `now`.
    ///
    /// The counter resets when more than [`LOGO_TAP_RESET_MS`] passed since
    /// the previous tap, and after a launch.
    pub fn tap(&mut self, now: DateTime<Utc>) -> TapOutcome {
        if self
            .last_tap_at
            .is_some_and(|at| now - at >= Duration::milliseconds(LOGO_TAP_RESET_MS))
        {
            self.count = 0;
        }

        self.count += 1;
        self.last_tap_at = Some(now);

        if self.count >= LOGO_TAP_TARGET {
            self.count = 0;
            self.last_tap_at = None;
            TapOutcome::Launch
        } else {
            TapOutcome::Advance { taps: self.count }
        }
    }

    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }
}

/// Press-and-hold detector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongPress {
    started_at: Option<DateTime<Utc>>,
}

impl LongPress {
    /// Pointer went down. Restarts any press in progress.
    pub const fn start(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
    }

    /// Pointer went up or left the page.
    pub const fn cancel(&mut self) {
        self.started_at = None;
    }

    /// Whether the press in progress has been held long enough.
    ///
    /// Fires at most once per press: a positive answer ends the press.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        let held = self
            .started_at
            .is_some_and(|at| now - at >= Duration::milliseconds(LONG_PRESS_MS));
        if held {
            self.started_at = None;
        }
        held
    }

    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.started_at.is_some()
    }
}

/// What the sponsor page overlay is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayPhase {
    Hidden,
    Celebrating,
    Arcade,
}

/// Hidden arcade trigger: logo taps or a long press, then a short celebration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EasterEgg {
    pub taps: LogoTaps,
    pub press: LongPress,
    launched_at: Option<DateTime<Utc>>,
}

impl EasterEgg {
    /// Start the celebration. Relaunching while already shown is a no-op.
    pub fn launch(&mut self, now: DateTime<Utc>) {
        if self.launched_at.is_none() {
            self.launched_at = Some(now);
        }
    }

    /// Close the overlay.
    pub const fn close(&mut self) {
        self.launched_at = None;
    }

    #[must_use]
    pub fn phase(&self, now: DateTime<Utc>) -> OverlayPhase {
        match self.launched_at {
            None => OverlayPhase::Hidden,
            Some(at) if now - at < Duration::milliseconds(CELEBRATION_MS) => {
                OverlayPhase::Celebrating
            }
            Some(_) => OverlayPhase::Arcade,
        }
    }
}

/// Everything the sponsor page keeps per visitor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorWall {
    pub carousel: Carousel,
    pub egg: EasterEgg,
}

impl SponsorWall {
    /// Apply a logo tap: advance the carousel or launch the arcade.
    pub fn tap_logo(&mut self, now: DateTime<Utc>) -> TapOutcome {
        let outcome = self.egg.taps.tap(now);
        match outcome {
            TapOutcome::Advance { .. } => self.carousel.paginate(Direction::Forward, now),
            TapOutcome::Launch => self.egg.launch(now),
        }
        outcome
    }

    /// Check a press in progress; launches the arcade once it has been held long enough.
    pub fn poll_press(&mut self, now: DateTime<Utc>) -> bool {
        let fired = self.egg.press.poll(now);
        if fired {
            self.egg.launch(now);
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + Duration::milliseconds(ms)
    }

    #[test]
    fn test_columns_breakpoints() {
        assert_eq!(columns_for_width(320), 1);
        assert_eq!(columns_for_width(499), 1);
        assert_eq!(columns_for_width(500), 2);
        assert_eq!(columns_for_width(767), 2);
        assert_eq!(columns_for_width(768), 3);
        assert_eq!(columns_for_width(1023), 3);
        assert_eq!(columns_for_width(1024), 4);
        assert_eq!(columns_for_width(2560), 4);
    }

    #[test]
    fn test_forty_seven_sponsors_four_columns() {
        let size = page_size(4);
        assert_eq!(size, 12);
        assert_eq!(page_count(47, size), 4);
    }

    #[test]
    fn test_page_count_other_widths() {
        assert_eq!(page_count(47, page_size(1)), 16);
        assert_eq!(page_count(47, page_size(2)), 8);
        assert_eq!(page_count(47, page_size(3)), 6);
        assert_eq!(page_count(0, page_size(3)), 0);
    }

    #[test]
    fn test_display_index_wraps_both_ways() {
        assert_eq!(display_index(-1, 4), 3);
        assert_eq!(display_index(5, 4), 1);
        assert_eq!(display_index(0, 4), 0);
        assert_eq!(display_index(-8, 4), 0);
        assert_eq!(display_index(-9, 4), 3);
        assert_eq!(display_index(3, 0), 0);
    }

    #[test]
    fn test_previous_from_first_page_is_last() {
        let mut carousel = Carousel::new(1200);
        carousel.paginate(Direction::Backward, at(0));
        assert_eq!(carousel.current_page(47), 3);
        assert_eq!(carousel.direction(), Direction::Backward);
    }

    #[test]
    fn test_visible_last_page_is_partial() {
        let items: Vec<u32> = (0..47).collect();
        let mut carousel = Carousel::new(1200);
        carousel.paginate(Direction::Backward, at(0));
        assert_eq!(carousel.visible(&items), &[36, 37, 38, 39, 40, 41, 42, 43, 44, 45, 46]);
    }

    #[test]
    fn test_visible_tracks_viewport() {
        let items: Vec<u32> = (0..47).collect();
        let mut carousel = Carousel::new(400);
        assert_eq!(carousel.visible(&items), &[0, 1, 2]);
        carousel.set_viewport_width(800);
        assert_eq!(carousel.visible(&items).len(), 9);
    }

    #[test]
    fn test_auto_advance() {
        let mut carousel = Carousel::default();
        assert!(carousel.auto_advance(at(1_500)));
        assert!(carousel.auto_advance(at(3_000)));
        assert_eq!(carousel.raw_index(), 2);
        assert_eq!(carousel.direction(), Direction::Forward);
    }

    #[test]
    fn test_auto_advance_paused() {
        let mut carousel = Carousel::default();
        carousel.set_paused(true);
        assert!(!carousel.auto_advance(at(1_500)));
        assert_eq!(carousel.raw_index(), 0);

        carousel.set_paused(false);
        assert!(carousel.auto_advance(at(3_000)));
    }

    #[test]
    fn test_manual_change_restarts_period() {
        let mut carousel = Carousel::default();
        carousel.paginate(Direction::Backward, at(1_000));
        assert!(!carousel.auto_advance(at(1_500)));
        assert_eq!(carousel.raw_index(), -1);
        assert!(carousel.auto_advance(at(2_500)));
        assert_eq!(carousel.raw_index(), 0);
    }

    #[test]
    fn test_wheel_debounce() {
        let mut carousel = Carousel::default();
        assert_eq!(carousel.wheel(120.0, at(0)), Some(Direction::Forward));
        assert_eq!(carousel.wheel(120.0, at(300)), None);
        assert_eq!(carousel.wheel(-120.0, at(799)), None);
        assert_eq!(carousel.raw_index(), 1);

        assert_eq!(carousel.wheel(-120.0, at(800)), Some(Direction::Backward));
        assert_eq!(carousel.raw_index(), 0);
    }

    #[test]
    fn test_wheel_threshold() {
        let mut carousel = Carousel::default();
        assert_eq!(carousel.wheel(1.0, at(0)), None);
        assert_eq!(carousel.wheel(-0.5, at(0)), None);
        assert_eq!(carousel.raw_index(), 0);
        assert_eq!(carousel.wheel(1.5, at(0)), Some(Direction::Forward));
    }

    #[test]
    fn test_small_wheel_does_not_open_window() {
        let mut carousel = Carousel::default();
        assert_eq!(carousel.wheel(0.5, at(0)), None);
        assert_eq!(carousel.wheel(40.0, at(10)), Some(Direction::Forward));
    }

    #[test]
    fn test_seven_rapid_taps_launch() {
        let mut taps = LogoTaps::default();
        for i in 0..6 {
            assert_eq!(
                taps.tap(at(i * 500)),
                TapOutcome::Advance {
                    taps: u32::try_from(i + 1).unwrap_or(0)
                }
            );
        }
        assert_eq!(taps.tap(at(3_000)), TapOutcome::Launch);
        assert_eq!(taps.count(), 0);
    }

    #[test]
    fn test_tap_counter_resets_after_silence() {
        let mut taps = LogoTaps::default();
        for i in 0..6 {
            taps.tap(at(i * 100));
        }
        assert_eq!(taps.tap(at(500 + 2_000)), TapOutcome::Advance { taps: 1 });
    }

    #[test]
    fn test_long_press() {
        let mut press = LongPress::default();
        press.start(at(0));
        assert!(!press.poll(at(5_999)));
        assert!(press.poll(at(6_000)));
        assert!(!press.poll(at(7_000)));
    }

    #[test]
    fn test_cancelled_press_never_fires() {
        let mut press = LongPress::default();
        press.start(at(0));
        press.cancel();
        assert!(!press.poll(at(10_000)));
    }

    #[test]
    fn test_overlay_phases() {
        let mut egg = EasterEgg::default();
        assert_eq!(egg.phase(at(0)), OverlayPhase::Hidden);
        egg.launch(at(1_000));
        assert_eq!(egg.phase(at(3_999)), OverlayPhase::Celebrating);
        assert_eq!(egg.phase(at(4_000)), OverlayPhase::Arcade);
        egg.close();
        assert_eq!(egg.phase(at(5_000)), OverlayPhase::Hidden);
    }

    #[test]
    fn test_wall_taps_advance_then_launch() {
        let mut wall = SponsorWall::default();
        for i in 0..6 {
            wall.tap_logo(at(i * 200));
        }
        assert_eq!(wall.carousel.raw_index(), 6);
        assert_eq!(wall.tap_logo(at(1_300)), TapOutcome::Launch);
        assert_eq!(wall.carousel.raw_index(), 6);
        assert_eq!(wall.egg.phase(at(1_300)), OverlayPhase::Celebrating);
    }

    #[test]
    fn test_wall_long_press_launches() {
        let mut wall = SponsorWall::default();
        wall.egg.press.start(at(0));
        assert!(wall.poll_press(at(6_000)));
        assert_eq!(wall.egg.phase(at(9_000)), OverlayPhase::Arcade);
    }
}
