//! Idle and expiry monitoring.
//!
//! The watchdog tracks the time since the last observed input event as
//! two whole-second TTLs: one until the session is declared idle, one
//! until it expires. [`MonitorState`] holds the pure transition logic so
//! tests can drive it with synthetic elapsed times; [`Watchdog::run`]
//! wraps it in the polling loop.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::WatchdogError;

/// Time source for the monitor loop, injectable for tests.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// The real monotonic clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Shared record of the last observed input event.
///
/// Cloned into every event tap; stroking from any clone is visible to
/// the monitor loop.
#[derive(Clone)]
pub struct StrokeHandle {
    clock: Arc<dyn Clock>,
    last_event: Arc<Mutex<Instant>>,
}

impl StrokeHandle {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            clock,
            last_event: Arc::new(Mutex::new(now)),
        }
    }

    /// Record an input event at the current time.
    pub fn stroke(&self) {
        let now = self.clock.now();
        debug!(?now, "saw input event");
        *self.last_event.lock().unwrap() = now;
    }

    /// When the last event was observed.
    pub fn last_event(&self) -> Instant {
        *self.last_event.lock().unwrap()
    }
}

/// Callbacks for watchdog state changes.
///
/// Defaults log a warning so a watchdog without handlers is visible in
/// the logs rather than silently inert.
pub trait WatchdogEvents: Send + Sync + 'static {
    /// The session went idle. Fires once per idle period.
    fn on_idle(&self) {
        warn!("unhandled on_idle");
    }

    /// The watchdog expired. Fires at most once; the monitor loop ends.
    fn on_timeout(&self) {
        warn!("unhandled on_timeout");
    }
}

/// A state change produced by one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Activity returned after an idle period.
    Reset,
    /// The idle TTL reached zero.
    Idle,
    /// The expiry TTL reached zero. Terminal.
    Expired,
}

/// Pure idle/expiry state machine.
///
/// Fed whole seconds elapsed since the last event; yields the
/// transitions that observation causes. Idle and reset fire on edges
/// (the TTL must have changed since the previous observation), so a
/// session that starts already idle stays quiet until activity resets
/// it. Expiry is unconditional and terminal.
#[derive(Debug)]
pub struct MonitorState {
    idle_secs: u64,
    timeout_secs: Option<u64>,
    is_idle: bool,
    last_idle_ttl: Option<u64>,
}

impl MonitorState {
    /// `timeout_secs` of `None` means the watchdog never expires.
    pub fn new(idle_secs: u64, timeout_secs: Option<u64>) -> Self {
        Self {
            idle_secs,
            timeout_secs,
            is_idle: false,
            last_idle_ttl: None,
        }
    }

    /// Seconds until idle detection for a given elapsed time.
    pub fn idle_ttl(&self, elapsed_secs: u64) -> u64 {
        self.idle_secs.saturating_sub(elapsed_secs)
    }

    /// Seconds until expiry, `None` when expiry is disabled.
    pub fn timeout_ttl(&self, elapsed_secs: u64) -> Option<u64> {
        self.timeout_secs.map(|t| t.saturating_sub(elapsed_secs))
    }

    /// Observe the current elapsed time and step the state machine.
    pub fn observe(&mut self, elapsed_secs: u64) -> Vec<Transition> {
        let idle_ttl = self.idle_ttl(elapsed_secs);
        let timeout_ttl = self.timeout_ttl(elapsed_secs);
        let changed = self.last_idle_ttl.is_some_and(|last| last != idle_ttl);

        let mut transitions = Vec::new();

        if self.is_idle && idle_ttl == self.idle_secs && changed {
            self.is_idle = false;
            transitions.push(Transition::Reset);
        }

        if idle_ttl == 0 && changed {
            self.is_idle = true;
            transitions.push(Transition::Idle);
        }

        if timeout_ttl == Some(0) {
            transitions.push(Transition::Expired);
        }

        self.last_idle_ttl = Some(idle_ttl);
        transitions
    }
}

/// The polling monitor loop.
pub struct Watchdog {
    state: MonitorState,
    stroke: StrokeHandle,
    clock: Arc<dyn Clock>,
    events: Arc<dyn WatchdogEvents>,
    interval: Duration,
}

impl Watchdog {
    pub fn new(
        idle_secs: u64,
        timeout_secs: Option<u64>,
        clock: Arc<dyn Clock>,
        events: Arc<dyn WatchdogEvents>,
    ) -> Self {
        let stroke = StrokeHandle::new(Arc::clone(&clock));
        Self {
            state: MonitorState::new(idle_secs, timeout_secs),
            stroke,
            clock,
            events,
            interval: Duration::from_millis(500),
        }
    }

    /// Override the poll interval, mainly for tests.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Handle for event taps to record activity on.
    pub fn stroke_handle(&self) -> StrokeHandle {
        self.stroke.clone()
    }

    /// Poll until expiry or shutdown.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<(), WatchdogError> {
        info!(
            idle_secs = self.state.idle_secs,
            timeout_secs = ?self.state.timeout_secs,
            "starting activity watchdog"
        );

        loop {
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("watchdog shut down");
                        return Ok(());
                    }
                }
            }

            let elapsed = self
                .clock
                .now()
                .duration_since(self.stroke.last_event())
                .as_secs();

            for transition in self.state.observe(elapsed) {
                match transition {
                    Transition::Reset => {
                        info!("watchdog reset");
                    }
                    Transition::Idle => {
                        info!(
                            timeout_ttl = ?self.state.timeout_ttl(elapsed),
                            "idle detected"
                        );
                        self.events.on_idle();
                    }
                    Transition::Expired => {
                        info!("watchdog expired");
                        self.events.on_timeout();
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transitions(state: &mut MonitorState, seconds: impl IntoIterator<Item = u64>) -> Vec<Transition> {
        seconds
            .into_iter()
            .flat_map(|s| state.observe(s))
            .collect()
    }

    #[test]
    fn idle_fires_once_when_ttl_hits_zero() {
        let mut state = MonitorState::new(10, Some(600));
        let out = transitions(&mut state, 0..=12);
        assert_eq!(out, vec![Transition::Idle]);
    }

    #[test]
    fn stroke_defers_idle() {
        let mut state = MonitorState::new(10, Some(600));
        // Stroked at t=8: elapsed drops back toward zero.
        let out = transitions(&mut state, [0, 2, 4, 6, 8, 0, 2, 4, 6, 8, 10]);
        assert_eq!(out, vec![Transition::Idle]);
    }

    #[test]
    fn activity_after_idle_resets_exactly_once() {
        let mut state = MonitorState::new(10, Some(600));
        let out = transitions(&mut state, [0, 5, 10, 11, 0, 0, 1]);
        assert_eq!(out, vec![Transition::Idle, Transition::Reset]);
    }

    #[test]
    fn idle_can_reenter_after_reset() {
        let mut state = MonitorState::new(10, Some(600));
        let out = transitions(&mut state, [0, 10, 0, 10]);
        assert_eq!(
            out,
            vec![Transition::Idle, Transition::Reset, Transition::Idle]
        );
    }

    #[test]
    fn already_idle_at_start_is_quiet() {
        // The first observation seeds the edge detector, and a TTL pinned
        // at zero never changes, so idle does not fire.
        let mut state = MonitorState::new(10, Some(600));
        assert!(transitions(&mut state, [20, 21, 22]).is_empty());
    }

    #[test]
    fn expiry_can_share_a_tick_with_idle() {
        let mut state = MonitorState::new(10, Some(20));
        let out = transitions(&mut state, [0, 10, 20]);
        assert_eq!(out, vec![Transition::Idle, Transition::Expired]);
    }

    #[test]
    fn infinite_timeout_never_expires() {
        let mut state = MonitorState::new(10, None);
        let out = transitions(&mut state, [0, 100, 10_000]);
        assert_eq!(out, vec![Transition::Idle]);
        assert_eq!(state.timeout_ttl(10_000), None);
    }

    #[test]
    fn ttls_count_down_and_floor_at_zero() {
        let state = MonitorState::new(10, Some(600));
        assert_eq!(state.idle_ttl(0), 10);
        assert_eq!(state.idle_ttl(4), 6);
        assert_eq!(state.idle_ttl(99), 0);
        assert_eq!(state.timeout_ttl(9), Some(591));
        assert_eq!(state.timeout_ttl(700), Some(0));
    }

    struct CountingEvents {
        idle: std::sync::atomic::AtomicUsize,
        timeout: std::sync::atomic::AtomicUsize,
    }

    impl CountingEvents {
        fn new() -> Self {
            Self {
                idle: std::sync::atomic::AtomicUsize::new(0),
                timeout: std::sync::atomic::AtomicUsize::new(0),
            }
        }
    }

    impl WatchdogEvents for CountingEvents {
        fn on_idle(&self) {
            self.idle.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }

        fn on_timeout(&self) {
            self.timeout
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    /// Clock that can be advanced manually from the test.
    struct FakeClock {
        base: Instant,
        offset: Mutex<Duration>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self {
                base: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        fn advance(&self, by: Duration) {
            *self.offset.lock().unwrap() += by;
        }
    }

    impl Clock for FakeClock {
        fn now(&self) -> Instant {
            self.base + *self.offset.lock().unwrap()
        }
    }

    #[tokio::test]
    async fn loop_fires_timeout_once_and_ends() {
        let clock = Arc::new(FakeClock::new());
        let events = Arc::new(CountingEvents::new());
        let watchdog = Watchdog::new(
            2,
            Some(4),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&events) as Arc<dyn WatchdogEvents>,
        )
        .with_interval(Duration::from_millis(5));

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(watchdog.run(shutdown_rx));

        // Let the first poll land at elapsed zero, then nudge time forward
        // one second at a time so every TTL step gets observed.
        tokio::time::sleep(Duration::from_millis(20)).await;
        for _ in 0..6 {
            clock.advance(Duration::from_secs(1));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(events.idle.load(std::sync::atomic::Ordering::SeqCst), 1);
        assert_eq!(events.timeout.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn shutdown_stops_the_loop_without_events() {
        let clock = Arc::new(FakeClock::new());
        let events = Arc::new(CountingEvents::new());
        let watchdog = Watchdog::new(
            60,
            Some(600),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Arc::clone(&events) as Arc<dyn WatchdogEvents>,
        )
        .with_interval(Duration::from_millis(5));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(watchdog.run(shutdown_rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(events.idle.load(std::sync::atomic::Ordering::SeqCst), 0);
        assert_eq!(events.timeout.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
