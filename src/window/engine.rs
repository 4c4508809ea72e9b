//! Tumbling-window engine with "current" emission semantics
//!
//! Each event is bucketed by event time into a fixed-length window. The
//! window's accumulator is updated and immediately finalized, so every
//! update re-emits the latest summary for that window. Windows are retired
//! by processing time once `end + grace` has passed.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, trace, warn};

use super::aggregator::Aggregator;
use super::types::WindowKey;

/// A finalized summary together with the window it belongs to
#[derive(Debug, Clone, PartialEq)]
pub struct WindowResult<T> {
    pub window: WindowKey,
    pub value: T,
}

/// Tumbling-window engine generic over the aggregation
///
/// The engine is single-writer: callers sharing it across tasks must
/// serialize access (the Kafka jobs wrap it in a mutex).
pub struct WindowEngine<A: Aggregator> {
    aggregator: A,
    length: i64,
    grace: i64,
    windows: BTreeMap<WindowKey, A::State>,
}

impl<A: Aggregator> WindowEngine<A> {
    /// Create an engine with the given window length and retention grace
    pub fn new(aggregator: A, length: Duration, grace: Duration) -> Self {
        let length = i64::try_from(length.as_nanos()).unwrap_or(i64::MAX).max(1);
        let grace = i64::try_from(grace.as_nanos()).unwrap_or(i64::MAX);
        Self {
            aggregator,
            length,
            grace,
            windows: BTreeMap::new(),
        }
    }

    pub fn aggregator(&self) -> &A {
        &self.aggregator
    }

    /// Window length in nanoseconds
    pub fn length(&self) -> i64 {
        self.length
    }

    /// The window an event at `event_time` belongs to, if representable
    pub fn window_for(&self, event_time: i64) -> Option<WindowKey> {
        WindowKey::for_event(event_time, self.length)
    }

    /// Fold one event into its window and return the window's current result
    ///
    /// `now` is processing time in nanoseconds; it drives retirement. An
    /// event whose window has already been retired is folded into the
    /// oldest open window, or dropped when no window is open.
    pub fn process(
        &mut self,
        event: &A::Input,
        event_time: i64,
        now: i64,
    ) -> Option<WindowResult<A::Output>> {
        self.evict_expired(now);

        let window = self.route(event_time, now)?;
        let state = self
            .windows
            .remove(&window)
            .unwrap_or_else(|| self.aggregator.initialize());
        let state = self.aggregator.accumulate(state, event, event_time);
        let result = self.aggregator.finalize(&state);
        self.windows.insert(window, state);

        trace!(window = %window, open_windows = self.windows.len(), "Window updated");
        result.map(|value| WindowResult { window, value })
    }

    fn route(&self, event_time: i64, now: i64) -> Option<WindowKey> {
        let Some(window) = self.window_for(event_time) else {
            warn!(event_time, length = self.length, "Event time out of range, dropped");
            return None;
        };
        if !window.is_retired(now, self.grace) {
            return Some(window);
        }

        match self.windows.keys().next() {
            Some(oldest) => {
                debug!(
                    event_time,
                    event_window = %window,
                    routed_to = %oldest,
                    "Late event routed to oldest open window"
                );
                Some(*oldest)
            },
            None => {
                debug!(event_time, event_window = %window, "Late event dropped, no open window");
                None
            },
        }
    }

    /// Drop every window whose `end + grace` is at or before `now`
    pub fn evict_expired(&mut self, now: i64) -> usize {
        let grace = self.grace;
        let before = self.windows.len();
        self.windows.retain(|window, _| !window.is_retired(now, grace));
        let evicted = before - self.windows.len();
        if evicted > 0 {
            debug!(evicted, open_windows = self.windows.len(), "Retired windows evicted");
        }
        evicted
    }

    /// Re-finalize a window without adding an event
    pub fn current(&self, window: &WindowKey) -> Option<A::Output> {
        self.windows
            .get(window)
            .and_then(|state| self.aggregator.finalize(state))
    }

    /// Accumulator of an open window
    pub fn state(&self, window: &WindowKey) -> Option<&A::State> {
        self.windows.get(window)
    }

    /// Open windows, oldest first
    pub fn open_windows(&self) -> impl Iterator<Item = &WindowKey> {
        self.windows.keys()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECOND: i64 = 1_000_000_000;
    const MINUTE: i64 = 60 * SECOND;

    /// Sums values; suppresses output while the sum is zero
    #[derive(Debug)]
    struct SumAggregator;

    impl Aggregator for SumAggregator {
        type Input = f64;
        type State = (f64, usize);
        type Output = f64;

        fn initialize(&self) -> Self::State {
            (0.0, 0)
        }

        fn accumulate(&self, state: Self::State, event: &f64, _event_time: i64) -> Self::State {
            (state.0 + event, state.1 + 1)
        }

        fn finalize(&self, state: &Self::State) -> Option<f64> {
            (state.0 != 0.0).then_some(state.0)
        }
    }

    fn engine() -> WindowEngine<SumAggregator> {
        WindowEngine::new(
            SumAggregator,
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_events_in_same_bucket_share_accumulator() {
        let mut engine = engine();
        let now = 10 * MINUTE;

        let first = engine.process(&1.5, 10 * MINUTE + SECOND, now).unwrap();
        let second = engine.process(&2.5, 10 * MINUTE + 59 * SECOND, now).unwrap();

        assert_eq!(first.window, second.window);
        assert_eq!(second.window.start, 10 * MINUTE);
        assert_eq!(second.window.end, 11 * MINUTE);
        assert_eq!(second.value, 4.0);
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_different_buckets_are_isolated() {
        let mut engine = engine();
        let now = 10 * MINUTE;

        engine.process(&1.0, 10 * MINUTE, now);
        let other = engine.process(&5.0, 11 * MINUTE, now).unwrap();

        assert_eq!(other.value, 5.0);
        assert_eq!(engine.len(), 2);

        let first = engine.window_for(10 * MINUTE).unwrap();
        assert_eq!(engine.state(&first), Some(&(1.0, 1)));
    }

    #[test]
    fn test_out_of_order_event_updates_open_window() {
        let mut engine = engine();
        let now = 11 * MINUTE + 30 * SECOND;

        engine.process(&1.0, 10 * MINUTE + 10 * SECOND, now);
        engine.process(&1.0, 11 * MINUTE + 10 * SECOND, now);
        let corrected = engine.process(&3.0, 10 * MINUTE + 50 * SECOND, now).unwrap();

        assert_eq!(corrected.window.start, 10 * MINUTE);
        assert_eq!(corrected.value, 4.0);
    }

    #[test]
    fn test_finalize_none_suppresses_emission() {
        let mut engine = engine();
        assert!(engine.process(&0.0, 0, 0).is_none());
        assert_eq!(engine.len(), 1);
    }

    #[test]
    fn test_retired_windows_are_evicted() {
        let mut engine = engine();
        engine.process(&1.0, 0, 0);
        assert_eq!(engine.len(), 1);

        // window [0, 1m) retires at 1m + 60s grace
        assert_eq!(engine.evict_expired(2 * MINUTE - 1), 0);
        assert_eq!(engine.evict_expired(2 * MINUTE), 1);
        assert!(engine.is_empty());
    }

    #[test]
    fn test_late_event_goes_to_oldest_open_window() {
        let mut engine = engine();
        let now = 10 * MINUTE;

        engine.process(&1.0, 9 * MINUTE + SECOND, now);
        engine.process(&1.0, 10 * MINUTE, now);

        let late = engine.process(&2.0, 2 * MINUTE, now).unwrap();
        assert_eq!(late.window.start, 9 * MINUTE);
        assert_eq!(late.value, 3.0);
        assert_eq!(engine.len(), 2);
    }

    #[test]
    fn test_late_event_dropped_without_open_windows() {
        let mut engine = engine();
        assert!(engine.process(&2.0, 0, 10 * MINUTE).is_none());
        assert!(engine.is_empty());
    }

    #[test]
    fn test_event_time_out_of_range_is_dropped() {
        let mut engine = engine();
        engine.process(&1.0, 10 * MINUTE, 10 * MINUTE);

        assert!(engine.process(&2.0, i64::MIN, 10 * MINUTE).is_none());
        assert_eq!(engine.len(), 1);
        assert_eq!(engine.current(&engine.window_for(10 * MINUTE).unwrap()), Some(1.0));
    }

    #[test]
    fn test_older_event_with_live_bucket_opens_its_own_window() {
        let mut engine = engine();
        let now = 10 * MINUTE + 30 * SECOND;

        engine.process(&1.0, 10 * MINUTE, now);
        // [9m, 10m) is still within grace, so it gets its own window
        let older = engine.process(&2.0, 9 * MINUTE + SECOND, now).unwrap();

        assert_eq!(older.window.start, 9 * MINUTE);
        assert_eq!(older.value, 2.0);
        assert_eq!(engine.len(), 2);
        assert_eq!(engine.open_windows().next(), Some(&older.window));
    }

    #[test]
    fn test_current_refinalizes_without_mutation() {
        let mut engine = engine();
        let result = engine.process(&7.0, 0, 0).unwrap();
        assert_eq!(engine.current(&result.window), Some(7.0));
        assert_eq!(engine.state(&result.window), Some(&(7.0, 1)));
    }
}
