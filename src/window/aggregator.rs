//! Pluggable per-window aggregation

/// Incremental aggregation plugged into the [`WindowEngine`](super::WindowEngine)
///
/// One `State` exists per open window. `accumulate` must not depend on the
/// arrival order of events within a window (sums, sets and set sizes are
/// fine; "last value" is not).
pub trait Aggregator {
    /// Event type folded into the state
    type Input;

    /// Per-window accumulator
    type State;

    /// Externally visible summary
    type Output;

    /// Zero-value accumulator for a brand-new window
    fn initialize(&self) -> Self::State;

    /// Fold one event into the accumulator
    fn accumulate(&self, state: Self::State, event: &Self::Input, event_time: i64) -> Self::State;

    /// Derive the summary, or `None` to suppress emission
    fn finalize(&self, state: &Self::State) -> Option<Self::Output>;
}
