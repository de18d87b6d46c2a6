use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceState {
    Idle,
    Pending(Instant),
    Flushed,
}

/// Coalesces streamed deltas so the consumer sees at most one delivery per
/// window. Text is never dropped: anything held back is returned by
/// [`Debouncer::fire`] once the deadline passes, or by
/// [`Debouncer::finish`] at end of stream.
#[derive(Debug)]
pub struct Debouncer {
    window: Duration,
    pending: String,
    state: DebounceState,
    last_emit: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: String::new(),
            state: DebounceState::Idle,
            last_emit: None,
        }
    }

    pub fn state(&self) -> DebounceState {
        self.state
    }

    /// Deadline of the scheduled delivery, if one is pending.
    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            DebounceState::Pending(deadline) => Some(deadline),
            _ => None,
        }
    }

    /// Queues `delta`. Returns the text to deliver now when the window since
    /// the previous delivery has elapsed; otherwise schedules a delivery for
    /// the remainder of the window.
    pub fn push(&mut self, delta: &str, now: Instant) -> Option<String> {
        if self.state == DebounceState::Flushed || delta.is_empty() {
            return None;
        }
        self.pending.push_str(delta);

        match self.last_emit {
            Some(last) if now.duration_since(last) < self.window => {
                if self.state == DebounceState::Idle {
                    self.state = DebounceState::Pending(last + self.window);
                }
                None
            }
            _ => self.emit(now),
        }
    }

    /// Delivers held-back text once the pending deadline has passed.
    pub fn fire(&mut self, now: Instant) -> Option<String> {
        match self.state {
            DebounceState::Pending(deadline) if now >= deadline => self.emit(now),
            _ => None,
        }
    }

    /// Final flush at end of stream. Later pushes are ignored.
    pub fn finish(&mut self) -> Option<String> {
        self.state = DebounceState::Flushed;
        let text = std::mem::take(&mut self.pending);
        (!text.is_empty()).then_some(text)
    }

    /// Drops held-back text without delivering it. Used on cancellation.
    pub fn discard(&mut self) {
        self.state = DebounceState::Flushed;
        self.pending.clear();
    }

    fn emit(&mut self, now: Instant) -> Option<String> {
        self.state = DebounceState::Idle;
        self.last_emit = Some(now);
        let text = std::mem::take(&mut self.pending);
        (!text.is_empty()).then_some(text)
    }
}
