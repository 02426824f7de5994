use foundation::time::Time;

/// Which edge of a burst fires the debounced call.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum DebounceEdge {
    /// Fire the last event once the input has been quiet for `wait`.
    #[default]
    Trailing,
    /// Fire the first event of a burst immediately, then ignore events until
    /// the input has been quiet for `wait`.
    Leading,
}

/// Time-driven debouncer.
///
/// The caller supplies the clock: `call` feeds events, `poll` reports a
/// trailing event whose quiet period has elapsed. Every `call` restarts the
/// quiet period, for both edges.
#[derive(Debug, Clone)]
pub struct Debouncer<E> {
    wait_s: f64,
    edge: DebounceEdge,
    deadline: Option<Time>,
    pending: Option<E>,
}

impl<E> Debouncer<E> {
    pub fn new(wait_s: f64, edge: DebounceEdge) -> Self {
        Self {
            wait_s: wait_s.max(0.0),
            edge,
            deadline: None,
            pending: None,
        }
    }

    pub fn from_millis(wait_ms: f64, edge: DebounceEdge) -> Self {
        Self::new(wait_ms / 1000.0, edge)
    }

    pub fn edge(&self) -> DebounceEdge {
        self.edge
    }

    pub fn wait_s(&self) -> f64 {
        self.wait_s
    }

    /// When the current quiet period ends, if one is running.
    pub fn deadline(&self) -> Option<Time> {
        self.deadline
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feeds one event observed at `now`.
    ///
    /// Returns an event that fires as a result: the new event itself on a
    /// leading edge, or a trailing event whose deadline had already passed
    /// without being polled.
    pub fn call(&mut self, event: E, now: Time) -> Option<E> {
        let overdue = self.poll(now);
        let idle = self.deadline.is_none();
        self.deadline = Some(now.after(self.wait_s));
        match self.edge {
            DebounceEdge::Trailing => {
                self.pending = Some(event);
                overdue
            }
            DebounceEdge::Leading => {
                if idle {
                    Some(event)
                } else {
                    None
                }
            }
        }
    }

    /// Ends the quiet period if `now` has reached the deadline.
    ///
    /// Returns the trailing event, if any, that fires at that point.
    pub fn poll(&mut self, now: Time) -> Option<E> {
        let deadline = self.deadline?;
        if now.0 < deadline.0 {
            return None;
        }
        self.deadline = None;
        self.pending.take()
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending = None;
    }
}
