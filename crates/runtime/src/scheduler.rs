use crate::frame::Frame;

pub type RedrawCallback = Box<dyn FnOnce(Frame)>;

/// Coalesces redraw requests into a single pending frame.
///
/// Ordering contract:
/// - At most one frame is outstanding; requests made while it is pending join it.
/// - When the frame runs, the owner draws first and then every queued callback
///   fires once, in request order.
#[derive(Default)]
pub struct RedrawScheduler {
    pending: bool,
    callbacks: Vec<RedrawCallback>,
    requests: u64,
    frames: u64,
}

impl std::fmt::Debug for RedrawScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedrawScheduler")
            .field("pending", &self.pending)
            .field("callbacks", &self.callbacks.len())
            .field("requests", &self.requests)
            .field("frames", &self.frames)
            .finish()
    }
}

impl RedrawScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a redraw. Returns `true` if this call scheduled a new frame and
    /// `false` if it was coalesced into the one already pending.
    pub fn request(&mut self, callback: Option<RedrawCallback>) -> bool {
        self.requests += 1;
        if let Some(cb) = callback {
            self.callbacks.push(cb);
        }
        if self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Claims the pending frame, clearing the flag before the owner draws so a
    /// redraw requested from inside a callback schedules a fresh frame.
    ///
    /// Returns `None` when no frame is pending.
    pub fn take_frame(&mut self) -> Option<Vec<RedrawCallback>> {
        if !self.pending {
            return None;
        }
        self.pending = false;
        self.frames += 1;
        Some(std::mem::take(&mut self.callbacks))
    }

    /// Drops a pending frame and its callbacks. Returns how many callbacks were discarded.
    pub fn cancel(&mut self) -> usize {
        self.pending = false;
        let dropped = self.callbacks.len();
        self.callbacks.clear();
        dropped
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}
