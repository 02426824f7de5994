use foundation::time::Time;

/// One animation-frame tick delivered by the host.
///
/// The host owns the clock; the runtime only records what it was told so
/// frames can be replayed in tests.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Host time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, time: Time) -> Self {
        Self { index, time }
    }

    /// Fixed-rate frame, handy for headless drivers.
    pub fn at_rate(index: u64, dt_s: f64) -> Self {
        Self::new(index, Time(index as f64 * dt_s))
    }

    pub fn next(self, time: Time) -> Self {
        Self::new(self.index + 1, time)
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use foundation::time::Time;

    #[test]
    fn frame_time_is_deterministic() {
        let a = Frame::at_rate(10, 1.0 / 60.0);
        let b = Frame::at_rate(10, 1.0 / 60.0);
        assert_eq!(a, b);
        assert_eq!(a.time, Time(10.0 / 60.0));
    }

    #[test]
    fn next_advances_index() {
        let f0 = Frame::new(0, Time(0.0));
        let f1 = f0.next(Time(0.016));
        assert_eq!(f1.index, 1);
        assert_eq!(f1.time, Time(0.016));
    }
}
