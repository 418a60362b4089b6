//! System clock based timer with millisecond precision, requires the `std` feature
use fugit::{TimerDurationU32, TimerInstantU32};
use fugit_timer::Timer;
use std::time::Instant as StdInstant;

/// A timer with millisecond precision.
pub struct SysTimer {
    /// Reference point of `now()`
    origin: StdInstant,

    /// Start of the running countdown
    start: StdInstant,

    duration_ms: u32,

    started: bool,
}

impl SysTimer {
    pub fn new() -> SysTimer {
        let now = StdInstant::now();

        SysTimer {
            origin: now,
            start: now,
            duration_ms: 0,
            started: false,
        }
    }
}

impl Default for SysTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer<1_000> for SysTimer {
    type Error = &'static str;

    /// Milliseconds since creation, wraps after ~49 days
    fn now(&mut self) -> TimerInstantU32<1_000> {
        let milliseconds = self.origin.elapsed().as_millis();
        TimerInstantU32::from_ticks(milliseconds as u32)
    }

    /// Start timer with a `duration`
    fn start(&mut self, duration: TimerDurationU32<1_000>) -> Result<(), Self::Error> {
        self.start = StdInstant::now();
        self.duration_ms = duration.ticks();
        self.started = true;

        Ok(())
    }

    /// Tries to stop this timer.
    ///
    /// An error will be returned if the timer has already been canceled or was never started.
    fn cancel(&mut self) -> Result<(), Self::Error> {
        if !self.started {
            return Err("cannot cancel stopped timer");
        }

        self.started = false;
        Ok(())
    }

    /// Wait until timer `duration` has expired.
    /// Must return `nb::Error::WouldBlock` if timer `duration` is not yet over.
    fn wait(&mut self) -> nb::Result<(), Self::Error> {
        if !self.started {
            return Err(nb::Error::Other("timer not started"));
        }

        if self.start.elapsed().as_millis() >= u128::from(self.duration_ms) {
            self.started = false;
            return Ok(());
        }

        Err(nb::Error::WouldBlock)
    }
}
