//! Tick sources for the transfer wait loops.

use core::time::Duration;

use embedded_hal::timer::CountDown;

/// Free-running millisecond counter. The counter may wrap; consumers
/// measure elapsed time as `now.wrapping_sub(start)`, which stays correct
/// across one wrap.
pub trait Ticker {
    fn ticks_ms(&mut self) -> u32;
}

/// [`CountDown`] over a [`Ticker`], bounding the adapter's card-ready and
/// DMA-completion polls.
pub struct TickCountDown<T> {
    ticker: T,
    start: u32,
    duration_ms: u32,
}

impl<T: Ticker> TickCountDown<T> {
    pub fn new(ticker: T) -> Self {
        Self { ticker, start: 0, duration_ms: 0 }
    }
}

impl<T: Ticker> CountDown for TickCountDown<T> {
    type Time = Duration;

    fn start<D: Into<Duration>>(&mut self, duration: D) {
        self.duration_ms = duration.into().as_millis() as u32;
        self.start = self.ticker.ticks_ms();
    }

    fn wait(&mut self) -> nb::Result<(), void::Void> {
        match self.ticker.ticks_ms().wrapping_sub(self.start) >= self.duration_ms {
            true => Ok(()),
            false => Err(nb::Error::WouldBlock),
        }
    }
}

#[cfg(feature = "std")]
pub mod std {
    use std::time::Instant;

    /// Ticker backed by [`Instant`], for host-side use.
    pub struct Ticker(Instant);

    impl Default for Ticker {
        fn default() -> Self {
            Self(Instant::now())
        }
    }

    impl super::Ticker for Ticker {
        fn ticks_ms(&mut self) -> u32 {
            self.0.elapsed().as_millis() as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use core::time::Duration;

    use embedded_hal::timer::CountDown;

    use super::{TickCountDown, Ticker};

    /// Returns the current count, then advances by a fixed step.
    struct Steps(u32, u32);

    impl Ticker for Steps {
        fn ticks_ms(&mut self) -> u32 {
            let now = self.0;
            self.0 = self.0.wrapping_add(self.1);
            now
        }
    }

    #[test]
    fn elapses_once_the_duration_has_passed() {
        let mut countdown = TickCountDown::new(Steps(0, 10));
        countdown.start(Duration::from_millis(25));
        assert!(countdown.wait().is_err()); // 10ms
        assert!(countdown.wait().is_err()); // 20ms
        assert!(countdown.wait().is_ok()); // 30ms
    }

    #[test]
    fn survives_a_counter_wrap() {
        let mut countdown = TickCountDown::new(Steps(u32::MAX - 15, 10));
        countdown.start(Duration::from_millis(25));
        assert!(countdown.wait().is_err()); // 10ms, before the wrap
        assert!(countdown.wait().is_err()); // 20ms, counter already wrapped
        assert!(countdown.wait().is_ok()); // 30ms
    }

    #[test]
    fn restart_opens_a_fresh_window() {
        let mut countdown = TickCountDown::new(Steps(0, 10));
        countdown.start(Duration::from_millis(15));
        assert!(countdown.wait().is_err());
        assert!(countdown.wait().is_ok());
        countdown.start(Duration::from_millis(15));
        assert!(countdown.wait().is_err());
        assert!(countdown.wait().is_ok());
    }
}
