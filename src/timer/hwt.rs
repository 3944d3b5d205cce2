// Copyright 2025 Alex Crawford
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerCommand {
    Start,
    Stop,
    ClearIrq,
}

/// The adapter's countdown timer: an init value, a running value, and a
/// control register.
pub trait Countdown {
    /// Largest value the init register accepts.
    const MAX_TICKS: u32 = u32::MAX;

    fn load(&mut self, ticks: u32);
    fn value(&mut self) -> u32;
    fn command(&mut self, command: TimerCommand);
    fn irq_pending(&mut self) -> bool;
}

/// Tracks how much of the programmed span has run down.
pub struct HwTimer<C> {
    countdown: C,
    start: u32,
    elapsed: u32,
    active: bool,
}

impl<C: Countdown> HwTimer<C> {
    pub fn new(countdown: C) -> HwTimer<C> {
        HwTimer {
            countdown,
            start: 0,
            elapsed: 0,
            active: false,
        }
    }

    pub fn start(&mut self, ticks: u32) {
        let ticks = ticks.clamp(1, C::MAX_TICKS);

        self.start = ticks;
        self.elapsed = 0;

        self.countdown.load(ticks);
        self.countdown.command(TimerCommand::Start);
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.countdown.command(TimerCommand::Stop);
        self.countdown.command(TimerCommand::ClearIrq);
        self.active = false;
    }

    /// Stops the countdown and returns the ticks elapsed since `start`.
    pub fn read(&mut self) -> u32 {
        if self.active {
            let expired = self.countdown.irq_pending();
            self.stop();

            let remaining = self.countdown.value();
            self.elapsed = if expired || remaining > self.start {
                self.start
            } else {
                self.start - remaining
            };
        }
        self.elapsed
    }

    /// The countdown reached zero; the whole programmed span has passed.
    pub fn on_interrupt(&mut self) {
        self.stop();
        self.elapsed = self.start;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    #[cfg(test)]
    pub(crate) fn countdown_mut(&mut self) -> &mut C {
        &mut self.countdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCountdown;

    #[test]
    fn start_loads_at_least_one_tick() {
        let mut hwt = HwTimer::new(FakeCountdown::default());
        hwt.start(0);
        assert_eq!(hwt.countdown_mut().loaded, 1);
        assert!(hwt.countdown_mut().running);
        assert!(hwt.is_active());
    }

    #[test]
    fn read_partial_span() {
        let mut hwt = HwTimer::new(FakeCountdown::default());
        hwt.start(500);
        hwt.countdown_mut().elapse(120);
        assert_eq!(hwt.read(), 120);
        assert!(!hwt.is_active());
        assert!(!hwt.countdown_mut().running);

        // Stopped timers report the last reading
        hwt.countdown_mut().elapse(50);
        assert_eq!(hwt.read(), 120);
    }

    #[test]
    fn read_after_expiry() {
        let mut hwt = HwTimer::new(FakeCountdown::default());
        hwt.start(500);
        hwt.countdown_mut().elapse(900);
        assert_eq!(hwt.read(), 500);
        assert!(!hwt.countdown_mut().irq);
    }

    #[test]
    fn interrupt_consumes_span() {
        let mut hwt = HwTimer::new(FakeCountdown::default());
        hwt.start(42);
        hwt.on_interrupt();
        assert_eq!(hwt.read(), 42);
    }
}
