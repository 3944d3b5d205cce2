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

//! Software timers multiplexed onto the single countdown timer.
//!
//! Active timers form a chain sorted by expiry. Each link stores only the
//! ticks remaining after its predecessor expires, so the countdown is always
//! programmed with the head's delta and an expiry only has to touch the
//! front of the chain. Expired timers post their event to the queue.

mod hwt;

pub use self::hwt::{Countdown, HwTimer, TimerCommand};

use crate::error::Error;
use crate::event::{EventClass, EventParam, EventQueue};

/// Handle to a registered timer slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimerId(pub(crate) usize);

#[derive(Clone, Copy)]
struct Slot {
    next: Option<TimerId>,
    delta: u32,
    class: u32,
    event: u32,
    param: EventParam,
    active: bool,
    registered: bool,
}

impl Slot {
    const FREE: Slot = Slot {
        next: None,
        delta: 0,
        class: 0,
        event: 0,
        param: EventParam::new(0),
        active: false,
        registered: false,
    };
}

pub struct TimerRing<C, const N: usize> {
    hwt: HwTimer<C>,
    slots: [Slot; N],
    head: Option<TimerId>,
    clock_khz: u32,
}

impl<C: Countdown, const N: usize> TimerRing<C, N> {
    pub fn new(countdown: C, clock_khz: u32) -> TimerRing<C, N> {
        TimerRing {
            hwt: HwTimer::new(countdown),
            slots: [Slot::FREE; N],
            head: None,
            clock_khz,
        }
    }

    pub fn register(&mut self) -> Result<TimerId, Error> {
        let index = self
            .slots
            .iter()
            .position(|slot| !slot.registered)
            .ok_or(Error::TimerSlotsExhausted)?;

        self.slots[index].registered = true;
        Ok(TimerId(index))
    }

    /// Converts microseconds to countdown ticks, never less than one.
    pub fn ticks(&self, micros: u32) -> u32 {
        let ticks = u64::from(micros) * u64::from(self.clock_khz) / 1000;
        u32::try_from(ticks).unwrap_or(u32::MAX).max(1)
    }

    /// (Re)starts `timer` so that it posts the given event after `micros`.
    pub fn start<const Q: usize>(
        &mut self,
        queue: &mut EventQueue<Q>,
        timer: TimerId,
        micros: u32,
        class: EventClass,
        event: impl Into<u32>,
        param: EventParam,
    ) {
        self.stop(timer);

        let ticks = self.ticks(micros);
        {
            let slot = &mut self.slots[timer.0];
            slot.class = class.into();
            slot.event = event.into();
            slot.param = param;
            slot.active = true;
        }

        if self.head.is_none() {
            self.slots[timer.0].delta = ticks;
            self.head = Some(timer);
            self.hwt.start(ticks);
            return;
        }

        // Bring the chain up to date before walking it
        self.reconcile(queue, false);

        let mut accumulated = 0u32;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let delta = self.slots[id.0].delta;
            if accumulated.saturating_add(delta) > ticks {
                break;
            }
            accumulated += delta;
            prev = cursor;
            cursor = self.slots[id.0].next;
        }

        let delta = ticks - accumulated;
        self.slots[timer.0].delta = delta;
        self.slots[timer.0].next = cursor;
        if let Some(next) = cursor {
            self.slots[next.0].delta -= delta;
        }
        match prev {
            Some(prev) => self.slots[prev.0].next = Some(timer),
            None => self.head = Some(timer),
        }

        if let Some(head) = self.head {
            self.hwt.start(self.slots[head.0].delta);
        }
    }

    /// Cancels `timer`. Stopping an inactive timer does nothing.
    pub fn stop(&mut self, timer: TimerId) {
        if !self.slots[timer.0].active {
            return;
        }

        let mut prev: Option<TimerId> = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let next = self.slots[id.0].next;
            if id == timer {
                match prev {
                    Some(prev) => self.slots[prev.0].next = next,
                    None => self.head = next,
                }
                if let Some(next) = next {
                    let delta = self.slots[id.0].delta;
                    let follower = &mut self.slots[next.0];
                    follower.delta = follower.delta.saturating_add(delta);
                }
                break;
            }
            prev = cursor;
            cursor = next;
        }

        let slot = &mut self.slots[timer.0];
        slot.next = None;
        slot.active = false;
    }

    /// Countdown interrupt: the head's span has fully elapsed.
    pub fn on_interrupt<const Q: usize>(&mut self, queue: &mut EventQueue<Q>) {
        self.hwt.on_interrupt();
        self.reconcile(queue, true);
    }

    /// Fires whatever has expired so far, for environments that poll
    /// instead of taking the countdown interrupt.
    pub fn poll<const Q: usize>(&mut self, queue: &mut EventQueue<Q>) {
        if self.head.is_some() {
            self.reconcile(queue, true);
        }
    }

    pub fn is_active(&self, timer: TimerId) -> bool {
        self.slots[timer.0].active
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.active).count()
    }

    /// Ticks left before `timer` expires, as of the last reconcile.
    pub fn remaining(&self, timer: TimerId) -> Option<u32> {
        let mut total = 0u32;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            total = total.saturating_add(self.slots[id.0].delta);
            if id == timer {
                return Some(total);
            }
            cursor = self.slots[id.0].next;
        }
        None
    }

    fn reconcile<const Q: usize>(&mut self, queue: &mut EventQueue<Q>, restart: bool) {
        let mut elapsed = self.hwt.read();

        let expired = self.head;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let slot = &mut self.slots[id.0];
            if elapsed < slot.delta {
                slot.delta -= elapsed;
                break;
            }
            elapsed -= slot.delta;
            slot.active = false;
            cursor = slot.next;
        }
        self.head = cursor;

        // Post in chain order, which is expiry order
        let mut fired = expired;
        while fired != cursor {
            let Some(id) = fired else {
                break;
            };
            let slot = &mut self.slots[id.0];
            fired = slot.next.take();
            queue.put(slot.class, slot.event, slot.param);
        }

        if restart {
            if let Some(head) = self.head {
                self.hwt.start(self.slots[head.0].delta);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn countdown_mut(&mut self) -> &mut C {
        self.hwt.countdown_mut()
    }
}
