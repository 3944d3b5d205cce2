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

//! Deferred work is carried between the interrupt path and the dispatcher as
//! `(class, event, parameter)` records in a fixed ring. Class and event are
//! kept as raw codes so that a record built from an unknown code can still
//! be queued and later reported by the dispatcher.

codes! {
    /// Destination of a queued record.
    EventClass {
        Driver = 1,
        Rlmt = 2,
        I2c = 3,
        Pnmi = 4,
        Address = 5,
        HwAccess = 6,
        Timer = 7,
    }
}

codes! {
    /// Events consumed by the link state machine.
    HwEvent {
        /// Workaround timer expired.
        WaTimer = 1,
        PortStart = 2,
        PortStop = 3,
        UpdateStat = 4,
        ClearStat = 5,
        SetLinkMode = 6,
        SetFlowMode = 7,
        SetRole = 8,
        SetSpeed = 9,
        /// Half-duplex hang check timer expired.
        HalfDupChk = 10,
    }
}

codes! {
    RlmtEvent {
        LinkUp = 1,
        LinkDown = 2,
    }
}

codes! {
    DriverEvent {
        PortReset = 1,
        PortFail = 2,
        AdapterFail = 3,
    }
}

codes! {
    PnmiEvent {
        /// A MAC statistics counter overflowed; `para32[1]` holds the source bits.
        SirqOverflow = 1,
    }
}

codes! {
    TimerEvent {
        /// Reconcile the timer ring against the countdown.
        Poll = 1,
    }
}

/// Event parameter, either one 64-bit value or two 32-bit halves.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventParam(u64);

impl EventParam {
    pub const fn new(value: u64) -> EventParam {
        EventParam(value)
    }

    pub const fn pair(low: u32, high: u32) -> EventParam {
        EventParam((high as u64) << 32 | low as u64)
    }

    /// Parameter addressing a port with no value attached.
    pub const fn port(port: usize) -> EventParam {
        EventParam::pair(port as u32, 0)
    }

    pub const fn para64(self) -> u64 {
        self.0
    }

    pub const fn para32(self) -> [u32; 2] {
        [self.0 as u32, (self.0 >> 32) as u32]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EventRecord {
    pub class: u32,
    pub event: u32,
    pub param: EventParam,
}

impl EventRecord {
    const EMPTY: EventRecord = EventRecord {
        class: 0,
        event: 0,
        param: EventParam(0),
    };

    pub fn class(&self) -> Option<EventClass> {
        EventClass::try_from(self.class).ok()
    }

    /// Port index carried in the low half of the parameter.
    pub fn port(&self) -> usize {
        self.param.para32()[0] as usize
    }
}

/// Circular event buffer. One slot is kept free to tell full from empty,
/// so at most `N - 1` records are pending at once. `N` must be at least 2.
pub struct EventQueue<const N: usize> {
    records: [EventRecord; N],
    put: usize,
    get: usize,
    overflows: u32,
}

impl<const N: usize> EventQueue<N> {
    pub const fn new() -> EventQueue<N> {
        EventQueue {
            records: [EventRecord::EMPTY; N],
            put: 0,
            get: 0,
            overflows: 0,
        }
    }

    /// Queues a record. A full queue drops the new record.
    pub fn put(&mut self, class: u32, event: u32, param: EventParam) {
        self.records[self.put] = EventRecord {
            class,
            event,
            param,
        };

        let next = (self.put + 1) % N;
        if next == self.get {
            self.overflows = self.overflows.wrapping_add(1);
            log::error!(
                "Event queue overflow, dropped class {} event {}",
                class,
                event
            );
            return;
        }
        self.put = next;
    }

    pub fn queue(&mut self, class: EventClass, event: impl Into<u32>, param: EventParam) {
        self.put(class.into(), event.into(), param)
    }

    /// The oldest pending record. It stays queued until `advance`.
    pub fn peek(&self) -> Option<&EventRecord> {
        if self.is_empty() {
            None
        } else {
            Some(&self.records[self.get])
        }
    }

    pub fn advance(&mut self) {
        if !self.is_empty() {
            self.get = (self.get + 1) % N;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.put == self.get
    }

    pub fn len(&self) -> usize {
        (self.put + N - self.get) % N
    }

    pub const fn capacity(&self) -> usize {
        N - 1
    }

    /// Records dropped because the queue was full.
    pub fn overflows(&self) -> u32 {
        self.overflows
    }
}

impl<const N: usize> Default for EventQueue<N> {
    fn default() -> Self {
        EventQueue::new()
    }
}
