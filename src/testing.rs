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

//! Host-side fakes for the register I/O layer, the countdown timer and the
//! collaborators.

use crate::adapter::{Adapter, Collaborators};
use crate::config::{Config, PortConfig};
use crate::error::Error;
use crate::event::{EventClass, EventParam, EventRecord, RlmtEvent};
use crate::link::Link;
use crate::mac::{Counter, Mac, MacRegister};
use crate::phy::{PhyType, Register};
use crate::port::{LinkMode, Port};
use crate::sirq::IrqStatus;
use crate::timer::{Countdown, TimerCommand, TimerId};
use std::collections::{HashMap, VecDeque};
use std::vec::Vec;

/// Register file backed by maps. Reads consume scripted values first and
/// then fall back to the last value set or written.
#[derive(Default)]
pub struct FakeMac {
    regs: HashMap<(usize, MacRegister), u32>,
    scripted: HashMap<(usize, MacRegister), VecDeque<u32>>,
    phy_regs: HashMap<(usize, u8), u16>,
    phy_scripted: HashMap<(usize, u8), VecDeque<u16>>,
    pub writes: Vec<(usize, MacRegister, u32)>,
    pub phy_writes: Vec<(usize, u8, u16)>,
    pub stats: HashMap<(usize, Counter), u32>,
    pub tx_octets: [u64; 2],
    pub stat_updates: usize,
}

impl FakeMac {
    pub fn set(&mut self, port: usize, register: MacRegister, data: u32) {
        self.regs.insert((port, register), data);
    }

    pub fn script(&mut self, port: usize, register: MacRegister, values: &[u32]) {
        self.scripted
            .entry((port, register))
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn set_phy(&mut self, port: usize, register: Register, data: u16) {
        self.phy_regs.insert((port, register.into()), data);
    }

    pub fn script_phy(&mut self, port: usize, register: Register, values: &[u16]) {
        self.phy_scripted
            .entry((port, register.into()))
            .or_default()
            .extend(values.iter().copied());
    }

    pub fn get(&self, port: usize, register: MacRegister) -> u32 {
        self.regs.get(&(port, register)).copied().unwrap_or(0)
    }

    pub fn phy(&self, port: usize, register: Register) -> u16 {
        self.phy_regs
            .get(&(port, register.into()))
            .copied()
            .unwrap_or(0)
    }

    /// Values written to one register, oldest first.
    pub fn written(&self, port: usize, register: MacRegister) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|&&(p, r, _)| p == port && r == register)
            .map(|&(_, _, data)| data)
            .collect()
    }

    fn read(&mut self, port: usize, register: MacRegister) -> u32 {
        if let Some(value) = self
            .scripted
            .get_mut(&(port, register))
            .and_then(VecDeque::pop_front)
        {
            return value;
        }
        self.get(port, register)
    }

    fn write(&mut self, port: usize, register: MacRegister, data: u32) {
        self.writes.push((port, register, data));
        self.regs.insert((port, register), data);
    }
}

impl Mac for FakeMac {
    fn read8(&mut self, port: usize, register: MacRegister) -> u8 {
        self.read(port, register) as u8
    }

    fn write8(&mut self, port: usize, register: MacRegister, data: u8) {
        self.write(port, register, data.into())
    }

    fn read16(&mut self, port: usize, register: MacRegister) -> u16 {
        self.read(port, register) as u16
    }

    fn write16(&mut self, port: usize, register: MacRegister, data: u16) {
        self.write(port, register, data.into())
    }

    fn read32(&mut self, port: usize, register: MacRegister) -> u32 {
        self.read(port, register)
    }

    fn write32(&mut self, port: usize, register: MacRegister, data: u32) {
        self.write(port, register, data)
    }

    fn phy_read(&mut self, port: usize, register: Register) -> u16 {
        let key = (port, u8::from(register));
        if let Some(value) = self
            .phy_scripted
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return value;
        }
        self.phy_regs.get(&key).copied().unwrap_or(0)
    }

    fn phy_write(&mut self, port: usize, register: Register, data: u16) {
        let key = (port, u8::from(register));
        self.phy_writes.push((port, key.1, data));
        self.phy_regs.insert(key, data);
    }

    fn update_stats(&mut self, _port: usize) -> Result<(), Error> {
        self.stat_updates += 1;
        Ok(())
    }

    fn statistic(&mut self, port: usize, counter: Counter) -> u32 {
        self.stats.get(&(port, counter)).copied().unwrap_or(0)
    }

    fn tx_octets(&mut self, port: usize) -> u64 {
        self.tx_octets[port]
    }
}

/// Countdown that only moves when a test calls `elapse`.
#[derive(Default)]
pub struct FakeCountdown {
    pub loaded: u32,
    pub remaining: u32,
    pub running: bool,
    pub irq: bool,
    pub starts: usize,
}

impl FakeCountdown {
    pub fn elapse(&mut self, ticks: u32) {
        if !self.running {
            return;
        }
        if ticks >= self.remaining {
            self.remaining = 0;
            self.irq = true;
        } else {
            self.remaining -= ticks;
        }
    }
}

impl Countdown for FakeCountdown {
    fn load(&mut self, ticks: u32) {
        self.loaded = ticks;
        self.remaining = ticks;
    }

    fn value(&mut self) -> u32 {
        self.remaining
    }

    fn command(&mut self, command: TimerCommand) {
        match command {
            TimerCommand::Start => {
                self.running = true;
                self.starts += 1;
            }
            TimerCommand::Stop => self.running = false,
            TimerCommand::ClearIrq => self.irq = false,
        }
    }

    fn irq_pending(&mut self) -> bool {
        self.irq
    }
}

/// A lone port record for exercising `Link` without an adapter.
pub struct TestPort {
    pub port: Port,
    pub config: Config,
}

impl TestPort {
    pub fn new(phy_type: PhyType, link_mode: LinkMode) -> TestPort {
        let config = Config::default();
        let port_config = PortConfig {
            link_mode,
            ..PortConfig::new(phy_type)
        };
        TestPort {
            port: Port::new(0, &port_config, &config, TimerId(0), TimerId(1)),
            config,
        }
    }

    pub fn link<'a>(&'a mut self, mac: &'a mut FakeMac) -> Link<'a> {
        Link::new(mac, &mut self.port, &self.config)
    }
}

pub type TestAdapter = Adapter<FakeMac, FakeCountdown>;

pub fn adapter(ports: &[PortConfig]) -> TestAdapter {
    Adapter::new(
        FakeMac::default(),
        FakeCountdown::default(),
        Config::default(),
        ports,
    )
    .unwrap()
}

/// Runs the countdown out, serves the timer interrupt and drains the queue.
pub fn tick(adapter: &mut TestAdapter, recorder: &mut Recorder) {
    let countdown = adapter.timers.countdown_mut();
    let remaining = countdown.remaining;
    countdown.elapse(remaining);
    adapter.sirq_isr(IrqStatus::TIMINT);
    adapter.dispatch(recorder).unwrap();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Delivery {
    pub class: EventClass,
    pub event: u32,
    pub param: EventParam,
    /// Delivered through `Collaborators::rlmt` rather than the queue.
    pub direct: bool,
}

impl Delivery {
    pub fn queued(class: EventClass, event: impl Into<u32>, port: usize) -> Delivery {
        Delivery {
            class,
            event: event.into(),
            param: EventParam::port(port),
            direct: false,
        }
    }

    pub fn direct(event: RlmtEvent, port: usize) -> Delivery {
        Delivery {
            class: EventClass::Rlmt,
            event: event.into(),
            param: EventParam::port(port),
            direct: true,
        }
    }
}

/// Collaborators that record every delivery in order.
#[derive(Default)]
pub struct Recorder {
    pub deliveries: Vec<Delivery>,
    /// Fails the first queued record with this class.
    pub fail_class: Option<EventClass>,
    /// Fails the next synchronous RLMT delivery.
    pub fail_rlmt: bool,
}

impl Collaborators for Recorder {
    fn handle(&mut self, record: &EventRecord) -> Result<(), Error> {
        let class = record.class().ok_or(Error::Collaborator("unknown class"))?;
        if self.fail_class == Some(class) {
            self.fail_class = None;
            return Err(Error::Collaborator("recorder"));
        }
        self.deliveries.push(Delivery {
            class,
            event: record.event,
            param: record.param,
            direct: false,
        });
        Ok(())
    }

    fn rlmt(&mut self, event: RlmtEvent, param: EventParam) -> Result<(), Error> {
        if self.fail_rlmt {
            self.fail_rlmt = false;
            return Err(Error::Collaborator("rlmt"));
        }
        self.deliveries.push(Delivery {
            class: EventClass::Rlmt,
            event: event.into(),
            param,
            direct: true,
        });
        Ok(())
    }
}
