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

//! The adapter owns everything the link core touches: the MAC register
//! handle, the event queue, the timer ring and the port records.
//!
//! All operations take `&mut self`. Firmware keeps the adapter in a single
//! shared resource and calls `sirq_isr` followed by `dispatch` from the
//! adapter interrupt, or `poll_timers` followed by `dispatch` when polling.

use crate::config::{Config, PortConfig, MAX_MACS};
use crate::error::Error;
use crate::event::{
    DriverEvent, EventClass, EventParam, EventQueue, EventRecord, HwEvent, RlmtEvent, TimerEvent,
};
use crate::link::Link;
use crate::mac::{Mac, MacType};
use crate::phy::{Oui, Register};
use crate::port::{FlowCtrlMode, LinkMode, LinkSpeed, MsMode, Port, PortState};
use crate::timer::{Countdown, TimerId, TimerRing};

pub const MAX_EVENTS: usize = 64;
pub const MAX_TIMERS: usize = 16;

/// The parts of the driver outside the link core.
pub trait Collaborators {
    /// Queued events for the driver, RLMT, PNMI, address and I2C classes.
    fn handle(&mut self, record: &EventRecord) -> Result<(), Error>;

    /// RLMT events that must be seen before the state machine continues.
    fn rlmt(&mut self, event: RlmtEvent, param: EventParam) -> Result<(), Error>;
}

pub struct Adapter<M, C> {
    pub(crate) mac: M,
    pub(crate) config: Config,
    pub(crate) queue: EventQueue<MAX_EVENTS>,
    pub(crate) timers: TimerRing<C, MAX_TIMERS>,
    pub(crate) ports: [Option<Port>; MAX_MACS],
}

impl<M: Mac, C: Countdown> Adapter<M, C> {
    pub fn new(
        mut mac: M,
        countdown: C,
        config: Config,
        ports: &[PortConfig],
    ) -> Result<Adapter<M, C>, Error> {
        if ports.is_empty() || ports.len() > MAX_MACS {
            return Err(Error::InvalidPort(ports.len()));
        }

        let mut timers = TimerRing::new(countdown, config.timer_clock_khz);
        let mut records = [None, None];
        for (index, port_config) in ports.iter().enumerate() {
            let wa_timer = timers.register()?;
            let half_dup_timer = timers.register()?;

            let id1 = mac.phy_read(index, Register::PhyId1);
            let id2 = mac.phy_read(index, Register::PhyId2);
            log::debug!(
                "Port {}: {:?} PHY, OUI {}",
                index,
                port_config.phy_type,
                Oui::from_id(id1, id2)
            );

            records[index] = Some(Port::new(
                index,
                port_config,
                &config,
                wa_timer,
                half_dup_timer,
            ));
        }

        Ok(Adapter {
            mac,
            config,
            queue: EventQueue::new(),
            timers,
            ports: records,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn mac(&self) -> &M {
        &self.mac
    }

    pub fn mac_mut(&mut self) -> &mut M {
        &mut self.mac
    }

    pub fn port(&self, port: usize) -> Option<&Port> {
        self.ports.get(port).and_then(Option::as_ref)
    }

    pub fn ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().flatten()
    }

    pub(crate) fn port_mut(&mut self, port: usize) -> Result<&mut Port, Error> {
        self.ports
            .get_mut(port)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidPort(port))
    }

    pub(crate) fn link(&mut self, port: usize) -> Result<Link<'_>, Error> {
        let record = self
            .ports
            .get_mut(port)
            .and_then(Option::as_mut)
            .ok_or(Error::InvalidPort(port))?;
        Ok(Link::new(&mut self.mac, record, &self.config))
    }

    /// MAC generation of the adapter.
    pub fn mac_type(&self) -> MacType {
        self.ports()
            .next()
            .map_or(MacType::Xmac, |port| port.phy_type.mac_type())
    }

    pub fn queue(&mut self, class: EventClass, event: impl Into<u32>, param: EventParam) {
        self.queue.queue(class, event, param)
    }

    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_overflows(&self) -> u32 {
        self.queue.overflows()
    }

    /// Drains the event queue. A collaborator error stops the drain and
    /// leaves the failing record at the head of the queue.
    pub fn dispatch(&mut self, collaborators: &mut impl Collaborators) -> Result<(), Error> {
        while let Some(record) = self.queue.peek().copied() {
            match record.class() {
                Some(EventClass::HwAccess) => self.hw_event(&record, collaborators)?,
                Some(EventClass::Timer) => match TimerEvent::try_from(record.event) {
                    Ok(TimerEvent::Poll) => self.poll_timers(),
                    Err(()) => log::error!("Unknown timer event {}", record.event),
                },
                Some(_) => collaborators.handle(&record)?,
                None => log::error!(
                    "Unknown event class {} (event {})",
                    record.class,
                    record.event
                ),
            }
            self.queue.advance();
        }
        Ok(())
    }

    /// Fires software timers that have run out, for firmware that polls.
    pub fn poll_timers(&mut self) {
        self.timers.poll(&mut self.queue);
    }

    pub fn register_timer(&mut self) -> Result<TimerId, Error> {
        self.timers.register()
    }

    pub fn start_timer(
        &mut self,
        timer: TimerId,
        micros: u32,
        class: EventClass,
        event: impl Into<u32>,
        param: EventParam,
    ) {
        self.timers
            .start(&mut self.queue, timer, micros, class, event, param)
    }

    pub fn stop_timer(&mut self, timer: TimerId) {
        self.timers.stop(timer)
    }

    pub fn active_timers(&self) -> usize {
        self.timers.active_count()
    }

    pub fn set_port_state(&mut self, port: usize, state: PortState) -> Result<(), Error> {
        self.port_mut(port)?.state = state;
        Ok(())
    }

    pub fn link_up(&mut self, port: usize) -> Result<(), Error> {
        self.link(port)?.link_up();
        Ok(())
    }

    pub fn link_down(&mut self, port: usize) -> Result<(), Error> {
        self.link(port)?.link_down();
        Ok(())
    }

    /// Programs the PHY; called by the port-reset collaborator.
    pub fn init_phy(&mut self, port: usize, loopback: bool) -> Result<(), Error> {
        self.link(port)?.init_phy(loopback);
        Ok(())
    }

    pub fn start_port(&mut self, port: usize) -> Result<(), Error> {
        self.port_event(port, HwEvent::PortStart, 0)
    }

    pub fn stop_port(&mut self, port: usize) -> Result<(), Error> {
        self.port_event(port, HwEvent::PortStop, 0)
    }

    pub fn set_link_mode(&mut self, port: usize, mode: LinkMode) -> Result<(), Error> {
        self.port_event(port, HwEvent::SetLinkMode, mode.into())
    }

    pub fn set_flow_mode(&mut self, port: usize, mode: FlowCtrlMode) -> Result<(), Error> {
        self.port_event(port, HwEvent::SetFlowMode, mode.into())
    }

    pub fn set_role(&mut self, port: usize, mode: MsMode) -> Result<(), Error> {
        self.port_event(port, HwEvent::SetRole, mode.into())
    }

    pub fn set_speed(&mut self, port: usize, speed: LinkSpeed) -> Result<(), Error> {
        self.port_event(port, HwEvent::SetSpeed, speed.into())
    }

    pub fn clear_stats(&mut self) {
        self.queue(EventClass::HwAccess, HwEvent::ClearStat, EventParam::default());
    }

    fn port_event(&mut self, port: usize, event: HwEvent, value: u32) -> Result<(), Error> {
        self.port_mut(port)?;
        self.queue(EventClass::HwAccess, event, EventParam::pair(port as u32, value));
        Ok(())
    }

    pub(crate) fn start_wa_timer(&mut self, port: usize, micros: u32) -> Result<(), Error> {
        let timer = self.port_mut(port)?.wa_timer;
        self.timers.start(
            &mut self.queue,
            timer,
            micros,
            EventClass::HwAccess,
            HwEvent::WaTimer,
            EventParam::port(port),
        );
        Ok(())
    }

    pub(crate) fn queue_link_down(&mut self, port: usize) {
        self.queue(EventClass::Rlmt, RlmtEvent::LinkDown, EventParam::port(port));
    }

    pub(crate) fn port_failed(&mut self, port: usize) {
        self.queue(EventClass::Driver, DriverEvent::PortFail, EventParam::port(port));
        self.queue_link_down(port);
    }
}
