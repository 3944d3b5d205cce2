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

//! Special (slow path) interrupt service and the link state machine's
//! event handler.

use crate::adapter::{Adapter, Collaborators};
use crate::config::MAX_MACS;
use crate::error::Error;
use crate::event::{DriverEvent, EventClass, EventParam, EventRecord, HwEvent, PnmiEvent, RlmtEvent};
use crate::link::Link;
use crate::mac::{
    self, Counter, Mac, MacRegister, MacType, Queue, GMF_CLI_TX_PE, LED_CLR_IRQ, MFF_CLR_INSTAT,
    MFF_CLR_INTIST, MFF_CLR_PERR,
};
use crate::phy::{LinkCheck, PhyIrq, PhyType};
use crate::port::{FlowCtrlMode, LinkMode, LinkSpeed, MsMode, PortState};
use crate::timer::Countdown;
use bitflags::bitflags;
use ignore_result::Ignore;

bitflags! {
    /// Adapter interrupt source register.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IrqStatus: u32 {
        const HW_ERR = 1 << 31;
        const PA_TO_RX1 = 1 << 30;
        const PA_TO_RX2 = 1 << 29;
        const PA_TO_TX1 = 1 << 28;
        const PA_TO_TX2 = 1 << 27;
        const I2C_READY = 1 << 26;
        const IRQ_SW = 1 << 25;
        const EXT_REG = 1 << 24;
        const TIMINT = 1 << 23;
        const MAC1 = 1 << 22;
        const LNK_SYNC_M1 = 1 << 21;
        const MAC2 = 1 << 20;
        const LNK_SYNC_M2 = 1 << 19;
        const R1_C = 1 << 16;
        const R2_C = 1 << 13;
        const XS1_C = 1 << 10;
        const XA1_C = 1 << 7;
        const XS2_C = 1 << 4;
        const XA2_C = 1 << 1;
    }
}

bitflags! {
    /// Hardware error source register.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct HwErrorStatus: u32 {
        const TIST_OV = 1 << 13;
        const SENSOR = 1 << 12;
        const MST_ERR = 1 << 11;
        const PCI_STAT = 1 << 10;
        const NO_STAT_M1 = 1 << 9;
        const NO_STAT_M2 = 1 << 8;
        const NO_TIST_M1 = 1 << 7;
        const NO_TIST_M2 = 1 << 6;
        const RAM_RD_PAR = 1 << 5;
        const RAM_WR_PAR = 1 << 4;
        const M1_PAR_ERR = 1 << 3;
        const M2_PAR_ERR = 1 << 2;
        const R1_PAR_ERR = 1 << 1;
        const R2_PAR_ERR = 1 << 0;
    }
}

// Packet arbiter control
pub const PA_CLR_TO_TX2: u16 = 1 << 7;
pub const PA_CLR_TO_TX1: u16 = 1 << 6;
pub const PA_CLR_TO_RX2: u16 = 1 << 5;
pub const PA_CLR_TO_RX1: u16 = 1 << 4;

// RAM interface control
pub const RI_CLR_RD_PERR: u16 = 1 << 9;
pub const RI_CLR_WR_PERR: u16 = 1 << 8;

// Queue control/status
pub const CSR_IRQ_CL_P: u32 = 1 << 3;
pub const CSR_IRQ_CL_C: u32 = 1 << 0;

pub const GMT_ST_CLR_IRQ: u8 = 1 << 3;
pub const I2C_CLR_IRQ: u32 = 1 << 0;

struct Arbiter {
    rx: IrqStatus,
    tx: IrqStatus,
    clear_rx: u16,
    clear_tx: u16,
}

const ARBITERS: [Arbiter; MAX_MACS] = [
    Arbiter {
        rx: IrqStatus::PA_TO_RX1,
        tx: IrqStatus::PA_TO_TX1,
        clear_rx: PA_CLR_TO_RX1,
        clear_tx: PA_CLR_TO_TX1,
    },
    Arbiter {
        rx: IrqStatus::PA_TO_RX2,
        tx: IrqStatus::PA_TO_TX2,
        clear_rx: PA_CLR_TO_RX2,
        clear_tx: PA_CLR_TO_TX2,
    },
];

const QUEUE_CHECKS: [(IrqStatus, Queue, usize); 6] = [
    (IrqStatus::R1_C, Queue::R1, 0),
    (IrqStatus::R2_C, Queue::R2, 1),
    (IrqStatus::XS1_C, Queue::Xs1, 0),
    (IrqStatus::XA1_C, Queue::Xa1, 0),
    (IrqStatus::XS2_C, Queue::Xs2, 1),
    (IrqStatus::XA2_C, Queue::Xa2, 1),
];

const MAC_SOURCES: [(IrqStatus, IrqStatus); MAX_MACS] = [
    (IrqStatus::LNK_SYNC_M1, IrqStatus::MAC1),
    (IrqStatus::LNK_SYNC_M2, IrqStatus::MAC2),
];

impl<M: Mac, C: Countdown> Adapter<M, C> {
    /// Serves every slow-path source in `status`. The timer is served last
    /// so that events queued above precede any expiry.
    pub fn sirq_isr(&mut self, status: IrqStatus) {
        if status.contains(IrqStatus::HW_ERR) {
            let source = self.mac.read32(0, MacRegister::HweIsrc);
            self.hw_error(HwErrorStatus::from_bits_truncate(source));
        }

        for (index, arbiter) in ARBITERS.iter().enumerate() {
            self.arbiter_timeout(index, arbiter, status);
        }

        for &(flag, queue, port) in QUEUE_CHECKS.iter() {
            if status.contains(flag) {
                self.mac.write32(0, MacRegister::Csr(queue), CSR_IRQ_CL_C);
                log::error!("Queue {:?}: check error", queue);
                self.port_failed(port);
            }
        }

        if status.contains(IrqStatus::EXT_REG) {
            for index in 0..MAX_MACS {
                self.phy_irq(index);
            }
        }

        if status.contains(IrqStatus::I2C_READY) {
            log::debug!("I2C ready");
        }

        for (index, &(sync, irq)) in MAC_SOURCES.iter().enumerate() {
            // Link sync only ever reports a link going down
            if status.contains(sync) {
                self.mac.write8(index, MacRegister::LnkSyncCtrl, LED_CLR_IRQ);
            }
            if status.contains(irq) {
                self.mac_irq(index);
            }
        }

        if status.contains(IrqStatus::TIMINT) {
            self.timers.on_interrupt(&mut self.queue);
        }
    }

    fn hw_error(&mut self, status: HwErrorStatus) {
        log::debug!("Hardware error {:?}", status);

        if status.intersects(HwErrorStatus::MST_ERR | HwErrorStatus::PCI_STAT) {
            if status.contains(HwErrorStatus::PCI_STAT) {
                log::error!("PCI status error");
            } else {
                log::error!("PCI master error");
            }
            self.queue(EventClass::Driver, DriverEvent::AdapterFail, EventParam::default());
        }

        match self.mac_type() {
            MacType::Xmac => {
                // Also flagged in the descriptor; only the interrupt is cleared
                let clears = [
                    (HwErrorStatus::NO_STAT_M1, 0, MFF_CLR_INSTAT),
                    (HwErrorStatus::NO_STAT_M2, 1, MFF_CLR_INSTAT),
                    (HwErrorStatus::NO_TIST_M1, 0, MFF_CLR_INTIST),
                    (HwErrorStatus::NO_TIST_M2, 1, MFF_CLR_INTIST),
                ];
                for (flag, port, clear) in clears {
                    if status.contains(flag) {
                        self.mac.write16(port, MacRegister::RxMffCtrl1, clear);
                    }
                }
            }
            MacType::Gmac => {
                if status.contains(HwErrorStatus::TIST_OV) {
                    self.mac.write8(0, MacRegister::GmacTiStCtrl, GMT_ST_CLR_IRQ);
                }
                if status.contains(HwErrorStatus::SENSOR) {
                    self.mac.write32(0, MacRegister::I2cIrq, I2C_CLR_IRQ);
                }
            }
        }

        if status.contains(HwErrorStatus::RAM_RD_PAR) {
            self.mac.write16(0, MacRegister::RiCtrl, RI_CLR_RD_PERR);
            log::error!("RAM read parity error");
            self.queue(EventClass::Driver, DriverEvent::AdapterFail, EventParam::default());
        }

        if status.contains(HwErrorStatus::RAM_WR_PAR) {
            self.mac.write16(0, MacRegister::RiCtrl, RI_CLR_WR_PERR);
            log::error!("RAM write parity error");
            self.queue(EventClass::Driver, DriverEvent::AdapterFail, EventParam::default());
        }

        if status.contains(HwErrorStatus::M1_PAR_ERR) {
            self.mac_parity(0);
        }
        if status.contains(HwErrorStatus::M2_PAR_ERR) {
            self.mac_parity(1);
        }

        for (flag, queue, port) in [
            (HwErrorStatus::R1_PAR_ERR, Queue::R1, 0),
            (HwErrorStatus::R2_PAR_ERR, Queue::R2, 1),
        ] {
            if status.contains(flag) {
                self.mac.write32(0, MacRegister::Csr(queue), CSR_IRQ_CL_P);
                log::error!("Port {}: receive queue parity error", port);
                self.port_failed(port);
            }
        }
    }

    /// Parity errors are expected until large frames have gone out once;
    /// after that they fail the port.
    fn mac_parity(&mut self, port: usize) {
        let Some(record) = self.ports[port].as_ref() else {
            log::error!("Port {}: parity error on a missing MAC", port);
            return;
        };
        let check_parity = record.check_parity;
        let mac_type = record.phy_type.mac_type();

        match mac_type {
            MacType::Xmac => self.mac.write16(port, MacRegister::TxMffCtrl1, MFF_CLR_PERR),
            MacType::Gmac => self.mac.write8(port, MacRegister::TxGmfCtrl, GMF_CLI_TX_PE),
        }

        if check_parity {
            log::error!("Port {}: MAC parity error", port);
            self.port_failed(port);
            return;
        }

        let tx_max = match mac_type {
            MacType::Xmac => {
                self.mac.update_stats(port).ignore();
                self.mac.statistic(port, Counter::TxMaxSize)
            }
            MacType::Gmac => self.mac.statistic(port, Counter::Tx1518),
        };

        if tx_max > 0 {
            if let Some(record) = self.ports[port].as_mut() {
                record.check_parity = true;
            }
        }
    }

    fn arbiter_timeout(&mut self, index: usize, arbiter: &Arbiter, status: IrqStatus) {
        if !status.intersects(arbiter.rx | arbiter.tx) {
            return;
        }

        if self.ports[index]
            .as_ref()
            .map_or(true, |port| port.state == PortState::Reset)
        {
            log::error!("Port {}: packet arbiter timeout before init", index);
        }

        if status.contains(arbiter.rx) {
            // The network is filling us up
            log::error!("Port {}: receive packet arbiter timeout", index);
            self.mac.write16(0, MacRegister::PaCtrl, arbiter.clear_rx);
        }

        if !status.contains(arbiter.tx) {
            return;
        }

        // Normal on a slow network, unless half duplex has hung the transmitter
        self.mac.write16(0, MacRegister::PaCtrl, arbiter.clear_tx);

        let Some(port) = self.ports[index].as_mut() else {
            return;
        };
        if !port.link_mode_status.is_half() || port.half_dup_timer_active {
            return;
        }

        port.half_dup_timer_active = true;
        port.last_octets = self.mac.tx_octets(index);
        let timer = port.half_dup_timer;
        self.timers.start(
            &mut self.queue,
            timer,
            self.config.halfdup_check_time,
            EventClass::HwAccess,
            HwEvent::HalfDupChk,
            EventParam::port(index),
        );
    }

    fn phy_irq(&mut self, index: usize) {
        let Some(port) = self.ports[index].as_mut() else {
            return;
        };
        if port.state == PortState::Reset || port.phy_type == PhyType::Xmac {
            return;
        }

        let family = port.phy_type.family();
        let mut link = Link::new(&mut self.mac, port, &self.config);
        let Some(status) = family.interrupt_pending(&mut link) else {
            return;
        };
        log::debug!("Port {}: PHY interrupt {:#06x}", index, status);

        if let PhyIrq::LinkDown { restart_timer } = family.irq(&mut link, status) {
            self.queue_link_down(index);
            if restart_timer {
                self.start_wa_timer(index, self.config.wa_inactive_time)
                    .ignore();
            }
        }
    }

    fn mac_irq(&mut self, index: usize) {
        let Some(port) = self.ports[index].as_mut() else {
            return;
        };
        let result = mac::irq(&mut Link::new(&mut self.mac, port, &self.config));

        if result.link_down {
            self.queue_link_down(index);
            self.start_wa_timer(index, self.config.wa_inactive_time)
                .ignore();
        }

        if let Some(bits) = result.counter_overflow {
            self.queue(
                EventClass::Pnmi,
                PnmiEvent::SirqOverflow,
                EventParam::pair(index as u32, bits.into()),
            );
        }
    }

    /// Handles a `HwAccess` record.
    pub(crate) fn hw_event(
        &mut self,
        record: &EventRecord,
        collaborators: &mut impl Collaborators,
    ) -> Result<(), Error> {
        let Ok(event) = HwEvent::try_from(record.event) else {
            log::error!("Unknown hardware event {}", record.event);
            return Ok(());
        };

        let port = record.port();
        let param = record.param;
        let Some((link_up, phy_type)) = self.port(port).map(|p| (p.hw_link_up, p.phy_type)) else {
            log::error!("{:?} for missing port {}", event, port);
            return Ok(());
        };
        let value = param.para32()[1];

        match event {
            HwEvent::WaTimer => self.wa_timer(port, param, collaborators)?,
            HwEvent::PortStart => {
                if link_up {
                    // Must reach RLMT before the reset is scheduled
                    collaborators.rlmt(RlmtEvent::LinkDown, param)?;
                }
                self.link(port)?.link_down();
                self.queue(EventClass::Driver, DriverEvent::PortReset, param);
                self.start_wa_timer(port, self.config.wa_inactive_time)?;
            }
            HwEvent::PortStop => {
                if link_up {
                    collaborators.rlmt(RlmtEvent::LinkDown, param)?;
                }
                let timer = self.port_mut(port)?.wa_timer;
                self.timers.stop(timer);
                self.link(port)?.link_down();
            }
            HwEvent::UpdateStat => {}
            HwEvent::ClearStat => {
                for record in self.ports.iter_mut().flatten() {
                    record.clear_errata_counters();
                }
            }
            HwEvent::SetLinkMode => match LinkMode::try_from(value) {
                Ok(mode) => {
                    let record = self.port_mut(port)?;
                    if record.link_mode_conf != mode {
                        record.link_mode_conf = mode;
                        self.restart_port(param);
                    }
                }
                Err(()) => log::error!("Port {}: bad link mode {}", port, value),
            },
            HwEvent::SetFlowMode => match FlowCtrlMode::try_from(value) {
                Ok(mode) => {
                    let record = self.port_mut(port)?;
                    if record.flow_ctrl_mode != mode {
                        record.flow_ctrl_mode = mode;
                        self.restart_port(param);
                    }
                }
                Err(()) => log::error!("Port {}: bad flow control mode {}", port, value),
            },
            HwEvent::SetRole => match MsMode::try_from(value) {
                Ok(_) if !phy_type.is_copper() => {
                    log::debug!("Port {}: role is fixed on fiber", port);
                }
                Ok(mode) => {
                    let record = self.port_mut(port)?;
                    if record.ms_mode != mode {
                        record.ms_mode = mode;
                        self.restart_port(param);
                    }
                }
                Err(()) => log::error!("Port {}: bad role {}", port, value),
            },
            HwEvent::SetSpeed => match LinkSpeed::try_from(value) {
                Ok(_) if phy_type != PhyType::MarvCopper => {
                    log::debug!("Port {}: speed is fixed on {:?}", port, phy_type);
                }
                Ok(speed) => {
                    let record = self.port_mut(port)?;
                    if record.link_speed != speed {
                        record.link_speed = speed;
                        self.restart_port(param);
                    }
                }
                Err(()) => log::error!("Port {}: bad speed {}", port, value),
            },
            HwEvent::HalfDupChk => {
                let record = self.port_mut(port)?;
                record.half_dup_timer_active = false;
                if record.link_mode_status.is_half() {
                    let last_octets = record.last_octets;
                    if self.mac.tx_octets(port) == last_octets {
                        log::warn!("Port {}: transmitter hung in half duplex", port);
                        mac::flush_tx_fifo(&mut self.link(port)?);
                    }
                }
            }
        }

        Ok(())
    }

    fn wa_timer(
        &mut self,
        port: usize,
        param: EventParam,
        collaborators: &mut impl Collaborators,
    ) -> Result<(), Error> {
        match self.link(port)?.check_link_up() {
            LinkCheck::NoAction => {}
            LinkCheck::Restart { next_mode } => {
                // A failed RLMT delivery leaves this record queued. The port
                // is already down by then, and the next dispatch runs the
                // check again and finishes the restart.
                if self.port_mut(port)?.hw_link_up {
                    self.link(port)?.link_down();
                    collaborators.rlmt(RlmtEvent::LinkDown, param)?;
                }
                if let Some(mode) = next_mode {
                    self.link(port)?.sense_set_next(mode);
                }
                self.queue(EventClass::Driver, DriverEvent::PortReset, param);
            }
            LinkCheck::LinkEstablished => self.queue(EventClass::Rlmt, RlmtEvent::LinkUp, param),
        }

        let micros = if self.port_mut(port)?.hw_link_up {
            self.config.wa_active_time
        } else {
            self.config.wa_inactive_time
        };
        self.start_wa_timer(port, micros)
    }

    fn restart_port(&mut self, param: EventParam) {
        self.queue(EventClass::HwAccess, HwEvent::PortStop, param);
        self.queue(EventClass::HwAccess, HwEvent::PortStart, param);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bcom;
    use crate::config::PortConfig;
    use crate::mac::XM_MD_FTF;
    use crate::port::LinkModeStatus;
    use crate::testing::{adapter, tick, Delivery, Recorder, TestAdapter};
    use std::vec::Vec;

    fn events(adapter: &mut TestAdapter) -> Vec<Delivery> {
        let mut recorder = Recorder::default();
        adapter.dispatch(&mut recorder).unwrap();
        recorder.deliveries
    }

    #[test]
    fn queue_check_fails_port_then_link() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Xmac)]);
        adapter.sirq_isr(IrqStatus::R1_C);

        assert_eq!(
            adapter.mac().written(0, MacRegister::Csr(Queue::R1)),
            [CSR_IRQ_CL_C]
        );
        assert_eq!(
            events(&mut adapter),
            [
                Delivery::queued(EventClass::Driver, DriverEvent::PortFail, 0),
                Delivery::queued(EventClass::Rlmt, RlmtEvent::LinkDown, 0),
            ]
        );
    }

    #[test]
    fn ram_parity_fails_adapter() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Xmac)]);
        adapter.mac_mut().set(
            0,
            MacRegister::HweIsrc,
            (HwErrorStatus::RAM_WR_PAR | HwErrorStatus::NO_STAT_M1).bits(),
        );
        adapter.sirq_isr(IrqStatus::HW_ERR);

        assert_eq!(adapter.mac().written(0, MacRegister::RiCtrl), [u32::from(RI_CLR_WR_PERR)]);
        assert_eq!(
            adapter.mac().written(0, MacRegister::RxMffCtrl1),
            [u32::from(MFF_CLR_INSTAT)]
        );
        assert_eq!(
            events(&mut adapter),
            [Delivery::queued(EventClass::Driver, DriverEvent::AdapterFail, 0)]
        );
    }

    #[test]
    fn mac_parity_armed_by_large_frames() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::MarvCopper)]);
        adapter
            .mac_mut()
            .set(0, MacRegister::HweIsrc, HwErrorStatus::M1_PAR_ERR.bits());

        adapter.sirq_isr(IrqStatus::HW_ERR);
        assert!(!adapter.port(0).unwrap().check_parity);
        assert_eq!(adapter.pending_events(), 0);

        adapter.mac_mut().stats.insert((0, Counter::Tx1518), 5);
        adapter.sirq_isr(IrqStatus::HW_ERR);
        assert!(adapter.port(0).unwrap().check_parity);
        assert_eq!(adapter.pending_events(), 0);

        adapter.sirq_isr(IrqStatus::HW_ERR);
        assert_eq!(
            events(&mut adapter),
            [
                Delivery::queued(EventClass::Driver, DriverEvent::PortFail, 0),
                Delivery::queued(EventClass::Rlmt, RlmtEvent::LinkDown, 0),
            ]
        );
        assert_eq!(
            adapter.mac().written(0, MacRegister::TxGmfCtrl),
            [u32::from(GMF_CLI_TX_PE); 3]
        );
    }

    #[test]
    fn half_duplex_hang_flushes_fifo() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Xmac)]);
        let mut recorder = Recorder::default();
        adapter.set_port_state(0, PortState::Run).unwrap();
        adapter.port_mut(0).unwrap().link_mode_status = LinkModeStatus::Half;
        adapter.mac_mut().tx_octets[0] = 1_000;

        adapter.sirq_isr(IrqStatus::PA_TO_TX1);
        assert_eq!(
            adapter.mac().written(0, MacRegister::PaCtrl),
            [u32::from(PA_CLR_TO_TX1)]
        );
        let port = adapter.port(0).unwrap();
        assert!(port.half_dup_timer_active);
        assert_eq!(port.last_octets, 1_000);

        // Further timeouts while the check runs are ignored
        let half_dup_timer = port.half_dup_timer;
        adapter.sirq_isr(IrqStatus::PA_TO_TX1);
        assert_eq!(adapter.timers.remaining(half_dup_timer), Some(625_000));

        tick(&mut adapter, &mut recorder);
        assert!(!adapter.port(0).unwrap().half_dup_timer_active);
        assert_eq!(adapter.mac().get(0, MacRegister::XmMode), XM_MD_FTF);

        // Transmitter moved on; no flush this time
        adapter.sirq_isr(IrqStatus::PA_TO_TX1);
        adapter.mac_mut().tx_octets[0] = 2_000;
        tick(&mut adapter, &mut recorder);
        assert_eq!(adapter.mac().written(0, MacRegister::XmMode).len(), 1);
        assert!(recorder.deliveries.is_empty());
    }

    #[test]
    fn full_duplex_skips_hang_check() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Xmac)]);
        adapter.port_mut(0).unwrap().link_mode_status = LinkModeStatus::AutoFull;
        adapter.sirq_isr(IrqStatus::PA_TO_TX1 | IrqStatus::PA_TO_RX1);

        assert_eq!(
            adapter.mac().written(0, MacRegister::PaCtrl),
            [u32::from(PA_CLR_TO_RX1), u32::from(PA_CLR_TO_TX1)]
        );
        assert_eq!(adapter.active_timers(), 0);
    }

    #[test]
    fn bcom_link_change_takes_link_down() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Bcom)]);
        adapter.set_port_state(0, PortState::Run).unwrap();
        adapter.link_up(0).unwrap();
        adapter.mac_mut().set_phy(0, bcom::INT_STAT, bcom::IS_LST_CHANGE);
        adapter.mac_mut().set_phy(0, bcom::INT_MASK, bcom::DEF_MSK);

        adapter.sirq_isr(IrqStatus::EXT_REG);

        let port = adapter.port(0).unwrap();
        assert!(!port.hw_link_up);
        assert!(adapter.timers.is_active(port.wa_timer));
        assert_eq!(
            events(&mut adapter),
            [Delivery::queued(EventClass::Rlmt, RlmtEvent::LinkDown, 0)]
        );
    }

    #[test]
    fn phy_interrupts_skip_ports_in_reset() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Bcom)]);
        adapter.mac_mut().set_phy(0, bcom::INT_STAT, bcom::IS_LST_CHANGE);

        adapter.sirq_isr(IrqStatus::EXT_REG);
        assert!(adapter.mac().phy_writes.is_empty());
        assert_eq!(adapter.pending_events(), 0);
    }

    #[test]
    fn mac_counter_overflow_goes_to_pnmi() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::MarvCopper)]);
        adapter.mac_mut().set(
            0,
            MacRegister::GmacIrqSrc,
            u32::from(crate::mac::GM_IS_RX_CO_OV),
        );
        adapter.sirq_isr(IrqStatus::MAC1 | IrqStatus::LNK_SYNC_M1);

        assert_eq!(
            adapter.mac().written(0, MacRegister::LnkSyncCtrl),
            [u32::from(LED_CLR_IRQ)]
        );
        let delivered = events(&mut adapter);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].class, EventClass::Pnmi);
        assert_eq!(
            delivered[0].param.para32(),
            [0, u32::from(crate::mac::GM_IS_RX_CO_OV)]
        );
    }

    #[test]
    fn unchanged_link_mode_queues_nothing() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Bcom)]);
        adapter.set_link_mode(0, LinkMode::AutoSense).unwrap();
        assert!(events(&mut adapter).is_empty());
        assert_eq!(adapter.pending_events(), 0);
    }

    #[test]
    fn new_link_mode_restarts_port() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Bcom)]);
        adapter.set_link_mode(0, LinkMode::Half).unwrap();

        let delivered = events(&mut adapter);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].class, EventClass::Driver);
        assert_eq!(delivered[0].event, u32::from(DriverEvent::PortReset));

        let port = adapter.port(0).unwrap();
        assert_eq!(port.link_mode_conf, LinkMode::Half);
        assert_eq!(port.link_mode, LinkMode::Half);
        assert!(adapter.timers.is_active(port.wa_timer));
    }

    #[test]
    fn role_and_speed_depend_on_phy() {
        let mut adapter = adapter(&[
            PortConfig::new(PhyType::MarvFiber),
            PortConfig::new(PhyType::MarvCopper),
        ]);
        adapter.set_role(0, MsMode::Master).unwrap();
        adapter.set_speed(0, LinkSpeed::HundredMbps).unwrap();
        adapter.set_speed(1, LinkSpeed::HundredMbps).unwrap();
        let delivered = events(&mut adapter);

        assert_eq!(adapter.port(0).unwrap().ms_mode, MsMode::Auto);
        assert_eq!(adapter.port(0).unwrap().link_speed, LinkSpeed::Auto);
        assert_eq!(adapter.port(1).unwrap().link_speed, LinkSpeed::HundredMbps);
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].param.para32()[0], 1);
    }

    #[test]
    fn bad_values_are_ignored() {
        let mut adapter = adapter(&[PortConfig::new(PhyType::Bcom)]);
        adapter.queue(
            EventClass::HwAccess,
            HwEvent::SetFlowMode,
            EventParam::pair(0, 42),
        );
        adapter.queue(EventClass::HwAccess, HwEvent::PortStart, EventParam::port(5));

        assert!(events(&mut adapter).is_empty());
        assert_eq!(
            adapter.port(0).unwrap().flow_ctrl_mode,
            FlowCtrlMode::SymOrRem
        );
    }

    #[test]
    fn clear_stat_resets_every_port() {
        let configs = [PortConfig::new(PhyType::Xmac), PortConfig::new(PhyType::Xmac)];
        let mut adapter = adapter(&configs);
        for index in 0..2 {
            let port = adapter.port_mut(index).unwrap();
            port.prev_shorts = 4;
            port.prev_fcs = 9;
            port.prev_rx = 100;
        }

        adapter.clear_stats();
        assert!(events(&mut adapter).is_empty());
        assert!(adapter
            .ports()
            .all(|port| port.prev_shorts == 0 && port.prev_fcs == 0 && port.prev_rx == 0));
    }
}
