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

//! Per-port link transitions. A `Link` binds one port's state to the
//! register I/O layer for the duration of a single decision.

use crate::config::Config;
use crate::mac::{self, Mac, MacRegister, XM_IS_AND, XM_IS_LIPA_RC, XM_IS_RX_PAGE};
use crate::phy::{AutoNegError, LinkCheck, Register, STAT_AUTONEG_COMPLETE};
use crate::port::{
    FlowCtrlStatus, LinkMode, LinkModeStatus, LinkPartner, LinkSpeed, LinkSpeedStatus, Port,
};

pub struct Link<'a> {
    pub(crate) mac: &'a mut dyn Mac,
    pub(crate) port: &'a mut Port,
    pub(crate) config: &'a Config,
}

impl<'a> Link<'a> {
    pub fn new(mac: &'a mut dyn Mac, port: &'a mut Port, config: &'a Config) -> Link<'a> {
        Link { mac, port, config }
    }

    pub(crate) fn index(&self) -> usize {
        self.port.index
    }

    pub(crate) fn read8(&mut self, register: MacRegister) -> u8 {
        self.mac.read8(self.port.index, register)
    }

    pub(crate) fn write8(&mut self, register: MacRegister, data: u8) {
        self.mac.write8(self.port.index, register, data)
    }

    pub(crate) fn read16(&mut self, register: MacRegister) -> u16 {
        self.mac.read16(self.port.index, register)
    }

    pub(crate) fn write16(&mut self, register: MacRegister, data: u16) {
        self.mac.write16(self.port.index, register, data)
    }

    pub(crate) fn read32(&mut self, register: MacRegister) -> u32 {
        self.mac.read32(self.port.index, register)
    }

    pub(crate) fn write32(&mut self, register: MacRegister, data: u32) {
        self.mac.write32(self.port.index, register, data)
    }

    pub(crate) fn phy_read(&mut self, register: Register) -> u16 {
        self.mac.phy_read(self.port.index, register)
    }

    pub(crate) fn phy_write(&mut self, register: Register, data: u16) {
        self.mac.phy_write(self.port.index, register, data)
    }

    /// Resets the current mode to the start of the auto-sense cycle.
    pub fn init_def_sense(&mut self) {
        self.port.autoneg_timeout = 0;

        self.port.link_mode = match self.port.link_mode_conf {
            LinkMode::AutoSense => LinkMode::AutoFull,
            mode => mode,
        };
    }

    /// Mode to try after the current one failed.
    pub fn sense_get_next(&mut self) -> LinkMode {
        self.port.autoneg_timeout = 0;

        if self.port.link_mode_conf != LinkMode::AutoSense {
            return self.port.link_mode_conf;
        }

        match self.port.link_mode {
            LinkMode::AutoFull => LinkMode::AutoBoth,
            _ => LinkMode::AutoFull,
        }
    }

    pub fn sense_set_next(&mut self, mode: LinkMode) {
        self.port.autoneg_timeout = 0;

        if self.port.link_mode_conf == LinkMode::AutoSense {
            self.port.link_mode = mode;
        }
    }

    pub fn link_down(&mut self) {
        mac::irq_disable(self);
        mac::rx_tx_disable(self);
        self.init_def_sense();

        if !self.port.hw_link_up {
            return;
        }

        log::debug!("Port {}: link down", self.index());
        self.port.hw_link_up = false;
        self.port.link_mode_status = LinkModeStatus::Unknown;
        self.port.flow_ctrl_status = FlowCtrlStatus::None;
        self.port.link_speed_used = LinkSpeedStatus::Indeterminate;

        // Leave the PHY ready for the next negotiation
        self.init_phy(false);
    }

    pub fn link_up(&mut self) {
        if self.port.hw_link_up {
            return;
        }

        log::debug!("Port {}: link up", self.index());
        self.port.hw_link_up = true;
        self.port.autoneg_fail = false;
        self.port.link_mode_status = LinkModeStatus::Unknown;

        let status = match self.port.link_mode {
            LinkMode::Half => LinkModeStatus::Half,
            LinkMode::Full => LinkModeStatus::Full,
            _ => return,
        };

        // Nothing to negotiate; the configuration is the result
        self.port.link_speed_used = match self.port.link_speed {
            LinkSpeed::Auto | LinkSpeed::ThousandMbps => LinkSpeedStatus::ThousandMbps,
            LinkSpeed::HundredMbps => LinkSpeedStatus::HundredMbps,
            LinkSpeed::TenMbps => LinkSpeedStatus::TenMbps,
        };
        self.port.link_mode_status = status;
        self.port.flow_ctrl_status = FlowCtrlStatus::None;
        mac::rx_tx_enable(self);
    }

    pub fn init_phy(&mut self, loopback: bool) {
        let family = self.port.phy_type.family();
        family.init(self, loopback);
    }

    pub fn check_link_up(&mut self) -> LinkCheck {
        let family = self.port.phy_type.family();
        family.check_link_up(self)
    }

    /// Applies the result of a completed auto-negotiation.
    pub fn autoneg_done(&mut self) -> Result<(), AutoNegError> {
        let family = self.port.phy_type.family();
        if let Err(err) = family.autoneg_done(self) {
            log::debug!("Port {}: auto-negotiation failed: {:?}", self.index(), err);
            self.port.autoneg_fail = true;
            return Err(err);
        }

        log::debug!(
            "Port {}: negotiated {:?} {:?} flow {:?}",
            self.index(),
            self.port.link_speed_used,
            self.port.link_mode_status,
            self.port.flow_ctrl_status
        );
        self.port.autoneg_fail = false;
        mac::rx_tx_enable(self);
        Ok(())
    }

    /// Brings the link up and reads the negotiation result.
    pub(crate) fn complete_autoneg(&mut self) -> Result<(), AutoNegError> {
        self.link_up();
        self.autoneg_done()
    }

    /// Restart decision after a failed negotiation. Only a duplex mismatch
    /// moves auto-sense on to the next mode.
    pub(crate) fn autoneg_failed(&mut self, err: AutoNegError) -> LinkCheck {
        let next = self.sense_get_next();
        LinkCheck::Restart {
            next_mode: match err {
                AutoNegError::DuplexMismatch => Some(next),
                AutoNegError::Other => None,
            },
        }
    }

    /// Another tick without negotiation completing.
    pub(crate) fn autoneg_pending(&mut self) -> LinkCheck {
        self.port.autoneg_timeout += 1;
        if self.port.autoneg_timeout < self.config.autoneg_max_ticks {
            return LinkCheck::NoAction;
        }

        self.port.autoneg_timeout = 0;
        self.port.autoneg_timeout_count = self.port.autoneg_timeout_count.saturating_add(1);
        log::debug!(
            "Port {}: auto-negotiation timeout {}",
            self.index(),
            self.port.autoneg_timeout_count
        );

        if self.port.link_mode_conf == LinkMode::AutoSense {
            if self.port.lipa_autoneg != LinkPartner::Auto {
                // The partner does not negotiate; try a manual link
                self.sense_set_next(LinkMode::Full);
            } else if self.port.autoneg_timeout_count >= self.config.max_autoneg_timeouts {
                log::debug!("Port {}: starting auto-sense over", self.index());
                self.port.autoneg_timeout_count = 0;
                self.port.lipa_autoneg = LinkPartner::Unknown;
                self.init_def_sense();
            }
        }

        LinkCheck::RESTART
    }

    pub(crate) fn detect_partner_phy(&mut self, status: u16) {
        if self.port.lipa_autoneg != LinkPartner::Auto && status & STAT_AUTONEG_COMPLETE != 0 {
            log::debug!("Port {}: link partner negotiates", self.index());
            self.port.lipa_autoneg = LinkPartner::Auto;
        }
    }

    pub(crate) fn detect_partner_isrc(&mut self, status: u16) {
        if self.port.lipa_autoneg != LinkPartner::Auto
            && status & (XM_IS_LIPA_RC | XM_IS_RX_PAGE | XM_IS_AND) != 0
        {
            log::debug!("Port {}: link partner negotiates", self.index());
            self.port.lipa_autoneg = LinkPartner::Auto;
        }
    }
}
