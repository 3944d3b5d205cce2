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

//! Marvell PHY behind a GMAC, in copper or fiber mode.

use crate::link::Link;
use crate::phy::{
    pause_advertisement, pause_advertisement_x, resolve_pause, AutoNegError, LinkCheck, Phy,
    PhyIrq, PhyType, Register, ADV_100_FULL, ADV_100_HALF, ADV_10_FULL, ADV_10_HALF,
    ADV_REMOTE_FAULT, ADV_X_FULL, ADV_X_HALF, CTRL_AUTONEG_ENABLE, CTRL_FULL_DUPLEX,
    CTRL_LOOPBACK, CTRL_RESET, CTRL_RESTART_AUTONEG, CTRL_SPEED_100, CTRL_SPEED_1000,
    GBCR_ADV_1000_FULL, GBCR_ADV_1000_HALF, GBCR_MS_MANUAL, GBCR_MS_MASTER, GBSR_MS_FAULT,
    GBSR_MS_MASTER, STAT_AUTONEG_COMPLETE,
};
use crate::port::{LinkMode, LinkModeStatus, LinkSpeed, LinkSpeedStatus, MsMode, MsStatus};

pub const PHY_CTRL: Register = Register::Vendor(0x10);
pub const PHY_STAT: Register = Register::Vendor(0x11);
pub const INT_MASK: Register = Register::Vendor(0x12);
pub const INT_STAT: Register = Register::Vendor(0x13);
pub const EXT_CTRL: Register = Register::Vendor(0x14);
pub const LED_CTRL: Register = Register::Vendor(0x18);

// PHY specific control
pub const PC_FL_GOOD: u16 = 1 << 10;

// PHY specific status
pub const PS_SPEED_MASK: u16 = 3 << 14;
pub const PS_SPEED_1000: u16 = 1 << 15;
pub const PS_SPEED_100: u16 = 1 << 14;
pub const PS_FULL_DUP: u16 = 1 << 13;
pub const PS_SPDUP_RES: u16 = 1 << 11;
pub const PS_LINK_UP: u16 = 1 << 10;
pub const PS_CABLE_MASK: u16 = 7 << 7;
pub const PS_TX_P_EN: u16 = 1 << 3;
pub const PS_RX_P_EN: u16 = 1 << 2;

// Interrupt status and mask
pub const IS_AN_ERROR: u16 = 1 << 15;
pub const IS_LSP_CHANGE: u16 = 1 << 14;
pub const IS_AN_PR: u16 = 1 << 12;
pub const IS_LST_CHANGE: u16 = 1 << 10;
pub const IS_FIFO_ERROR: u16 = 1 << 7;

/// Interrupts enabled while the link is up.
pub const DEF_MSK: u16 = IS_LSP_CHANGE | IS_LST_CHANGE | IS_FIFO_ERROR;

// Extended PHY specific control
const EC_M_DSC_MASK: u16 = 3 << 10;
const EC_S_DSC_MASK: u16 = 3 << 8;
const EC_MAC_S_MASK: u16 = 7 << 4;
const EC_M_DSC: u16 = 1 << 10;
const EC_S_DSC: u16 = 1 << 8;
const EC_MAC_S_25MHZ: u16 = 7 << 4;

// LED control
const LED_PULS_170MS: u16 = 4 << 12;
const LED_BLINK_84MS: u16 = 2 << 8;

pub struct Marvell;

impl Phy for Marvell {
    fn check_link_up(&self, link: &mut Link<'_>) -> LinkCheck {
        let isrc = link.phy_read(INT_STAT);

        if link.port.hw_link_up {
            return LinkCheck::NoAction;
        }

        let status = link.phy_read(Register::BasicStatus);
        link.detect_partner_phy(status);

        let gbsr = link.phy_read(Register::GigabitStatus);
        if gbsr & GBSR_MS_FAULT != 0 {
            log::debug!("Port {}: master/slave fault", link.index());
            link.port.autoneg_fail = true;
            link.port.ms_status = MsStatus::Fault;
            return LinkCheck::RESTART;
        }

        let specific = link.phy_read(PHY_STAT);
        if specific & PS_LINK_UP == 0 {
            return LinkCheck::NoAction;
        }

        link.port.ms_status = if gbsr & GBSR_MS_MASTER != 0 {
            MsStatus::Master
        } else {
            MsStatus::Slave
        };
        link.port.cable_len = ((specific & PS_CABLE_MASK) >> 7) as u8;

        if !link.port.is_autoneg() {
            link.link_up();
            return LinkCheck::LinkEstablished;
        }

        if status & STAT_AUTONEG_COMPLETE == 0 {
            return LinkCheck::NoAction;
        }

        match link.complete_autoneg() {
            Ok(()) => LinkCheck::LinkEstablished,
            Err(err) => {
                log::debug!(
                    "Port {}: interrupt status {:#06x}, specific status {:#06x}",
                    link.index(),
                    isrc,
                    specific
                );
                link.autoneg_failed(err)
            }
        }
    }

    fn autoneg_done(&self, link: &mut Link<'_>) -> Result<(), AutoNegError> {
        let partner = link.phy_read(Register::AutoPartnerAbility);
        if partner & ADV_REMOTE_FAULT != 0 {
            log::debug!("Port {}: remote fault {:#06x}", link.index(), partner);
            return Err(AutoNegError::Other);
        }

        let gbsr = link.phy_read(Register::GigabitStatus);
        if gbsr & GBSR_MS_FAULT != 0 {
            link.port.ms_status = MsStatus::Fault;
            return Err(AutoNegError::Other);
        }
        link.port.ms_status = if gbsr & GBSR_MS_MASTER != 0 {
            MsStatus::Master
        } else {
            MsStatus::Slave
        };

        let specific = link.phy_read(PHY_STAT);
        if specific & PS_SPDUP_RES == 0 {
            link.port.link_mode_status = LinkModeStatus::Unknown;
            return Err(AutoNegError::DuplexMismatch);
        }

        link.port.link_mode_status = if specific & PS_FULL_DUP != 0 {
            LinkModeStatus::AutoFull
        } else {
            LinkModeStatus::AutoHalf
        };

        link.port.flow_ctrl_status =
            resolve_pause(specific & PS_RX_P_EN != 0, specific & PS_TX_P_EN != 0);

        link.port.link_speed_used = match specific & PS_SPEED_MASK {
            PS_SPEED_1000 => LinkSpeedStatus::ThousandMbps,
            PS_SPEED_100 => LinkSpeedStatus::HundredMbps,
            _ => LinkSpeedStatus::TenMbps,
        };
        Ok(())
    }

    fn init(&self, link: &mut Link<'_>, loopback: bool) {
        let fiber = link.port.phy_type == PhyType::MarvFiber;
        let mut ctrl = 0;
        let mut gbcr = 0;
        let mut adv = 0;

        if !loopback {
            let ext = link.phy_read(EXT_CTRL) & !(EC_M_DSC_MASK | EC_S_DSC_MASK | EC_MAC_S_MASK);
            link.phy_write(EXT_CTRL, ext | EC_M_DSC | EC_S_DSC | EC_MAC_S_25MHZ);

            // The clock change only takes effect after a soft reset
            let ctrl = link.phy_read(Register::BasicControl);
            link.phy_write(Register::BasicControl, ctrl | CTRL_RESET);
        }

        if link.port.ms_mode != MsMode::Auto {
            gbcr |= GBCR_MS_MANUAL;
            if link.port.ms_mode == MsMode::Master {
                gbcr |= GBCR_MS_MASTER;
            }
        }

        if !link.port.is_autoneg() {
            if link.port.link_mode == LinkMode::Full {
                ctrl |= CTRL_FULL_DUPLEX;
            }
            if link.port.ms_mode == MsMode::Auto {
                gbcr |= GBCR_MS_MANUAL;
            }

            ctrl |= match link.port.link_speed {
                LinkSpeed::Auto | LinkSpeed::ThousandMbps => CTRL_SPEED_1000,
                LinkSpeed::HundredMbps => CTRL_SPEED_100,
                LinkSpeed::TenMbps => 0,
            };

            if !loopback {
                ctrl |= CTRL_RESET;
            }
        } else {
            ctrl |= CTRL_AUTONEG_ENABLE;

            if fiber {
                adv |= match link.port.link_mode {
                    LinkMode::AutoHalf => ADV_X_HALF,
                    LinkMode::AutoFull => ADV_X_FULL,
                    _ => ADV_X_HALF | ADV_X_FULL,
                };
                adv |= pause_advertisement_x(link.port.flow_ctrl_mode);
            } else {
                let (gigabit, fast) = match link.port.link_speed {
                    LinkSpeed::Auto => (
                        GBCR_ADV_1000_HALF | GBCR_ADV_1000_FULL,
                        ADV_100_FULL | ADV_100_HALF | ADV_10_FULL | ADV_10_HALF,
                    ),
                    LinkSpeed::ThousandMbps => (GBCR_ADV_1000_HALF | GBCR_ADV_1000_FULL, 0),
                    LinkSpeed::HundredMbps => (0, ADV_100_FULL | ADV_100_HALF),
                    LinkSpeed::TenMbps => (0, ADV_10_FULL | ADV_10_HALF),
                };
                gbcr |= gigabit;
                adv |= fast;

                // Drop the duplex modes that are not wanted
                match link.port.link_mode {
                    LinkMode::AutoHalf => {
                        gbcr &= !GBCR_ADV_1000_FULL;
                        adv &= !(ADV_100_FULL | ADV_10_FULL);
                    }
                    LinkMode::AutoFull => {
                        gbcr &= !GBCR_ADV_1000_HALF;
                        adv &= !(ADV_100_HALF | ADV_10_HALF);
                    }
                    _ => {}
                }

                adv |= pause_advertisement(link.port.flow_ctrl_mode);
            }

            if !loopback {
                ctrl |= CTRL_RESTART_AUTONEG;
            }
        }

        link.phy_write(Register::GigabitControl, gbcr);
        link.phy_write(Register::AutoAdvertisement, adv);

        if loopback {
            ctrl |= CTRL_LOOPBACK;

            // Force link good so the loop runs without a partner
            let specific = link.phy_read(PHY_CTRL);
            link.phy_write(PHY_CTRL, specific | PC_FL_GOOD);
        }

        link.phy_write(Register::BasicControl, ctrl);
        link.phy_write(LED_CTRL, LED_PULS_170MS | LED_BLINK_84MS);
    }

    fn interrupt_pending(&self, link: &mut Link<'_>) -> Option<u16> {
        let status = link.phy_read(INT_STAT);
        let mask = link.phy_read(INT_MASK);
        (status & mask != 0).then_some(status)
    }

    fn irq(&self, link: &mut Link<'_>, status: u16) -> PhyIrq {
        let mut result = PhyIrq::None;

        if status & (IS_AN_PR | IS_LST_CHANGE) != 0 {
            link.link_down();
            result = PhyIrq::LinkDown {
                restart_timer: false,
            };
        }

        if status & IS_AN_ERROR != 0 {
            log::error!("Port {}: auto-negotiation error", link.index());
        }

        if status & IS_FIFO_ERROR != 0 {
            log::error!("Port {}: PHY FIFO error", link.index());
        }

        result
    }
}
