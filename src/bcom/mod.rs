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

//! Broadcom 1000BASE-T PHY behind an XMAC II.

use crate::link::Link;
use crate::phy::{
    pause_advertisement, resolve_pause, AutoNegError, LinkCheck, Phy, PhyIrq, Register,
    ADV_REMOTE_FAULT, ADV_SELECTOR_802_3, CTRL_AUTONEG_ENABLE, CTRL_FULL_DUPLEX, CTRL_LOOPBACK,
    CTRL_RESTART_AUTONEG, CTRL_SPEED_1000, GBCR_ADV_1000_FULL, GBCR_ADV_1000_HALF, GBCR_MS_MANUAL,
    GBCR_MS_MASTER, GBCR_REPEATER, GBSR_MS_FAULT, GBSR_MS_MASTER, STAT_AUTONEG_COMPLETE,
    STAT_LINK_SYNC,
};
use crate::port::{LinkMode, LinkModeStatus, LinkSpeedStatus, MsMode, MsStatus};

pub const P_EXT_CTRL: Register = Register::Vendor(0x10);
pub const AUX_CTRL: Register = Register::Vendor(0x18);
pub const AUX_STAT: Register = Register::Vendor(0x19);
pub const INT_STAT: Register = Register::Vendor(0x1A);
pub const INT_MASK: Register = Register::Vendor(0x1B);

// Extended control
pub const PEC_HIGH_LA: u16 = 1 << 3;

// Auxiliary control
pub const AUX_LONG_PACK: u16 = 1 << 14;
pub const AUX_TX_TEST: u16 = 1 << 10;
pub const AUX_DIS_PM: u16 = 1 << 5;

// Auxiliary status
pub const AUX_RES_MASK: u16 = 7 << 8;
pub const AUX_RES_1000FD: u16 = 7 << 8;
pub const AUX_RES_1000HD: u16 = 6 << 8;
pub const AUX_PAUSE_RX: u16 = 1 << 1;
pub const AUX_PAUSE_TX: u16 = 1 << 0;

// Interrupt status and mask
pub const IS_PSE: u16 = 1 << 14;
pub const IS_AN_PR: u16 = 1 << 10;
pub const IS_NO_HDCL: u16 = 1 << 9;
pub const IS_LST_CHANGE: u16 = 1 << 1;

/// Interrupt mask while the link is up; set bits are masked.
pub const DEF_MSK: u16 = !(IS_PSE | IS_AN_PR | IS_LST_CHANGE);

pub struct Bcom;

impl Phy for Bcom {
    fn check_link_up(&self, link: &mut Link<'_>) -> LinkCheck {
        let isrc = link.phy_read(INT_STAT);
        if isrc & IS_NO_HDCL != 0 {
            // No highest common denominator: kick the PHY with a short loopback
            log::debug!("Port {}: no HCD, toggling loopback", link.index());
            let ctrl = link.phy_read(Register::BasicControl);
            link.phy_write(Register::BasicControl, ctrl | CTRL_LOOPBACK);
            link.phy_write(Register::BasicControl, ctrl & !CTRL_LOOPBACK);
        }

        // Link status is latched low
        link.phy_read(Register::BasicStatus);

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

        if status & STAT_LINK_SYNC == 0 {
            return LinkCheck::NoAction;
        }

        link.port.ms_status = if gbsr & GBSR_MS_MASTER != 0 {
            MsStatus::Master
        } else {
            MsStatus::Slave
        };

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
                let partner = link.phy_read(Register::AutoPartnerAbility);
                log::debug!(
                    "Port {}: partner {:#06x}, 1000T status {:#06x}",
                    link.index(),
                    partner,
                    gbsr
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

        let aux = link.phy_read(AUX_STAT);
        link.port.link_mode_status = match aux & AUX_RES_MASK {
            AUX_RES_1000FD => LinkModeStatus::AutoFull,
            AUX_RES_1000HD => LinkModeStatus::AutoHalf,
            _ => return Err(AutoNegError::DuplexMismatch),
        };

        link.port.flow_ctrl_status =
            resolve_pause(aux & AUX_PAUSE_RX != 0, aux & AUX_PAUSE_TX != 0);
        link.port.link_speed_used = LinkSpeedStatus::ThousandMbps;
        Ok(())
    }

    fn init(&self, link: &mut Link<'_>, loopback: bool) {
        let mut ctrl = CTRL_SPEED_1000;
        let mut gbcr = 0;
        let mut adv = ADV_SELECTOR_802_3;
        let mut ext = 0;
        let mut aux = AUX_TX_TEST;

        match link.port.ms_mode {
            MsMode::Master => gbcr |= GBCR_MS_MANUAL | GBCR_MS_MASTER,
            MsMode::Slave => gbcr |= GBCR_MS_MANUAL,
            MsMode::Auto => {}
        }

        if !link.port.is_autoneg() {
            if link.port.link_mode == LinkMode::Full {
                ctrl |= CTRL_FULL_DUPLEX;
            }
            if link.port.ms_mode == MsMode::Auto {
                gbcr |= GBCR_MS_MANUAL;
            }
        } else {
            // Advertising as a DTE fails against some switches
            gbcr |= GBCR_REPEATER;

            gbcr |= match link.port.link_mode {
                LinkMode::AutoHalf => GBCR_ADV_1000_HALF,
                LinkMode::AutoFull => GBCR_ADV_1000_FULL,
                _ => GBCR_ADV_1000_HALF | GBCR_ADV_1000_FULL,
            };
            adv |= pause_advertisement(link.port.flow_ctrl_mode);

            ctrl |= CTRL_AUTONEG_ENABLE | CTRL_RESTART_AUTONEG;
        }

        link.phy_write(Register::GigabitControl, gbcr);
        link.phy_write(Register::AutoAdvertisement, adv);

        if loopback {
            ctrl |= CTRL_LOOPBACK;
        }

        if link.config.jumbo {
            ext |= PEC_HIGH_LA;
            aux |= AUX_LONG_PACK;
            link.phy_write(AUX_CTRL, aux);
        }

        link.phy_write(P_EXT_CTRL, ext);
        link.phy_write(Register::BasicControl, ctrl);
    }

    fn interrupt_pending(&self, link: &mut Link<'_>) -> Option<u16> {
        let status = link.phy_read(INT_STAT);
        let mask = link.phy_read(INT_MASK);
        (status & !mask != 0).then_some(status)
    }

    fn irq(&self, link: &mut Link<'_>, status: u16) -> PhyIrq {
        if status & IS_PSE != 0 {
            log::error!("Port {}: uncorrectable pair swap error", link.index());
        }

        if status & (IS_AN_PR | IS_LST_CHANGE) != 0 {
            link.link_down();
            return PhyIrq::LinkDown {
                restart_timer: true,
            };
        }

        PhyIrq::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::PhyType;
    use crate::port::{FlowCtrlStatus, PortState};
    use crate::testing::{FakeMac, TestPort};

    fn port(mode: LinkMode) -> TestPort {
        TestPort::new(PhyType::Bcom, mode)
    }

    #[test]
    fn no_hcd_toggles_loopback() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, INT_STAT, IS_NO_HDCL);
        mac.set_phy(0, Register::BasicControl, CTRL_SPEED_1000);
        let mut port = port(LinkMode::AutoBoth);

        assert_eq!(Bcom.check_link_up(&mut port.link(&mut mac)), LinkCheck::NoAction);
        assert_eq!(
            mac.phy_writes,
            [
                (0, 0x00, CTRL_SPEED_1000 | CTRL_LOOPBACK),
                (0, 0x00, CTRL_SPEED_1000)
            ]
        );
    }

    #[test]
    fn master_slave_fault() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, Register::BasicStatus, STAT_LINK_SYNC);
        mac.set_phy(0, Register::GigabitStatus, GBSR_MS_FAULT);
        let mut port = port(LinkMode::AutoBoth);

        assert_eq!(Bcom.check_link_up(&mut port.link(&mut mac)), LinkCheck::RESTART);
        assert_eq!(port.port.ms_status, MsStatus::Fault);
        assert!(port.port.autoneg_fail);
    }

    #[test]
    fn negotiated_link() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, Register::BasicStatus, STAT_LINK_SYNC | STAT_AUTONEG_COMPLETE);
        mac.set_phy(0, Register::GigabitStatus, GBSR_MS_MASTER);
        mac.set_phy(0, AUX_STAT, AUX_RES_1000FD | AUX_PAUSE_RX);
        let mut port = port(LinkMode::AutoBoth);

        assert_eq!(
            Bcom.check_link_up(&mut port.link(&mut mac)),
            LinkCheck::LinkEstablished
        );
        assert!(port.port.hw_link_up);
        assert_eq!(port.port.ms_status, MsStatus::Master);
        assert_eq!(port.port.link_mode_status, LinkModeStatus::AutoFull);
        assert_eq!(port.port.flow_ctrl_status, FlowCtrlStatus::RemSend);

        // Already up
        assert_eq!(Bcom.check_link_up(&mut port.link(&mut mac)), LinkCheck::NoAction);
    }

    #[test]
    fn pause_precedence() {
        let cases = [
            (AUX_PAUSE_RX | AUX_PAUSE_TX, FlowCtrlStatus::Symmetric),
            (AUX_PAUSE_RX, FlowCtrlStatus::RemSend),
            (AUX_PAUSE_TX, FlowCtrlStatus::LocSend),
            (0, FlowCtrlStatus::None),
        ];

        for (pause, expected) in cases {
            let mut mac = FakeMac::default();
            mac.set_phy(0, AUX_STAT, AUX_RES_1000HD | pause);
            let mut port = port(LinkMode::AutoBoth);

            assert_eq!(Bcom.autoneg_done(&mut port.link(&mut mac)), Ok(()));
            assert_eq!(port.port.flow_ctrl_status, expected);
            assert_eq!(port.port.link_mode_status, LinkModeStatus::AutoHalf);
        }
    }

    #[test]
    fn unresolved_duplex() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, AUX_STAT, 5 << 8);
        let mut port = port(LinkMode::AutoBoth);
        assert_eq!(
            Bcom.autoneg_done(&mut port.link(&mut mac)),
            Err(AutoNegError::DuplexMismatch)
        );
    }

    #[test]
    fn init_auto_with_jumbo() {
        let mut mac = FakeMac::default();
        let mut port = port(LinkMode::AutoFull);
        port.config.jumbo = true;
        port.port.ms_mode = MsMode::Slave;
        Bcom.init(&mut port.link(&mut mac), false);

        assert_eq!(
            mac.phy(0, Register::GigabitControl),
            GBCR_MS_MANUAL | GBCR_REPEATER | GBCR_ADV_1000_FULL
        );
        assert_eq!(
            mac.phy(0, Register::AutoAdvertisement),
            ADV_SELECTOR_802_3 | (3 << 10)
        );
        assert_eq!(mac.phy(0, AUX_CTRL), AUX_TX_TEST | AUX_LONG_PACK);
        assert_eq!(mac.phy(0, P_EXT_CTRL), PEC_HIGH_LA);
        assert_eq!(
            mac.phy(0, Register::BasicControl),
            CTRL_SPEED_1000 | CTRL_AUTONEG_ENABLE | CTRL_RESTART_AUTONEG
        );
    }

    #[test]
    fn init_fixed_never_negotiates() {
        let mut mac = FakeMac::default();
        let mut port = port(LinkMode::Half);
        Bcom.init(&mut port.link(&mut mac), true);

        assert_eq!(mac.phy(0, Register::GigabitControl), GBCR_MS_MANUAL);
        assert_eq!(mac.phy(0, Register::BasicControl), CTRL_SPEED_1000 | CTRL_LOOPBACK);
    }

    #[test]
    fn link_change_interrupt() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, INT_STAT, IS_LST_CHANGE);
        mac.set_phy(0, INT_MASK, DEF_MSK);
        let mut port = port(LinkMode::AutoBoth);
        port.port.state = PortState::Run;
        port.port.hw_link_up = true;

        let mut link = port.link(&mut mac);
        let status = Bcom.interrupt_pending(&mut link);
        assert_eq!(status, Some(IS_LST_CHANGE));
        assert_eq!(
            Bcom.irq(&mut link, IS_LST_CHANGE),
            PhyIrq::LinkDown {
                restart_timer: true
            }
        );
        assert!(!port.port.hw_link_up);
    }

    #[test]
    fn masked_interrupt_not_pending() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, INT_STAT, IS_NO_HDCL);
        mac.set_phy(0, INT_MASK, DEF_MSK);
        let mut port = port(LinkMode::AutoBoth);
        assert_eq!(Bcom.interrupt_pending(&mut port.link(&mut mac)), None);
    }
}
