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

//! Level One 1000BASE-T PHY behind an XMAC II.

use crate::link::Link;
use crate::phy::{
    pause_advertisement, AutoNegError, LinkCheck, Phy, PhyIrq, Register, ADV_REMOTE_FAULT,
    ADV_SELECTOR_802_3, CTRL_AUTONEG_ENABLE, CTRL_FULL_DUPLEX, CTRL_LOOPBACK,
    CTRL_RESTART_AUTONEG, GBCR_ADV_1000_FULL, GBCR_ADV_1000_HALF, GBCR_MS_MANUAL,
    GBCR_MS_MASTER, GBSR_MS_FAULT, GBSR_MS_MASTER, STAT_AUTONEG_COMPLETE, STAT_LINK_SYNC,
};
use crate::port::{
    FlowCtrlMode, FlowCtrlStatus, LinkMode, LinkModeStatus, LinkSpeedStatus, MsMode, MsStatus,
};

pub const Q_STAT: Register = Register::Vendor(0x11);
pub const INT_ENAB: Register = Register::Vendor(0x12);
pub const INT_STAT: Register = Register::Vendor(0x13);

// Quick status
pub const QS_DUP_MOD: u16 = 1 << 9;
/// Partner advertised symmetric pause.
pub const QS_PAUSE: u16 = 1 << 3;
/// Partner advertised asymmetric pause.
pub const QS_AS_PAUSE: u16 = 1 << 2;

// Interrupt status and enable
pub const IS_LS: u16 = 1 << 4;
pub const IS_DUP: u16 = 1 << 5;
pub const IS_ISOL: u16 = 1 << 3;
pub const IS_INTEN: u16 = 1 << 1;

/// Interrupts enabled while the link is up.
pub const DEF_MSK: u16 = IS_LS | IS_ISOL | IS_INTEN;

pub struct Lone;

impl Phy for Lone {
    fn check_link_up(&self, link: &mut Link<'_>) -> LinkCheck {
        if link.port.hw_link_up {
            return LinkCheck::NoAction;
        }

        let status = link.port.isave | link.phy_read(Register::BasicStatus);
        link.port.isave = 0;
        link.detect_partner_phy(status);

        if status & STAT_LINK_SYNC == 0 {
            // Keep a done bit for the tick that sees sync
            link.port.isave = status & STAT_AUTONEG_COMPLETE;
            return LinkCheck::NoAction;
        }

        if !link.port.is_autoneg() {
            // Clears the latched link change
            link.phy_read(INT_STAT);
            link.link_up();
            return LinkCheck::LinkEstablished;
        }

        if status & STAT_AUTONEG_COMPLETE == 0 {
            return link.autoneg_pending();
        }

        if let Err(err) = link.complete_autoneg() {
            let partner = link.phy_read(Register::AutoPartnerAbility);
            let quick = link.phy_read(Q_STAT);
            log::debug!(
                "Port {}: partner {:#06x}, quick status {:#06x}",
                link.index(),
                partner,
                quick
            );
            return link.autoneg_failed(err);
        }

        link.phy_read(INT_STAT);
        LinkCheck::LinkEstablished
    }

    fn autoneg_done(&self, link: &mut Link<'_>) -> Result<(), AutoNegError> {
        let partner = link.phy_read(Register::AutoPartnerAbility);
        if partner & ADV_REMOTE_FAULT != 0 {
            log::debug!("Port {}: remote fault {:#06x}", link.index(), partner);
            return Err(AutoNegError::Other);
        }

        let quick = link.phy_read(Q_STAT);
        link.port.link_mode_status = if quick & QS_DUP_MOD != 0 {
            LinkModeStatus::AutoFull
        } else {
            LinkModeStatus::AutoHalf
        };

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

        // This PHY does not resolve pause itself, but quick status carries
        // the partner's pause bits
        let pause = quick & QS_PAUSE != 0;
        let asym = quick & QS_AS_PAUSE != 0;
        link.port.flow_ctrl_status = match link.port.flow_ctrl_mode {
            FlowCtrlMode::Symmetric | FlowCtrlMode::SymOrRem if pause => FlowCtrlStatus::Symmetric,
            FlowCtrlMode::SymOrRem if asym => FlowCtrlStatus::RemSend,
            FlowCtrlMode::LocSend if pause && asym => FlowCtrlStatus::LocSend,
            _ => FlowCtrlStatus::None,
        };

        link.port.link_speed_used = LinkSpeedStatus::ThousandMbps;
        Ok(())
    }

    fn init(&self, link: &mut Link<'_>, loopback: bool) {
        let mut ctrl = 0;
        let mut gbcr = 0;
        let mut adv = ADV_SELECTOR_802_3;

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
            gbcr |= match link.port.link_mode {
                LinkMode::AutoHalf => GBCR_ADV_1000_HALF,
                LinkMode::AutoFull => GBCR_ADV_1000_FULL,
                _ => GBCR_ADV_1000_HALF | GBCR_ADV_1000_FULL,
            };
            adv |= pause_advertisement(link.port.flow_ctrl_mode);

            ctrl = CTRL_AUTONEG_ENABLE | CTRL_RESTART_AUTONEG;
        }

        link.phy_write(Register::GigabitControl, gbcr);
        link.phy_write(Register::AutoAdvertisement, adv);

        if loopback {
            ctrl |= CTRL_LOOPBACK;
        }

        link.phy_write(Register::BasicControl, ctrl);
    }

    fn interrupt_pending(&self, link: &mut Link<'_>) -> Option<u16> {
        let status = link.phy_read(INT_STAT);
        let enabled = link.phy_read(INT_ENAB);
        (status & enabled != 0).then_some(status)
    }

    fn irq(&self, link: &mut Link<'_>, status: u16) -> PhyIrq {
        if status & (IS_DUP | IS_ISOL) != 0 {
            link.link_down();
            return PhyIrq::LinkDown {
                restart_timer: false,
            };
        }

        PhyIrq::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::PhyType;
    use crate::testing::{FakeMac, TestPort};

    fn port(mode: LinkMode) -> TestPort {
        TestPort::new(PhyType::Lone, mode)
    }

    #[test]
    fn done_latched_until_sync() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, Register::BasicStatus, STAT_AUTONEG_COMPLETE);
        mac.set_phy(0, Q_STAT, QS_DUP_MOD);
        let mut port = port(LinkMode::AutoBoth);

        assert_eq!(Lone.check_link_up(&mut port.link(&mut mac)), LinkCheck::NoAction);
        assert_eq!(port.port.isave, STAT_AUTONEG_COMPLETE);

        mac.set_phy(0, Register::BasicStatus, STAT_LINK_SYNC);
        assert_eq!(
            Lone.check_link_up(&mut port.link(&mut mac)),
            LinkCheck::LinkEstablished
        );
        assert_eq!(port.port.link_mode_status, LinkModeStatus::AutoFull);
        assert_eq!(port.port.isave, 0);
    }

    #[test]
    fn negotiation_timeout() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, Register::BasicStatus, STAT_LINK_SYNC);
        let mut port = port(LinkMode::AutoBoth);
        let ticks = port.config.autoneg_max_ticks;

        for _ in 1..ticks {
            assert_eq!(Lone.check_link_up(&mut port.link(&mut mac)), LinkCheck::NoAction);
        }
        assert_eq!(Lone.check_link_up(&mut port.link(&mut mac)), LinkCheck::RESTART);
        assert_eq!(port.port.autoneg_timeout_count, 1);
    }

    #[test]
    fn manual_flow_resolution() {
        let cases = [
            (FlowCtrlMode::Symmetric, QS_PAUSE, FlowCtrlStatus::Symmetric),
            (FlowCtrlMode::SymOrRem, QS_PAUSE, FlowCtrlStatus::Symmetric),
            (FlowCtrlMode::SymOrRem, QS_AS_PAUSE, FlowCtrlStatus::RemSend),
            (FlowCtrlMode::LocSend, QS_PAUSE | QS_AS_PAUSE, FlowCtrlStatus::LocSend),
            (FlowCtrlMode::Symmetric, QS_AS_PAUSE, FlowCtrlStatus::None),
            (FlowCtrlMode::None, QS_PAUSE, FlowCtrlStatus::None),
        ];

        for (mode, quick, expected) in cases {
            let mut mac = FakeMac::default();
            // A plain 802.3 partner word; pause comes from quick status
            mac.set_phy(0, Register::AutoPartnerAbility, ADV_SELECTOR_802_3);
            mac.set_phy(0, Q_STAT, QS_DUP_MOD | quick);
            let mut port = port(LinkMode::AutoBoth);
            port.port.flow_ctrl_mode = mode;

            assert_eq!(Lone.autoneg_done(&mut port.link(&mut mac)), Ok(()));
            assert_eq!(port.port.flow_ctrl_status, expected, "{:?}", mode);
            assert_eq!(port.port.link_speed_used, LinkSpeedStatus::ThousandMbps);
        }
    }

    #[test]
    fn master_slave_fault() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, Register::GigabitStatus, GBSR_MS_FAULT | GBSR_MS_MASTER);
        let mut port = port(LinkMode::AutoBoth);

        assert_eq!(Lone.autoneg_done(&mut port.link(&mut mac)), Err(AutoNegError::Other));
        assert_eq!(port.port.ms_status, MsStatus::Fault);
    }

    #[test]
    fn init_fixed_and_auto() {
        let mut mac = FakeMac::default();
        let mut port = port(LinkMode::Full);
        Lone.init(&mut port.link(&mut mac), false);
        assert_eq!(mac.phy(0, Register::BasicControl), CTRL_FULL_DUPLEX);

        let mut port = self::port(LinkMode::AutoHalf);
        port.port.ms_mode = MsMode::Master;
        Lone.init(&mut port.link(&mut mac), true);
        assert_eq!(
            mac.phy(0, Register::GigabitControl),
            GBCR_MS_MANUAL | GBCR_MS_MASTER | GBCR_ADV_1000_HALF
        );
        assert_eq!(
            mac.phy(0, Register::BasicControl),
            CTRL_AUTONEG_ENABLE | CTRL_RESTART_AUTONEG | CTRL_LOOPBACK
        );
    }

    #[test]
    fn duplex_interrupt() {
        let mut mac = FakeMac::default();
        mac.set_phy(0, INT_STAT, IS_DUP);
        mac.set_phy(0, INT_ENAB, DEF_MSK);
        let mut port = port(LinkMode::AutoBoth);
        // Duplex changes are not enabled
        assert_eq!(Lone.interrupt_pending(&mut port.link(&mut mac)), None);

        port.port.hw_link_up = true;
        assert_eq!(
            Lone.irq(&mut port.link(&mut mac), IS_DUP | IS_LS),
            PhyIrq::LinkDown {
                restart_timer: false
            }
        );
        assert!(!port.port.hw_link_up);
    }
}
