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

//! 1000BASE-X PHY built into the XMAC II.
//!
//! This PHY has no interrupt of its own; link sync and negotiation progress
//! show up in the XMAC interrupt source and general purpose port. A link
//! partner that keeps dropping sync is restarted a bounded number of times,
//! and a link that only produces short frames is taken down.

use crate::link::Link;
use crate::mac::{Counter, MacRegister, XM_GP_INP_ASS, XM_IS_AND, XM_IS_INP_ASS};
use crate::phy::{
    pause_advertisement_x, AutoNegError, LinkCheck, Phy, Register, ADV_X_FULL, ADV_X_HALF,
    ADV_X_PAUSE_ASYM, ADV_X_PAUSE_BOTH, ADV_X_PAUSE_MASK, ADV_X_PAUSE_SYM, ADV_X_REMOTE_FAULT,
    CTRL_AUTONEG_ENABLE, CTRL_FULL_DUPLEX, CTRL_LOOPBACK, CTRL_RESTART_AUTONEG,
};
use crate::port::{
    FlowCtrlMode, FlowCtrlStatus, LinkMode, LinkModeStatus, LinkPartner, LinkSpeedStatus,
};
use ignore_result::Ignore;

/// Resolved ability.
pub const RES_ABI: Register = Register::Vendor(0x10);

pub const RES_HD: u16 = 1 << 6;
pub const RES_FD: u16 = 1 << 5;

const RX_COUNTERS: [Counter; 6] = [
    Counter::Rx64,
    Counter::Rx127,
    Counter::Rx255,
    Counter::Rx511,
    Counter::Rx1023,
    Counter::RxMaxSize,
];

pub struct Xmac;

impl Phy for Xmac {
    fn check_link_up(&self, link: &mut Link<'_>) -> LinkCheck {
        if link.port.hw_link_up {
            return check_shorts(link);
        }

        let mut sum = link.port.isave;
        link.port.isave = 0;

        if link.port.link_broken {
            let gp = link.read32(MacRegister::XmGpPort);
            if gp & XM_GP_INP_ASS != 0 {
                return LinkCheck::NoAction;
            }

            let isrc = link.read16(MacRegister::XmIsrc);
            sum |= isrc;
            link.detect_partner_isrc(sum);

            if isrc & XM_IS_INP_ASS != 0 {
                link.port.isave = sum & XM_IS_AND;
                log::debug!("Port {}: still out of sync, saved {:#06x}", link.index(), sum);
                return LinkCheck::NoAction;
            }

            // Back in sync; start over unless this keeps happening
            let index = link.index();
            link.mac.update_stats(index).ignore();
            link.port.prev_shorts = link.mac.statistic(index, Counter::RxShortEvents);
            link.port.link_broken = false;
            link.port.link_restart_count += 1;
            link.port.autoneg_timeout = 0;

            if link.port.link_restart_count < link.config.max_link_restarts {
                log::debug!("Port {}: link back in sync, restarting", link.index());
                return LinkCheck::RESTART;
            }

            log::debug!("Port {}: too many link restarts, keeping link", link.index());
            link.port.link_restart_count = 0;
        } else {
            let isrc = link.read16(MacRegister::XmIsrc);
            sum |= isrc;

            if isrc & XM_IS_INP_ASS != 0 {
                // Sync is lost only if the next two reads agree
                let mut broken = true;
                for _ in 0..2 {
                    let isrc = link.read16(MacRegister::XmIsrc);
                    sum |= isrc;
                    if isrc & XM_IS_INP_ASS == 0 {
                        broken = false;
                        break;
                    }
                }

                if broken {
                    log::debug!("Port {}: link broken", link.index());
                    link.port.link_broken = true;
                    link.port.lipa_autoneg = LinkPartner::Unknown;
                    link.init_def_sense();
                    return LinkCheck::RESTART;
                }
            } else {
                link.detect_partner_isrc(isrc);
                if let LinkCheck::Restart { .. } = check_shorts(link) {
                    return LinkCheck::RESTART;
                }
            }
        }

        let gp = link.read32(MacRegister::XmGpPort);
        sum |= link.read16(MacRegister::XmIsrc);
        link.detect_partner_isrc(sum);

        if gp & XM_GP_INP_ASS != 0 || sum & XM_IS_INP_ASS != 0 {
            if gp & XM_GP_INP_ASS == 0 {
                link.port.isave = sum & XM_IS_AND;
            }
            return LinkCheck::NoAction;
        }

        if !link.port.is_autoneg() {
            link.link_up();
            return LinkCheck::LinkEstablished;
        }

        if sum & XM_IS_AND == 0 {
            return link.autoneg_pending();
        }

        if let Err(err) = link.complete_autoneg() {
            let partner = link.phy_read(Register::AutoPartnerAbility);
            let resolved = link.phy_read(RES_ABI);
            log::debug!(
                "Port {}: partner {:#06x}, resolved {:#06x}",
                link.index(),
                partner,
                resolved
            );
            return link.autoneg_failed(err);
        }

        // Clears the page received indication
        link.phy_read(Register::AutoExpansion);
        LinkCheck::LinkEstablished
    }

    fn autoneg_done(&self, link: &mut Link<'_>) -> Result<(), AutoNegError> {
        let partner = link.phy_read(Register::AutoPartnerAbility);
        if partner & ADV_X_REMOTE_FAULT != 0 {
            log::debug!("Port {}: remote fault {:#06x}", link.index(), partner);
            return Err(AutoNegError::Other);
        }

        let resolved = link.phy_read(RES_ABI);
        link.port.link_mode_status = match resolved & (RES_HD | RES_FD) {
            RES_FD => LinkModeStatus::AutoFull,
            RES_HD => LinkModeStatus::AutoHalf,
            // Neither or both: the duplex modes did not resolve to one
            _ => return Err(AutoNegError::DuplexMismatch),
        };

        // IEEE 802.3z, Table 37-4
        let mode = link.port.flow_ctrl_mode;
        let pause = partner & ADV_X_PAUSE_MASK;
        let symmetric = matches!(mode, FlowCtrlMode::Symmetric | FlowCtrlMode::SymOrRem);
        link.port.flow_ctrl_status = if symmetric && partner & ADV_X_PAUSE_SYM != 0 {
            FlowCtrlStatus::Symmetric
        } else if mode == FlowCtrlMode::SymOrRem && pause == ADV_X_PAUSE_ASYM {
            FlowCtrlStatus::RemSend
        } else if mode == FlowCtrlMode::LocSend && pause == ADV_X_PAUSE_BOTH {
            FlowCtrlStatus::LocSend
        } else {
            FlowCtrlStatus::None
        };

        link.port.link_speed_used = LinkSpeedStatus::ThousandMbps;
        Ok(())
    }

    fn init(&self, link: &mut Link<'_>, loopback: bool) {
        let mut ctrl = 0;

        if link.port.is_autoneg() {
            let mut adv = match link.port.link_mode {
                LinkMode::AutoHalf => ADV_X_HALF,
                LinkMode::AutoFull => ADV_X_FULL,
                _ => ADV_X_HALF | ADV_X_FULL,
            };
            adv |= pause_advertisement_x(link.port.flow_ctrl_mode);
            link.phy_write(Register::AutoAdvertisement, adv);

            ctrl |= CTRL_AUTONEG_ENABLE | CTRL_RESTART_AUTONEG;
        } else if link.port.link_mode == LinkMode::Full {
            ctrl |= CTRL_FULL_DUPLEX;
        }

        if loopback {
            ctrl |= CTRL_LOOPBACK;
        }

        link.phy_write(Register::BasicControl, ctrl);
    }
}

/// Short frame errata. A link that receives nothing but short frames is
/// not really up.
pub fn check_shorts(link: &mut Link<'_>) -> LinkCheck {
    let index = link.index();
    link.mac.update_stats(index).ignore();

    let shorts = link.mac.statistic(index, Counter::RxShortEvents);
    let rx: u64 = RX_COUNTERS
        .iter()
        .map(|&counter| u64::from(link.mac.statistic(index, counter)))
        .sum();

    let mut limit = 0;
    if link.port.hw_link_up {
        link.port.link_restart_count = 0;
        link.port.autoneg_timeout_count = 0;

        // Allow a couple of shorts while traffic flows
        limit = 2;

        let fcs = link.mac.statistic(index, Counter::RxFcsErrors);

        if link.port.link_mode_conf == LinkMode::AutoSense
            && link.port.lipa_autoneg == LinkPartner::Unknown
            && link.port.link_mode.is_fixed()
        {
            if rx == link.port.prev_rx {
                // Manual link with no traffic at all
                link.port.prev_fcs = fcs;
                link.port.prev_shorts = shorts;
                return LinkCheck::RESTART;
            }
            link.port.lipa_autoneg = LinkPartner::Manual;
        }

        if rx.wrapping_sub(link.port.prev_rx) > link.port.rx_limit || fcs == link.port.prev_fcs {
            link.port.prev_rx = rx;
            link.port.prev_fcs = fcs;
            link.port.prev_shorts = shorts;
            return LinkCheck::NoAction;
        }
        link.port.prev_fcs = fcs;
    }

    let result = if shorts.wrapping_sub(link.port.prev_shorts) > limit {
        log::debug!("Port {}: short frames, restarting link", index);
        LinkCheck::RESTART
    } else {
        LinkCheck::NoAction
    };

    link.port.prev_shorts = shorts;
    link.port.prev_rx = rx;
    result
}
