// Copyright 2018 Alex Crawford
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::link::Link;
use crate::mac::MacType;
use crate::port::{FlowCtrlMode, FlowCtrlStatus, LinkMode};
use crate::{bcom, lone, marvell, xmac};
use core::fmt;

/// Behavior that differs between PHY families. Every method works on the
/// port that `link` is bound to.
pub trait Phy {
    /// Periodic link check, run from the workaround timer.
    fn check_link_up(&self, link: &mut Link<'_>) -> LinkCheck;

    /// Reads back the negotiated mode once the PHY reports negotiation done.
    fn autoneg_done(&self, link: &mut Link<'_>) -> Result<(), AutoNegError>;

    /// Programs control and advertisement registers for the configured mode.
    fn init(&self, link: &mut Link<'_>, loopback: bool);

    /// Returns the PHY interrupt status if an unmasked source is pending.
    fn interrupt_pending(&self, _link: &mut Link<'_>) -> Option<u16> {
        None
    }

    fn irq(&self, _link: &mut Link<'_>, _status: u16) -> PhyIrq {
        PhyIrq::None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkCheck {
    NoAction,
    /// Take the link down and have the port reset. `next_mode` is the
    /// auto-sense mode to try next.
    Restart { next_mode: Option<LinkMode> },
    LinkEstablished,
}

impl LinkCheck {
    pub const RESTART: LinkCheck = LinkCheck::Restart { next_mode: None };
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AutoNegError {
    /// The partner shares no duplex mode with us.
    DuplexMismatch,
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhyIrq {
    None,
    /// The link was taken down.
    LinkDown { restart_timer: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PhyType {
    /// PHY built into the XMAC II.
    Xmac,
    Bcom,
    MarvCopper,
    MarvFiber,
    Lone,
}

impl PhyType {
    pub fn family(self) -> &'static dyn Phy {
        match self {
            PhyType::Xmac => &xmac::Xmac,
            PhyType::Bcom => &bcom::Bcom,
            PhyType::MarvCopper | PhyType::MarvFiber => &marvell::Marvell,
            PhyType::Lone => &lone::Lone,
        }
    }

    pub fn mac_type(self) -> MacType {
        match self {
            PhyType::MarvCopper | PhyType::MarvFiber => MacType::Gmac,
            PhyType::Xmac | PhyType::Bcom | PhyType::Lone => MacType::Xmac,
        }
    }

    pub fn is_copper(self) -> bool {
        !matches!(self, PhyType::Xmac | PhyType::MarvFiber)
    }
}

pub struct Oui(pub [u8; 3]);

impl fmt::Display for Oui {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02X}-{:02X}-{:02X}", self.0[0], self.0[1], self.0[2])
    }
}

impl Oui {
    pub fn from_id(id1: u16, id2: u16) -> Oui {
        // Bits [2:17] of the OUI are in bits [15:0] of PHY ID 1.
        // Bits [18:23] of the OUI are in bits [15:10] of PHY ID 2.
        // Concatenating these two gives the OUI in bit-reverse order
        // (e.g. 0b00 [2:17] [18:23] 0000 0000).
        let oui = (u32::from(id1) << 14 | u32::from(id2) >> 2).reverse_bits();
        Oui([oui as u8, (oui >> 8) as u8, (oui >> 16) as u8])
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Register {
    BasicControl,
    BasicStatus,
    PhyId1,
    PhyId2,
    AutoAdvertisement,
    AutoPartnerAbility,
    AutoExpansion,
    GigabitControl,
    GigabitStatus,
    ExtendedStatus,
    Vendor(u8),
}

impl From<Register> for u8 {
    fn from(register: Register) -> u8 {
        match register {
            Register::BasicControl => 0x00,
            Register::BasicStatus => 0x01,
            Register::PhyId1 => 0x02,
            Register::PhyId2 => 0x03,
            Register::AutoAdvertisement => 0x04,
            Register::AutoPartnerAbility => 0x05,
            Register::AutoExpansion => 0x06,
            Register::GigabitControl => 0x09,
            Register::GigabitStatus => 0x0A,
            Register::ExtendedStatus => 0x0F,
            Register::Vendor(addr) => addr,
        }
    }
}

// Basic control
pub const CTRL_RESET: u16 = 1 << 15;
pub const CTRL_LOOPBACK: u16 = 1 << 14;
pub const CTRL_SPEED_100: u16 = 1 << 13;
pub const CTRL_AUTONEG_ENABLE: u16 = 1 << 12;
pub const CTRL_RESTART_AUTONEG: u16 = 1 << 9;
pub const CTRL_FULL_DUPLEX: u16 = 1 << 8;
pub const CTRL_SPEED_1000: u16 = 1 << 6;

// Basic status
pub const STAT_AUTONEG_COMPLETE: u16 = 1 << 5;
pub const STAT_REMOTE_FAULT: u16 = 1 << 4;
pub const STAT_LINK_SYNC: u16 = 1 << 2;

// Auto-negotiation advertisement and partner ability, twisted pair
pub const ADV_REMOTE_FAULT: u16 = 1 << 13;
pub const ADV_PAUSE_ASYM: u16 = 1 << 11;
pub const ADV_PAUSE_SYM: u16 = 1 << 10;
pub const ADV_100_FULL: u16 = 1 << 8;
pub const ADV_100_HALF: u16 = 1 << 7;
pub const ADV_10_FULL: u16 = 1 << 6;
pub const ADV_10_HALF: u16 = 1 << 5;
pub const ADV_SELECTOR_802_3: u16 = 0x0001;

// Auto-negotiation advertisement and partner ability, 1000BASE-X
pub const ADV_X_REMOTE_FAULT: u16 = 3 << 12;
pub const ADV_X_PAUSE_MASK: u16 = 3 << 7;
pub const ADV_X_PAUSE_SYM: u16 = 1 << 7;
pub const ADV_X_PAUSE_ASYM: u16 = 2 << 7;
pub const ADV_X_PAUSE_BOTH: u16 = 3 << 7;
pub const ADV_X_HALF: u16 = 1 << 6;
pub const ADV_X_FULL: u16 = 1 << 5;

// 1000BASE-T control
pub const GBCR_MS_MANUAL: u16 = 1 << 12;
pub const GBCR_MS_MASTER: u16 = 1 << 11;
pub const GBCR_REPEATER: u16 = 1 << 10;
pub const GBCR_ADV_1000_FULL: u16 = 1 << 9;
pub const GBCR_ADV_1000_HALF: u16 = 1 << 8;

// 1000BASE-T status
pub const GBSR_MS_FAULT: u16 = 1 << 15;
pub const GBSR_MS_MASTER: u16 = 1 << 14;

/// Twisted-pair pause advertisement for a flow control mode.
pub fn pause_advertisement(mode: FlowCtrlMode) -> u16 {
    match mode {
        FlowCtrlMode::None => 0,
        FlowCtrlMode::LocSend => ADV_PAUSE_ASYM,
        FlowCtrlMode::Symmetric => ADV_PAUSE_SYM,
        FlowCtrlMode::SymOrRem => ADV_PAUSE_ASYM | ADV_PAUSE_SYM,
    }
}

/// 1000BASE-X pause advertisement for a flow control mode.
pub fn pause_advertisement_x(mode: FlowCtrlMode) -> u16 {
    match mode {
        FlowCtrlMode::None => 0,
        FlowCtrlMode::LocSend => ADV_X_PAUSE_ASYM,
        FlowCtrlMode::Symmetric => ADV_X_PAUSE_SYM,
        FlowCtrlMode::SymOrRem => ADV_X_PAUSE_BOTH,
    }
}

/// Pause resolution as reported by PHYs that resolve it themselves.
pub fn resolve_pause(rx: bool, tx: bool) -> FlowCtrlStatus {
    match (rx, tx) {
        (true, true) => FlowCtrlStatus::Symmetric,
        (true, false) => FlowCtrlStatus::RemSend,
        (false, true) => FlowCtrlStatus::LocSend,
        (false, false) => FlowCtrlStatus::None,
    }
}
