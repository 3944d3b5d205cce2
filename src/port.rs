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

use crate::config::{Config, PortConfig};
use crate::phy::PhyType;
use crate::timer::TimerId;

codes! {
    /// Requested duplex and negotiation mode.
    LinkMode {
        Half = 1,
        Full = 2,
        AutoHalf = 3,
        AutoFull = 4,
        AutoBoth = 5,
        /// Cycle through the auto modes and fall back to manual full duplex.
        AutoSense = 6,
    }
}

codes! {
    LinkModeStatus {
        Unknown = 1,
        Half = 2,
        Full = 3,
        AutoHalf = 4,
        AutoFull = 5,
    }
}

codes! {
    FlowCtrlMode {
        None = 1,
        /// Send pause frames but ignore received ones.
        LocSend = 2,
        Symmetric = 3,
        /// Symmetric, or honor the partner's pause frames only.
        SymOrRem = 4,
    }
}

codes! {
    FlowCtrlStatus {
        None = 1,
        RemSend = 2,
        LocSend = 3,
        Symmetric = 4,
    }
}

codes! {
    MsMode {
        Auto = 1,
        Master = 2,
        Slave = 3,
    }
}

codes! {
    MsStatus {
        Unset = 1,
        Master = 2,
        Slave = 3,
        Fault = 4,
    }
}

codes! {
    LinkSpeed {
        Auto = 1,
        TenMbps = 2,
        HundredMbps = 3,
        ThousandMbps = 4,
    }
}

codes! {
    LinkSpeedStatus {
        Indeterminate = 1,
        TenMbps = 2,
        HundredMbps = 3,
        ThousandMbps = 4,
    }
}

/// What is known about the link partner's auto-negotiation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkPartner {
    Unknown,
    Manual,
    Auto,
}

/// Coarse MAC state, owned by the port-reset collaborator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum PortState {
    Reset = 0,
    Stop = 1,
    Init = 2,
    Run = 3,
}

impl LinkMode {
    pub fn is_fixed(self) -> bool {
        matches!(self, LinkMode::Half | LinkMode::Full)
    }
}

impl LinkModeStatus {
    pub fn is_half(self) -> bool {
        matches!(self, LinkModeStatus::Half | LinkModeStatus::AutoHalf)
    }

    pub fn is_full(self) -> bool {
        matches!(self, LinkModeStatus::Full | LinkModeStatus::AutoFull)
    }
}

/// Link state of one MAC. Only the link state machine changes it; the rest
/// of the driver reads it through `Adapter::port`.
#[derive(Clone, Debug)]
pub struct Port {
    pub index: usize,
    pub phy_type: PhyType,
    pub state: PortState,

    pub hw_link_up: bool,
    pub autoneg_fail: bool,

    pub link_mode_conf: LinkMode,
    /// Mode in use; with auto-sense this is the current guess.
    pub link_mode: LinkMode,
    pub link_mode_status: LinkModeStatus,
    pub link_speed: LinkSpeed,
    pub link_speed_used: LinkSpeedStatus,
    pub flow_ctrl_mode: FlowCtrlMode,
    pub flow_ctrl_status: FlowCtrlStatus,
    pub ms_mode: MsMode,
    pub ms_status: MsStatus,

    /// Workaround ticks spent waiting for auto-negotiation.
    pub autoneg_timeout: u8,
    /// Consecutive auto-negotiation timeouts.
    pub autoneg_timeout_count: u8,
    pub link_restart_count: u8,
    pub lipa_autoneg: LinkPartner,

    pub link_broken: bool,
    /// Interrupt bits latched between two workaround ticks.
    pub isave: u16,

    pub half_dup_timer_active: bool,
    pub last_octets: u64,

    pub prev_shorts: u32,
    pub prev_fcs: u32,
    pub prev_rx: u64,
    pub rx_limit: u64,

    pub check_parity: bool,
    pub cable_len: u8,

    pub wa_timer: TimerId,
    pub half_dup_timer: TimerId,
}

impl Port {
    pub(crate) fn new(
        index: usize,
        port_config: &PortConfig,
        config: &Config,
        wa_timer: TimerId,
        half_dup_timer: TimerId,
    ) -> Port {
        let link_mode = match port_config.link_mode {
            LinkMode::AutoSense => LinkMode::AutoFull,
            mode => mode,
        };

        Port {
            index,
            phy_type: port_config.phy_type,
            state: PortState::Reset,
            hw_link_up: false,
            autoneg_fail: false,
            link_mode_conf: port_config.link_mode,
            link_mode,
            link_mode_status: LinkModeStatus::Unknown,
            link_speed: port_config.link_speed,
            link_speed_used: LinkSpeedStatus::Indeterminate,
            flow_ctrl_mode: port_config.flow_ctrl_mode,
            flow_ctrl_status: FlowCtrlStatus::None,
            ms_mode: port_config.ms_mode,
            ms_status: MsStatus::Unset,
            autoneg_timeout: 0,
            autoneg_timeout_count: 0,
            link_restart_count: 0,
            lipa_autoneg: LinkPartner::Unknown,
            link_broken: false,
            isave: 0,
            half_dup_timer_active: false,
            last_octets: 0,
            prev_shorts: 0,
            prev_fcs: 0,
            prev_rx: 0,
            rx_limit: config.rx_wa_limit,
            check_parity: false,
            cable_len: 0,
            wa_timer,
            half_dup_timer,
        }
    }

    pub fn is_autoneg(&self) -> bool {
        !self.link_mode.is_fixed()
    }

    pub(crate) fn clear_errata_counters(&mut self) {
        self.prev_shorts = 0;
        self.prev_fcs = 0;
        self.prev_rx = 0;
    }
}
