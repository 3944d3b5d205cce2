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

//! Tuning constants for the link state machine and the per-port settings
//! chosen by the driver before the port is started.

use crate::phy::PhyType;
use crate::port::{FlowCtrlMode, LinkMode, LinkSpeed, MsMode};

/// Number of MACs a single adapter can carry.
pub const MAX_MACS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Workaround timer interval while the link is up (µs).
    pub wa_active_time: u32,
    /// Workaround timer interval while the link is down (µs).
    pub wa_inactive_time: u32,
    /// Delay between a transmit arbiter timeout and the half-duplex hang check (µs).
    pub halfdup_check_time: u32,
    /// In-sync detections after a broken link before the link is accepted.
    pub max_link_restarts: u8,
    /// Auto-negotiation timeouts before the auto-sense hint starts over.
    pub max_autoneg_timeouts: u8,
    /// Workaround ticks to wait for auto-negotiation to complete.
    pub autoneg_max_ticks: u8,
    /// Received frames between two ticks above which short frames are not
    /// taken as a sign of a bad link.
    pub rx_wa_limit: u64,
    /// Frequency of the countdown timer.
    pub timer_clock_khz: u32,
    /// Jumbo frames are configured on the MAC.
    pub jumbo: bool,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            wa_active_time: 5_000_000,
            wa_inactive_time: 100_000,
            halfdup_check_time: 10_000,
            max_link_restarts: 3,
            max_autoneg_timeouts: 10,
            autoneg_max_ticks: 6,
            rx_wa_limit: 100,
            timer_clock_khz: 62_500,
            jumbo: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortConfig {
    pub phy_type: PhyType,
    pub link_mode: LinkMode,
    pub flow_ctrl_mode: FlowCtrlMode,
    pub ms_mode: MsMode,
    pub link_speed: LinkSpeed,
}

impl PortConfig {
    pub const fn new(phy_type: PhyType) -> PortConfig {
        PortConfig {
            phy_type,
            link_mode: LinkMode::AutoSense,
            flow_ctrl_mode: FlowCtrlMode::SymOrRem,
            ms_mode: MsMode::Auto,
            link_speed: LinkSpeed::Auto,
        }
    }
}
