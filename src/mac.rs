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

//! MAC register access and the MAC side of link bring-up for both XMAC II
//! and GMAC adapters.

use crate::error::Error;
use crate::link::Link;
use crate::phy::{PhyType, Register};
use crate::port::{FlowCtrlStatus, LinkModeStatus, PortState};
use crate::{bcom, lone, marvell};

/// Register I/O layer. Registers are named symbolically; the
/// implementation maps them onto the adapter's address space for `port`.
/// Adapter-wide registers ignore `port`.
pub trait Mac {
    fn read8(&mut self, port: usize, register: MacRegister) -> u8;
    fn write8(&mut self, port: usize, register: MacRegister, data: u8);
    fn read16(&mut self, port: usize, register: MacRegister) -> u16;
    fn write16(&mut self, port: usize, register: MacRegister, data: u16);
    fn read32(&mut self, port: usize, register: MacRegister) -> u32;
    fn write32(&mut self, port: usize, register: MacRegister, data: u32);

    fn phy_read(&mut self, port: usize, register: Register) -> u16;
    fn phy_write(&mut self, port: usize, register: Register, data: u16);

    /// Snapshots the MAC statistics counters.
    fn update_stats(&mut self, port: usize) -> Result<(), Error>;
    fn statistic(&mut self, port: usize, counter: Counter) -> u32;
    fn tx_octets(&mut self, port: usize) -> u64;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacType {
    /// XMAC II, found on GEnesis adapters.
    Xmac,
    /// GMAC, found on Yukon adapters.
    Gmac,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Queue {
    R1,
    R2,
    Xs1,
    Xa1,
    Xs2,
    Xa2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MacRegister {
    // XMAC II
    XmMmuCmd,
    XmMode,
    XmImsk,
    XmIsrc,
    XmGpPort,
    XmMacPtime,

    // Per-port FIFO and link sync blocks
    RxMffCtrl1,
    TxMffCtrl1,
    RxGmfCtrl,
    TxGmfCtrl,
    LnkSyncCtrl,

    // GMAC
    GmGpCtrl,
    GmacIrqSrc,
    GmacIrqMsk,

    // Adapter-wide
    HweIsrc,
    PaCtrl,
    RiCtrl,
    GmacTiStCtrl,
    I2cIrq,
    Csr(Queue),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Counter {
    RxShortEvents,
    RxFcsErrors,
    Rx64,
    Rx127,
    Rx255,
    Rx511,
    Rx1023,
    RxMaxSize,
    TxMaxSize,
    Tx1518,
}

// XMAC MMU command
pub const XM_MMU_IGN_PF: u16 = 1 << 10;
pub const XM_MMU_GMII_FD: u16 = 1 << 4;
pub const XM_MMU_ENA_RX: u16 = 1 << 1;
pub const XM_MMU_ENA_TX: u16 = 1 << 0;

// XMAC mode
pub const XM_MD_SPOE_E: u32 = 1 << 25;
pub const XM_MD_SPOL_I: u32 = 1 << 18;
pub const XM_MD_SPOH_I: u32 = 1 << 17;
pub const XM_MD_FTF: u32 = 1 << 15;
pub const XM_PAUSE_MODE: u32 = XM_MD_SPOE_E | XM_MD_SPOL_I | XM_MD_SPOH_I;

// XMAC interrupt source and mask
pub const XM_IS_LNK_AE: u16 = 1 << 14;
pub const XM_IS_TX_ABORT: u16 = 1 << 13;
pub const XM_IS_FRC_INT: u16 = 1 << 12;
pub const XM_IS_INP_ASS: u16 = 1 << 11;
pub const XM_IS_LIPA_RC: u16 = 1 << 10;
pub const XM_IS_RX_PAGE: u16 = 1 << 9;
pub const XM_IS_TX_PAGE: u16 = 1 << 8;
pub const XM_IS_AND: u16 = 1 << 7;
pub const XM_IS_TSC_OV: u16 = 1 << 6;
pub const XM_IS_RXC_OV: u16 = 1 << 5;
pub const XM_IS_TXC_OV: u16 = 1 << 4;
pub const XM_IS_RXF_OV: u16 = 1 << 3;
pub const XM_IS_TXF_UR: u16 = 1 << 2;
pub const XM_IS_TX_COMP: u16 = 1 << 1;
pub const XM_IS_RX_COMP: u16 = 1 << 0;

/// Sources left unmasked while the link is up.
pub const XM_DEF_MSK: u16 = !(XM_IS_INP_ASS
    | XM_IS_LIPA_RC
    | XM_IS_RX_PAGE
    | XM_IS_AND
    | XM_IS_RXC_OV
    | XM_IS_TXC_OV
    | XM_IS_TXF_UR);

/// Bits that only mean something with the internal PHY.
const XM_IS_PHY_ONLY: u16 =
    XM_IS_LNK_AE | XM_IS_LIPA_RC | XM_IS_RX_PAGE | XM_IS_TX_PAGE | XM_IS_AND | XM_IS_INP_ASS;

// XMAC general purpose port
pub const XM_GP_INP_ASS: u32 = 1 << 4;

// Receive and transmit MAC FIFO control
pub const MFF_CLR_PERR: u16 = 1 << 15;
pub const MFF_CLR_INSTAT: u16 = 1 << 12;
pub const MFF_CLR_INTIST: u16 = 1 << 11;
pub const MFF_ENA_PAUSE: u16 = 1 << 3;
pub const MFF_DIS_PAUSE: u16 = 1 << 2;

// GMAC FIFO control
pub const GMF_CLI_TX_FU: u8 = 1 << 6;
pub const GMF_CLI_TX_FC: u8 = 1 << 5;
pub const GMF_CLI_RX_FO: u8 = 1 << 5;
pub const GMF_CLI_TX_PE: u8 = 1 << 4;

// Link sync counter control
pub const LED_CLR_IRQ: u8 = 1 << 1;

// GMAC general purpose control
pub const GM_GPCR_TX_ENA: u16 = 1 << 12;
pub const GM_GPCR_RX_ENA: u16 = 1 << 11;
pub const GM_GPCR_DUP_FULL: u16 = 1 << 5;

// GMAC interrupt source and mask
pub const GM_IS_TX_CO_OV: u8 = 1 << 5;
pub const GM_IS_RX_CO_OV: u8 = 1 << 4;
pub const GM_IS_TX_FF_UR: u8 = 1 << 3;
pub const GM_IS_RX_FF_OR: u8 = 1 << 1;
pub const GMAC_DEF_MSK: u8 = GM_IS_TX_CO_OV | GM_IS_RX_CO_OV | GM_IS_TX_FF_UR;

/// Outcome of a MAC interrupt for the port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MacIrq {
    pub link_down: bool,
    /// Source bits of a statistics counter overflow.
    pub counter_overflow: Option<u16>,
}

/// Enables the receiver and transmitter once the link is usable.
pub fn rx_tx_enable(link: &mut Link<'_>) {
    if !link.port.hw_link_up {
        return;
    }
    if link.port.is_autoneg() && link.port.autoneg_fail {
        return;
    }

    let phy_type = link.port.phy_type;
    let full = link.port.link_mode_status.is_full();

    match phy_type.mac_type() {
        MacType::Xmac => {
            init_duplex(link);
            init_pause(link);

            let mut mask = XM_DEF_MSK;
            if phy_type != PhyType::Xmac {
                // Link sync is reported by the external PHY instead
                mask |= XM_IS_INP_ASS;
            }
            link.write16(MacRegister::XmImsk, mask);

            let mut cmd = link.read16(MacRegister::XmMmuCmd);
            if phy_type != PhyType::Xmac && full {
                cmd |= XM_MMU_GMII_FD;
            }

            match phy_type {
                PhyType::Bcom => {
                    // Power management has to stay off while the link is up
                    let aux = link.phy_read(bcom::AUX_CTRL);
                    link.phy_write(bcom::AUX_CTRL, aux & !bcom::AUX_DIS_PM);
                    link.phy_write(bcom::INT_MASK, bcom::DEF_MSK);
                }
                PhyType::Lone => link.phy_write(lone::INT_ENAB, lone::DEF_MSK),
                _ => {}
            }

            link.write16(MacRegister::XmMmuCmd, cmd | XM_MMU_ENA_RX | XM_MMU_ENA_TX);
        }
        MacType::Gmac => {
            link.write8(MacRegister::GmacIrqMsk, GMAC_DEF_MSK);

            let mut ctrl = link.read16(MacRegister::GmGpCtrl);
            if full {
                ctrl |= GM_GPCR_DUP_FULL;
            }
            link.write16(MacRegister::GmGpCtrl, ctrl | GM_GPCR_RX_ENA | GM_GPCR_TX_ENA);

            link.phy_write(marvell::INT_MASK, marvell::DEF_MSK);
        }
    }
}

pub fn rx_tx_disable(link: &mut Link<'_>) {
    match link.port.phy_type.mac_type() {
        MacType::Xmac => {
            let cmd = link.read16(MacRegister::XmMmuCmd);
            link.write16(
                MacRegister::XmMmuCmd,
                cmd & !(XM_MMU_ENA_RX | XM_MMU_ENA_TX),
            );
            // Dummy read so the write has landed before returning
            link.read16(MacRegister::XmMmuCmd);
        }
        MacType::Gmac => {
            let ctrl = link.read16(MacRegister::GmGpCtrl);
            link.write16(
                MacRegister::GmGpCtrl,
                ctrl & !(GM_GPCR_RX_ENA | GM_GPCR_TX_ENA),
            );
            link.read16(MacRegister::GmGpCtrl);
        }
    }
}

pub fn irq_disable(link: &mut Link<'_>) {
    match link.port.phy_type.mac_type() {
        MacType::Xmac => {
            link.write16(MacRegister::XmImsk, 0xffff);

            match link.port.phy_type {
                PhyType::Bcom if link.port.state != PortState::Reset => {
                    let aux = link.phy_read(bcom::AUX_CTRL);
                    link.phy_write(bcom::AUX_CTRL, aux | bcom::AUX_DIS_PM);
                    link.phy_write(bcom::INT_MASK, 0xffff);
                }
                PhyType::Lone => link.phy_write(lone::INT_ENAB, 0),
                _ => {}
            }
        }
        MacType::Gmac => {
            link.write8(MacRegister::GmacIrqMsk, 0);
            link.phy_write(marvell::INT_MASK, 0);
        }
    }
}

pub fn flush_tx_fifo(link: &mut Link<'_>) {
    match link.port.phy_type.mac_type() {
        MacType::Xmac => {
            let mode = link.read32(MacRegister::XmMode);
            link.write32(MacRegister::XmMode, mode | XM_MD_FTF);
        }
        MacType::Gmac => log::debug!("Port {}: GMAC has no transmit FIFO flush", link.index()),
    }
}

/// MAC interrupt service.
pub fn irq(link: &mut Link<'_>) -> MacIrq {
    match link.port.phy_type.mac_type() {
        MacType::Xmac => xmac_irq(link),
        MacType::Gmac => gmac_irq(link),
    }
}

fn xmac_irq(link: &mut Link<'_>) -> MacIrq {
    let mut irq = MacIrq::default();
    let mut status = link.read16(MacRegister::XmIsrc);

    if link.port.phy_type == PhyType::Xmac {
        link.detect_partner_isrc(status);
    } else {
        status &= !XM_IS_PHY_ONLY;
    }

    if !link.port.hw_link_up {
        log::debug!("Port {}: spurious MAC interrupt {:#06x}", link.index(), status);
        return irq;
    }

    if status & XM_IS_INP_ASS != 0 {
        // Input assert is latched; see whether sync is still lost
        let again = link.read16(MacRegister::XmIsrc);
        status = (status & !XM_IS_INP_ASS) | again;
    }

    if status & (XM_IS_INP_ASS | XM_IS_LIPA_RC | XM_IS_RX_PAGE) != 0 {
        link.link_down();
        irq.link_down = true;
    }

    if status & (XM_IS_RXC_OV | XM_IS_TXC_OV) != 0 {
        irq.counter_overflow = Some(status);
    }

    if status & XM_IS_TXF_UR != 0 {
        log::error!("Port {}: transmit FIFO underrun", link.index());
    }

    irq
}

fn gmac_irq(link: &mut Link<'_>) -> MacIrq {
    let mut irq = MacIrq::default();
    let status = link.read8(MacRegister::GmacIrqSrc);

    if status & (GM_IS_RX_CO_OV | GM_IS_TX_CO_OV) != 0 {
        irq.counter_overflow = Some(u16::from(status));
    }

    if status & GM_IS_RX_FF_OR != 0 {
        link.write8(MacRegister::RxGmfCtrl, GMF_CLI_RX_FO);
    }

    if status & GM_IS_TX_FF_UR != 0 {
        link.write8(MacRegister::TxGmfCtrl, GMF_CLI_TX_FU);
        log::error!("Port {}: transmit FIFO underrun", link.index());
    }

    irq
}

fn init_duplex(link: &mut Link<'_>) {
    // The XMAC follows the PHY's duplex on its own
    if link.port.link_mode_status == LinkModeStatus::Unknown {
        log::error!("Port {}: duplex mode unknown", link.index());
    }
}

fn init_pause(link: &mut Link<'_>) {
    let flow = link.port.flow_ctrl_status;

    let mut cmd = link.read16(MacRegister::XmMmuCmd);
    if matches!(flow, FlowCtrlStatus::None | FlowCtrlStatus::LocSend) {
        cmd |= XM_MMU_IGN_PF;
    } else {
        cmd &= !XM_MMU_IGN_PF;
    }
    link.write16(MacRegister::XmMmuCmd, cmd);

    let mut mode = link.read32(MacRegister::XmMode);
    if matches!(flow, FlowCtrlStatus::Symmetric | FlowCtrlStatus::LocSend) {
        link.write16(MacRegister::XmMacPtime, 0xffff);
        mode |= XM_PAUSE_MODE;
        link.write16(MacRegister::RxMffCtrl1, MFF_ENA_PAUSE);
    } else {
        mode &= !XM_PAUSE_MODE;
        link.write16(MacRegister::RxMffCtrl1, MFF_DIS_PAUSE);
    }
    link.write32(MacRegister::XmMode, mode);
}
