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

//! Link establishment for SysKonnect GEnesis (XMAC II) and Yukon (GMAC)
//! gigabit adapters.
//!
//! An [`Adapter`] owns the register handle, the event queue, the software
//! timers and one [`port::Port`] per MAC. Firmware feeds it the adapter
//! interrupt status through [`Adapter::sirq_isr`] and then drains the
//! queue with [`Adapter::dispatch`], which hands everything outside the
//! link core to its [`Collaborators`].

#![cfg_attr(not(test), no_std)]

/// Declares a `u32`-coded enum with conversions in both directions.
macro_rules! codes {
    ($(#[$meta:meta])* $name:ident {
        $($(#[$vmeta:meta])* $variant:ident = $value:expr,)+
    }) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        #[repr(u32)]
        pub enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl TryFrom<u32> for $name {
            type Error = ();

            fn try_from(code: u32) -> Result<$name, ()> {
                match code {
                    $(c if c == $value => Ok($name::$variant),)+
                    _ => Err(()),
                }
            }
        }

        impl From<$name> for u32 {
            fn from(code: $name) -> u32 {
                code as u32
            }
        }
    };
}

pub mod adapter;
pub mod bcom;
pub mod config;
pub mod error;
pub mod event;
pub mod link;
pub mod log;
pub mod lone;
pub mod mac;
pub mod marvell;
pub mod phy;
pub mod port;
pub mod sirq;
pub mod timer;
pub mod xmac;

#[cfg(test)]
mod testing;

pub use adapter::{Adapter, Collaborators};
pub use error::Error;
