// Copyright 2023 Alex Crawford
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

#![cfg(feature = "itm")]

use cortex_m::peripheral::ITM;
use cortex_m_log::destination::Itm;
use cortex_m_log::printer::itm::InterruptSync;
use log::LevelFilter;

pub type Logger = cortex_m_log::log::Logger<InterruptSync>;

/// Logs over stimulus port 0. Routing SWO to a pin and clocking the trace
/// unit is left to the board.
pub fn new(level: LevelFilter, itm: ITM) -> Logger {
    Logger {
        inner: InterruptSync::new(Itm::new(itm)),
        level,
    }
}
