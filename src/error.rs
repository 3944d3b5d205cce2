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

use core::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    /// The port index does not name a MAC found on this adapter.
    InvalidPort(usize),
    /// Every slot of the timer arena is already registered.
    TimerSlotsExhausted,
    /// The MAC statistics block could not be snapped.
    Statistics,
    /// A collaborator rejected an event.
    Collaborator(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::InvalidPort(port) => write!(f, "invalid port {}", port),
            Error::TimerSlotsExhausted => f.write_str("no free timer slots"),
            Error::Statistics => f.write_str("statistics update failed"),
            Error::Collaborator(reason) => write!(f, "collaborator failed: {}", reason),
        }
    }
}
