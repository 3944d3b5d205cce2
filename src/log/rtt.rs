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

#![cfg(feature = "rtt")]

use log::{LevelFilter, Log, Metadata, Record};

/// Sets up the RTT control block with a single up channel for logs.
#[rustfmt::skip::macros(rtt_init)]
pub fn new(level: LevelFilter) -> Logger {
    let channels = rtt_target::rtt_init! {
        up: {
            0: {
                size: 2048
                mode: NoBlockSkip
                name: "ge-link"
            }
        }
    };

    rtt_target::set_print_channel(channels.up.0);

    Logger { level }
}

pub struct Logger {
    pub level: LevelFilter,
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        // Link events are easier to follow by module than by file
        rtt_target::rprintln!(
            "{:<5} {} - {}",
            record.level(),
            record.module_path().unwrap_or(record.target()),
            record.args()
        );
    }

    fn flush(&self) {}
}
