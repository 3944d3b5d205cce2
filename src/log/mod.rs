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

//! Firmware log backends. Every backend hangs off one `Logger`, which is
//! installed as the `log` facade's logger once the backends are attached.
//!
//! ```ignore
//! let logger = cortex_m::singleton!(: Logger = Logger::new()
//!     .with_rtt(ge_link::log::rtt::new(log::LevelFilter::Debug)))
//!     .unwrap();
//! logger.install().unwrap();
//! ```

use log::{LevelFilter, Log, Metadata, Record};

pub mod itm;
pub mod rtt;

#[derive(Default)]
pub struct Logger {
    #[cfg(feature = "itm")]
    itm: Option<itm::Logger>,

    #[cfg(feature = "rtt")]
    rtt: Option<rtt::Logger>,
}

impl Logger {
    pub const fn new() -> Logger {
        Logger {
            #[cfg(feature = "itm")]
            itm: None,

            #[cfg(feature = "rtt")]
            rtt: None,
        }
    }

    #[cfg(feature = "itm")]
    pub fn with_itm(mut self, logger: itm::Logger) -> Logger {
        self.itm = Some(logger);
        self
    }

    #[cfg(feature = "rtt")]
    pub fn with_rtt(mut self, logger: rtt::Logger) -> Logger {
        self.rtt = Some(logger);
        self
    }

    /// The most verbose level any attached backend accepts.
    pub fn max_level(&self) -> LevelFilter {
        #[allow(unused_mut)]
        let mut level = LevelFilter::Off;

        #[cfg(feature = "itm")]
        if let Some(itm) = &self.itm {
            level = level.max(itm.level);
        }

        #[cfg(feature = "rtt")]
        if let Some(rtt) = &self.rtt {
            level = level.max(rtt.level);
        }

        level
    }

    /// Makes this the global logger. Fails if a logger is already set.
    pub fn install(&'static self) -> Result<(), log::SetLoggerError> {
        log::set_logger(self)?;
        log::set_max_level(self.max_level());
        log::info!("Logging online at {}", self.max_level());
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        #[cfg(feature = "itm")]
        match &self.itm {
            Some(itm) if itm.enabled(metadata) => return true,
            _ => {}
        }

        #[cfg(feature = "rtt")]
        match &self.rtt {
            Some(rtt) if rtt.enabled(metadata) => return true,
            _ => {}
        }

        let _ = metadata;
        false
    }

    fn log(&self, record: &Record) {
        #[cfg(feature = "itm")]
        if let Some(itm) = &self.itm {
            itm.log(record);
        }

        #[cfg(feature = "rtt")]
        if let Some(rtt) = &self.rtt {
            rtt.log(record);
        }

        let _ = record;
    }

    fn flush(&self) {
        #[cfg(feature = "itm")]
        if let Some(itm) = &self.itm {
            itm.flush();
        }

        #[cfg(feature = "rtt")]
        if let Some(rtt) = &self.rtt {
            rtt.flush();
        }
    }
}
