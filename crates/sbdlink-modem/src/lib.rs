//! Iridium SBD modem collaborator.
//!
//! Provides the blocking [`Modem`] interface the session engine drives and
//! an AT-command implementation over any `Read + Write` port:
//! - [`AtModem`]: started handle, only obtainable after the modem answers `AT`
//! - [`SerialPort`]: raw termios serial line (unix)
//!
//! Timeouts are enforced here, not by callers.

pub mod at;
pub mod config;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use at::{iridium_time, AtModem, IRIDIUM_EPOCH};
pub use config::ModemConfig;
pub use error::{ModemError, Result};
pub use traits::{Geolocation, Modem, Registration, SbdStatus, SessionResult};

#[cfg(unix)]
pub use serial::SerialPort;
