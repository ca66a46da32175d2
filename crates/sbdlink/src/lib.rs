//! Iridium Short Burst Data link for small satellites.
//!
//! sbdlink packs telemetry into compact checksummed frames, queues them for
//! opportunistic transmission, and runs the SBD session loop that sends
//! them and collects uplinked commands.
//!
//! # Crate Structure
//!
//! - [`registry`]: descriptor code <-> name mapping shared by both ends
//! - [`frame`]: 3-byte floats, packets, fragmenting and frame codec
//! - [`modem`]: blocking modem interface, AT driver and serial port
//! - [`session`]: contact engine and time sync (behind `session` feature)

/// Re-export registry types.
pub mod registry {
    pub use sbdlink_registry::*;
}

/// Re-export frame types.
pub mod frame {
    pub use sbdlink_frame::*;
}

/// Re-export modem types.
pub mod modem {
    pub use sbdlink_modem::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use sbdlink_session::*;
}
