//! Store-and-forward contact engine for an Iridium SBD link.
//!
//! A [`SessionEngine`] owns the transmission and received queues, drives
//! repeated SBD sessions against a [`sbdlink_modem::Modem`] while the
//! network is available, and classifies each session's MO status into
//! continue, no-signal, or fault.

pub mod classify;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;

pub use classify::{classify, HardwareFault, MoDisposition, NO_SIGNAL_CODES};
pub use clock::{Clock, SystemClock, TimeSync};
pub use config::SessionConfig;
pub use engine::{ContactOutcome, ContactReport, SessionEngine};
pub use error::{Result, SessionError};
