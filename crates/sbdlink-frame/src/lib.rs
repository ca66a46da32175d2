//! Compact telemetry framing for Iridium Short Burst Data.
//!
//! Every downlink frame carries:
//! - A 1-byte fragment index (6 bits) and numeric flag
//! - A 2-byte big-endian day/hour/minute timestamp
//! - A 1-byte descriptor code from the shared registry
//! - Values as 3-byte decimal floats, or raw ASCII text
//!
//! Messages exchanged with the modem add a 2-byte length prefix and a 2-byte
//! additive checksum around the frame body.

pub mod codec;
pub mod error;
pub mod float;
pub mod packet;
pub mod split;

pub use codec::{
    checksum, decode, decode_telemetry, encode, encode_command, encode_into, unwrap, wrap,
    FrameConfig, DEFAULT_MAX_FRAME_SIZE, ENVELOPE_SIZE, HEADER_SIZE, MAX_FRAGMENTS,
};
pub use error::{FrameError, Result};
pub use float::{decode_float, decode_floats, encode_float, encode_floats, ENCODED_VALUE_SIZE};
pub use packet::{Packet, Payload, WireTime};
pub use split::{fragment_count, split};
