//! Descriptor registry shared by the SBD encode and decode paths.
//!
//! Every frame carries a one-byte descriptor code. The registry maps those
//! codes to descriptor strings and back. Code `0` is reserved for the
//! filler descriptor.
//!
//! Flight and ground software must be built from the same registry
//! snapshot; nothing on the wire identifies which snapshot produced a frame.
//! [`DescriptorRegistry::fingerprint`] gives operators something to compare.

pub mod config;
pub mod error;
pub mod registry;

pub use config::RegistryConfig;
pub use error::{RegistryError, Result};
pub use registry::{DescriptorRegistry, FILLER, FILLER_CODE, MAX_CODES};
