/// Errors that can occur during packet encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The packet descriptor is not in the registry.
    #[error("descriptor '{0}' is not registered")]
    UnregisteredDescriptor(String),

    /// The packet has not been timestamped.
    #[error("packet has no timestamp")]
    MissingTimestamp,

    /// The fragment index does not fit the header bits.
    #[error("fragment index {index} out of range (max {max})")]
    FragmentIndexOutOfRange { index: usize, max: usize },

    /// Splitting would produce more fragments than the header can index.
    #[error("payload needs {count} fragments (max {max})")]
    TooManyFragments { count: usize, max: usize },

    /// The encoded frame exceeds the configured maximum size.
    #[error("frame too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// A textual payload contains non-ASCII characters.
    #[error("text payload is not ASCII")]
    NonAsciiText,

    /// The value cannot be represented by the 3-byte float encoding.
    #[error("value {0} out of encodable range")]
    ValueOutOfRange(f64),

    /// The envelope checksum does not match the body.
    #[error("checksum mismatch (expected {expected:#06x}, computed {actual:#06x})")]
    ChecksumMismatch { expected: u16, actual: u16 },

    /// The envelope length prefix does not match the body.
    #[error("length mismatch (declared {declared}, actual {actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// The message is too short to hold the required fields.
    #[error("message truncated ({len} bytes, need at least {min})")]
    Truncated { len: usize, min: usize },

    /// The descriptor code is outside the registry.
    #[error("unknown descriptor code {0}")]
    UnknownDescriptor(u8),

    /// The packed day/hour/minute does not name a valid instant.
    #[error("invalid timestamp (day {day}, hour {hour}, minute {minute})")]
    InvalidTimestamp { day: u8, hour: u8, minute: u8 },
}

impl FrameError {
    /// True for envelope-level corruption (checksum, length, truncation).
    pub fn is_framing(&self) -> bool {
        matches!(
            self,
            FrameError::ChecksumMismatch { .. }
                | FrameError::LengthMismatch { .. }
                | FrameError::Truncated { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
