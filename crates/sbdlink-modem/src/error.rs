use std::path::PathBuf;

/// Errors that can occur talking to the modem.
#[derive(Debug, thiserror::Error)]
pub enum ModemError {
    /// Failed to open the serial device.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The requested line speed has no termios equivalent.
    #[error("unsupported baud rate {0}")]
    UnsupportedBaud(u32),

    /// An I/O error occurred on the port.
    #[error("modem I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete response arrived in time.
    #[error("timed out waiting for response to {command}")]
    Timeout { command: String },

    /// The modem answered `ERROR`.
    #[error("modem rejected {command}")]
    CommandFailed { command: String },

    /// The response could not be parsed.
    #[error("unexpected response to {command}: {response:?}")]
    UnexpectedResponse { command: String, response: String },

    /// `+SBDWB` finished with a non-zero result.
    #[error("outbound load rejected (code {code}): {reason}")]
    LoadRejected { code: u8, reason: &'static str },

    /// A registration location is not `[+|-]DDMM.MMM,[+|-]dddmm.mmm`.
    #[error("invalid registration location {0:?}")]
    InvalidLocation(String),

    /// The outbound message exceeds the modem buffer.
    #[error("message too long ({len} bytes, max {max})")]
    MessageTooLong { len: usize, max: usize },
}

impl ModemError {
    /// True when the failure is a timeout on either side of the serial line.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            ModemError::Timeout { .. } | ModemError::LoadRejected { code: 1, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ModemError>;
