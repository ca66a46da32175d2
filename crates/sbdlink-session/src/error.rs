use crate::classify::HardwareFault;

/// Errors that abort a contact.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The modem reported a hardware-level failure.
    #[error("hardware fault (mo status {code}): {fault}")]
    HardwareFault { code: u8, fault: HardwareFault },

    /// The modem reported an MO status outside every known class.
    #[error("transmit failed with mo status {code}")]
    Transmit { code: u8 },

    /// Modem transport failure, including timeouts.
    #[error("modem error: {0}")]
    Modem(#[from] sbdlink_modem::ModemError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] sbdlink_frame::FrameError),

    /// The local clock could not be set.
    #[error("failed to set system clock: {0}")]
    Clock(std::io::Error),
}

pub type Result<T> = std::result::Result<T, SessionError>;
