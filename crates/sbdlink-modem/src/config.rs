use std::time::Duration;

/// Default time to wait for an ordinary command response.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(2);

/// Default time to wait for `+SBDIX`, which spans a satellite exchange.
pub const DEFAULT_SESSION_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time to wait for `READY` after `+SBDWB`.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Default time to wait for an active `+CSQ` query, which can span a
/// satellite handoff.
pub const DEFAULT_SIGNAL_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest MO message the 9602/9603 accepts.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 340;

/// Timeouts and limits for the AT driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemConfig {
    pub command_timeout: Duration,
    pub session_timeout: Duration,
    pub ready_timeout: Duration,
    pub signal_timeout: Duration,
    /// Maximum outbound message size in bytes.
    pub max_message_size: usize,
}

impl Default for ModemConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            session_timeout: DEFAULT_SESSION_TIMEOUT,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            signal_timeout: DEFAULT_SIGNAL_TIMEOUT,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }
}
