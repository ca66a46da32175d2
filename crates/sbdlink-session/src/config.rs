use std::time::Duration;

use sbdlink_frame::FrameConfig;

/// Drift beyond which [`crate::SessionEngine::sync_time`] sets the clock.
pub const DEFAULT_TIME_SYNC_THRESHOLD: Duration = Duration::from_secs(120);

/// Configuration for a [`crate::SessionEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Frame size and fragment limits used when queueing and encoding.
    pub frame: FrameConfig,
    /// Clock drift tolerated before correcting. Default: 120 s.
    pub time_sync_threshold: Duration,
    /// Upper bound on SBD sessions per contact. `None` means unbounded.
    pub max_sessions: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            time_sync_threshold: DEFAULT_TIME_SYNC_THRESHOLD,
            max_sessions: None,
        }
    }
}
