use std::io;

use chrono::{DateTime, TimeDelta, Utc};

/// Source and sink of local wall-clock time.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    fn set(&mut self, to: DateTime<Utc>) -> io::Result<()>;
}

/// The host realtime clock. Setting it needs `CAP_SYS_TIME` or root.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    #[cfg(unix)]
    fn set(&mut self, to: DateTime<Utc>) -> io::Result<()> {
        // SAFETY: `timespec` is plain data; zeroing covers any platform padding.
        let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
        ts.tv_sec = to.timestamp() as libc::time_t;
        ts.tv_nsec = to.timestamp_subsec_nanos() as libc::c_long;

        // SAFETY: `ts` is a valid, initialised timespec for the duration of the call.
        let rc = unsafe { libc::clock_settime(libc::CLOCK_REALTIME, &ts) };
        if rc == 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    fn set(&mut self, _to: DateTime<Utc>) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "setting the system clock is only supported on unix",
        ))
    }
}

/// Result of comparing local time against network time.
///
/// `drift` is network time minus local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSync {
    /// The modem had no network time to offer.
    Unavailable,
    InSync { drift: TimeDelta },
    Corrected { drift: TimeDelta },
}

impl TimeSync {
    pub fn drift(&self) -> Option<TimeDelta> {
        match self {
            TimeSync::Unavailable => None,
            TimeSync::InSync { drift } | TimeSync::Corrected { drift } => Some(*drift),
        }
    }
}
