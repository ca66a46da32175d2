use chrono::{DateTime, Utc};

use crate::error::Result;

/// Buffer state reported by `+SBDS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SbdStatus {
    /// A message is waiting in the mobile-originated buffer.
    pub mo_flag: bool,
    /// Sequence number of the next MO session.
    pub mo_sequence: u32,
    /// A message is waiting in the mobile-terminated buffer.
    pub mt_flag: bool,
    /// Sequence number of the buffered MT message, if any.
    pub mt_sequence: Option<u32>,
}

/// Outcome of one `+SBDIX` exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionResult {
    pub mo_status: u8,
    pub mo_sequence: u32,
    /// 0: no message, 1: message received, 2: error while receiving.
    pub mt_status: u8,
    pub mt_sequence: u32,
    pub mt_length: u32,
    /// Messages still waiting at the gateway.
    pub mt_queued: u32,
}

impl SessionResult {
    /// MT status value meaning a message was transferred into the MT buffer.
    pub const MT_RECEIVED: u8 = 1;

    pub fn mt_received(&self) -> bool {
        self.mt_status == Self::MT_RECEIVED
    }
}

/// Position at the last constellation contact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geolocation {
    pub latitude: f64,
    pub longitude: f64,
    /// Distance from the Earth's centre in kilometres.
    pub altitude_km: f64,
    pub fixed_at: DateTime<Utc>,
}

/// Outcome of a manual `+SBDREG` registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// 0 detached, 1 not registered, 2 registered, 3 denied.
    pub status: u8,
    pub error: u8,
}

impl Registration {
    pub const REGISTERED: u8 = 2;

    pub fn is_registered(&self) -> bool {
        self.status == Self::REGISTERED
    }
}

/// The blocking modem operations the session engine relies on.
///
/// Implementations own their timeouts; every call either completes or
/// fails with a [`crate::ModemError`].
pub trait Modem {
    fn status(&mut self) -> Result<SbdStatus>;

    /// The MT buffer as returned by the modem: length, body, checksum.
    fn read_inbound(&mut self) -> Result<Vec<u8>>;

    /// Load a frame body into the MO buffer.
    fn load_outbound(&mut self, body: &[u8]) -> Result<()>;

    /// Run one satellite exchange. May block for tens of seconds.
    fn initiate_session(&mut self) -> Result<SessionResult>;

    /// Clear both the MO and MT buffers.
    fn clear_buffers(&mut self) -> Result<()>;

    fn network_available(&mut self) -> Result<bool>;

    /// Network time, or `None` without service.
    fn network_time(&mut self) -> Result<Option<DateTime<Utc>>>;

    fn geolocation(&mut self) -> Result<Option<Geolocation>> {
        Ok(None)
    }
}

impl<M: Modem + ?Sized> Modem for &mut M {
    fn status(&mut self) -> Result<SbdStatus> {
        (**self).status()
    }

    fn read_inbound(&mut self) -> Result<Vec<u8>> {
        (**self).read_inbound()
    }

    fn load_outbound(&mut self, body: &[u8]) -> Result<()> {
        (**self).load_outbound(body)
    }

    fn initiate_session(&mut self) -> Result<SessionResult> {
        (**self).initiate_session()
    }

    fn clear_buffers(&mut self) -> Result<()> {
        (**self).clear_buffers()
    }

    fn network_available(&mut self) -> Result<bool> {
        (**self).network_available()
    }

    fn network_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        (**self).network_time()
    }

    fn geolocation(&mut self) -> Result<Option<Geolocation>> {
        (**self).geolocation()
    }
}

impl<M: Modem + ?Sized> Modem for Box<M> {
    fn status(&mut self) -> Result<SbdStatus> {
        (**self).status()
    }

    fn read_inbound(&mut self) -> Result<Vec<u8>> {
        (**self).read_inbound()
    }

    fn load_outbound(&mut self, body: &[u8]) -> Result<()> {
        (**self).load_outbound(body)
    }

    fn initiate_session(&mut self) -> Result<SessionResult> {
        (**self).initiate_session()
    }

    fn clear_buffers(&mut self) -> Result<()> {
        (**self).clear_buffers()
    }

    fn network_available(&mut self) -> Result<bool> {
        (**self).network_available()
    }

    fn network_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        (**self).network_time()
    }

    fn geolocation(&mut self) -> Result<Option<Geolocation>> {
        (**self).geolocation()
    }
}
