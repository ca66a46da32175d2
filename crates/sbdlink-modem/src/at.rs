use std::io::{ErrorKind, Read, Write};
use std::ops::Range;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::config::ModemConfig;
use crate::error::{ModemError, Result};
use crate::traits::{Geolocation, Modem, Registration, SbdStatus, SessionResult};

/// Iridium system time epoch, 2014-05-11 14:23:55 UTC, in Unix seconds.
pub const IRIDIUM_EPOCH: i64 = 1_399_818_235;

/// Length of one Iridium system time tick.
const TICK_MILLIS: i64 = 90;

const OK: &[u8] = b"OK\r\n";
const ERROR: &[u8] = b"ERROR";
const READY: &[u8] = b"READY\r\n";
const POLL_INTERVAL: Duration = Duration::from_millis(10);

const SBDS: &str = "AT+SBDS";
const SBDRB: &str = "AT+SBDRB";
const SBDIX: &str = "AT+SBDIX";
const SBDD2: &str = "AT+SBDD2";
const MSSTM: &str = "AT-MSSTM";
const MSGEO: &str = "AT-MSGEO";
const CSQF: &str = "AT+CSQF";
const CSQ: &str = "AT+CSQ";
const SBDREG: &str = "AT+SBDREG";
const SOFT_RESET: &str = "ATZ0";

type NetworkIndicator = Box<dyn FnMut() -> bool + Send>;

/// A started AT-command modem.
///
/// Only [`AtModem::start`] builds one, after the modem has answered `AT`,
/// so every handle in circulation talks to a responsive device.
pub struct AtModem<T> {
    port: T,
    config: ModemConfig,
    network_indicator: Option<NetworkIndicator>,
}

impl<T: Read + Write> AtModem<T> {
    /// Check the modem answers and switch command echo off.
    pub fn start(port: T, config: ModemConfig) -> Result<Self> {
        let mut modem = Self {
            port,
            config,
            network_indicator: None,
        };
        modem.request("AT")?;
        modem.request("ATE0")?;
        debug!("modem started");
        Ok(modem)
    }

    /// Use an external network-available line instead of polling `+CSQF`.
    pub fn with_network_indicator(
        mut self,
        indicator: impl FnMut() -> bool + Send + 'static,
    ) -> Self {
        self.network_indicator = Some(Box::new(indicator));
        self
    }

    pub fn config(&self) -> &ModemConfig {
        &self.config
    }

    /// Flush settings to the modem (`AT*F`) and hand back the port.
    pub fn shutdown(mut self) -> Result<T> {
        self.request("AT*F")?;
        debug!("modem shut down");
        Ok(self.port)
    }

    /// Release the port without talking to the modem.
    pub fn into_inner(self) -> T {
        self.port
    }

    /// Last known signal quality, 0 (none) to 5 (strongest).
    pub fn signal_quality(&mut self) -> Result<u8> {
        let response = self.request(CSQF)?;
        let quality = field(CSQF, &response, "+CSQF:")?
            .parse::<u8>()
            .ok()
            .filter(|q| *q <= 5)
            .ok_or_else(|| unexpected(CSQF, &response))?;
        Ok(quality)
    }

    /// Actively measured signal quality, 0 to 5. Slower than
    /// [`AtModem::signal_quality`]; bounded by `signal_timeout`.
    pub fn signal_quality_active(&mut self) -> Result<u8> {
        let response = self.request_with_timeout(CSQ, self.config.signal_timeout)?;
        let quality = field(CSQ, &response, "+CSQ:")?
            .parse::<u8>()
            .ok()
            .filter(|q| *q <= 5)
            .ok_or_else(|| unexpected(CSQ, &response))?;
        Ok(quality)
    }

    /// Restore the stored profile without a power cycle. Echo is switched
    /// off again afterwards.
    pub fn soft_reset(&mut self) -> Result<()> {
        self.request(SOFT_RESET)?;
        self.request("ATE0")?;
        debug!("modem soft reset");
        Ok(())
    }

    /// Manual network registration (attach and location update). No MO or
    /// MT message is transferred.
    ///
    /// `location` is `[+|-]DDMM.MMM,[+|-]dddmm.mmm`.
    pub fn register(&mut self, location: Option<&str>) -> Result<Registration> {
        let command = match location {
            Some(location) => {
                if !valid_location(location) {
                    return Err(ModemError::InvalidLocation(location.to_string()));
                }
                format!("{SBDREG}={location}")
            }
            None => SBDREG.to_string(),
        };
        let response = self.request_with_timeout(&command, self.config.session_timeout)?;
        let fields = numbers(&command, &response, "+SBDREG:", 2)?;
        let registration = Registration {
            status: narrow(&command, &response, fields[0])?,
            error: narrow(&command, &response, fields[1])?,
        };
        debug!(
            status = registration.status,
            error = registration.error,
            "registration finished"
        );
        Ok(registration)
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn request(&mut self, command: &str) -> Result<String> {
        self.request_with_timeout(command, self.config.command_timeout)
    }

    fn request_with_timeout(&mut self, command: &str, timeout: Duration) -> Result<String> {
        trace!(command, "sending");
        self.send(format!("{command}\r").as_bytes())?;

        let raw = self.read_until(command, timeout, |buf| {
            find(buf, OK).is_some() || find(buf, ERROR).is_some()
        })?;
        let response = String::from_utf8_lossy(&raw).into_owned();
        trace!(command, response = %response.trim(), "received");

        if find(&raw, ERROR).is_some() {
            return Err(ModemError::CommandFailed {
                command: command.to_string(),
            });
        }
        Ok(response)
    }

    fn read_until(
        &mut self,
        command: &str,
        timeout: Duration,
        done: impl Fn(&[u8]) -> bool,
    ) -> Result<Vec<u8>> {
        let deadline = Instant::now() + timeout;
        let mut buf = Vec::new();
        let mut chunk = [0u8; 64];

        loop {
            if done(&buf) {
                return Ok(buf);
            }
            if Instant::now() >= deadline {
                return Err(ModemError::Timeout {
                    command: command.to_string(),
                });
            }
            match self.port.read(&mut chunk) {
                Ok(0) => std::thread::sleep(POLL_INTERVAL),
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(err)
                    if matches!(
                        err.kind(),
                        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                    ) => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl<T: Read + Write> Modem for AtModem<T> {
    fn status(&mut self) -> Result<SbdStatus> {
        let response = self.request(SBDS)?;
        let fields = numbers(SBDS, &response, "+SBDS:", 4)?;
        Ok(SbdStatus {
            mo_flag: fields[0] != 0,
            mo_sequence: narrow(SBDS, &response, fields[1])?,
            mt_flag: fields[2] != 0,
            mt_sequence: u32::try_from(fields[3]).ok(),
        })
    }

    fn read_inbound(&mut self) -> Result<Vec<u8>> {
        trace!(command = SBDRB, "sending");
        self.send(format!("{SBDRB}\r").as_bytes())?;

        let raw = self.read_until(SBDRB, self.config.command_timeout, |buf| {
            binary_message(buf).is_some() || is_error(buf)
        })?;
        let range = binary_message(&raw).ok_or_else(|| ModemError::CommandFailed {
            command: SBDRB.to_string(),
        })?;
        debug!(len = range.len(), "read MT buffer");
        Ok(raw[range].to_vec())
    }

    fn load_outbound(&mut self, body: &[u8]) -> Result<()> {
        if body.len() > self.config.max_message_size {
            return Err(ModemError::MessageTooLong {
                len: body.len(),
                max: self.config.max_message_size,
            });
        }

        let command = format!("AT+SBDWB={}", body.len());
        trace!(command = %command, "sending");
        self.send(format!("{command}\r").as_bytes())?;
        let ready = self.read_until(&command, self.config.ready_timeout, |buf| {
            find(buf, READY).is_some() || find(buf, ERROR).is_some()
        })?;
        if find(&ready, READY).is_none() {
            return Err(ModemError::CommandFailed { command });
        }

        let mut message = Vec::with_capacity(body.len() + 2);
        message.extend_from_slice(body);
        message.extend_from_slice(&checksum(body).to_be_bytes());
        self.send(&message)?;

        let raw = self.read_until(&command, self.config.command_timeout, |buf| {
            find(buf, OK).is_some() || find(buf, ERROR).is_some()
        })?;
        let response = String::from_utf8_lossy(&raw);
        match result_code(&response) {
            Some(0) => {
                debug!(len = body.len(), "loaded MO buffer");
                Ok(())
            }
            Some(1) => Err(ModemError::LoadRejected {
                code: 1,
                reason: "transfer timed out",
            }),
            Some(2) => Err(ModemError::LoadRejected {
                code: 2,
                reason: "checksum mismatch",
            }),
            Some(3) => Err(ModemError::LoadRejected {
                code: 3,
                reason: "message size out of range",
            }),
            _ => Err(unexpected(&command, &response)),
        }
    }

    fn initiate_session(&mut self) -> Result<SessionResult> {
        let response = self.request_with_timeout(SBDIX, self.config.session_timeout)?;
        let fields = numbers(SBDIX, &response, "+SBDIX:", 6)?;
        Ok(SessionResult {
            mo_status: narrow(SBDIX, &response, fields[0])?,
            mo_sequence: narrow(SBDIX, &response, fields[1])?,
            mt_status: narrow(SBDIX, &response, fields[2])?,
            mt_sequence: narrow(SBDIX, &response, fields[3])?,
            mt_length: narrow(SBDIX, &response, fields[4])?,
            mt_queued: narrow(SBDIX, &response, fields[5])?,
        })
    }

    fn clear_buffers(&mut self) -> Result<()> {
        let response = self.request(SBDD2)?;
        match result_code(&response) {
            Some(0) | None => Ok(()),
            Some(_) => Err(ModemError::CommandFailed {
                command: SBDD2.to_string(),
            }),
        }
    }

    fn network_available(&mut self) -> Result<bool> {
        match self.network_indicator.as_mut() {
            Some(indicator) => Ok(indicator()),
            None => Ok(self.signal_quality()? > 0),
        }
    }

    fn network_time(&mut self) -> Result<Option<DateTime<Utc>>> {
        let response = self.request(MSSTM)?;
        if response.contains("no network service") {
            return Ok(None);
        }
        let ticks = field(MSSTM, &response, "-MSSTM:")?;
        let ticks = u32::from_str_radix(ticks, 16).map_err(|_| unexpected(MSSTM, &response))?;
        iridium_time(ticks)
            .map(Some)
            .ok_or_else(|| unexpected(MSSTM, &response))
    }

    fn geolocation(&mut self) -> Result<Option<Geolocation>> {
        let response = self.request(MSGEO)?;
        let raw = field(MSGEO, &response, "-MSGEO:")?;
        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(unexpected(MSGEO, &response));
        }

        let mut xyz = [0f64; 3];
        for (slot, part) in xyz.iter_mut().zip(&parts[..3]) {
            *slot = part
                .parse::<f64>()
                .map_err(|_| unexpected(MSGEO, &response))?;
        }
        let ticks = u32::from_str_radix(parts[3], 16).map_err(|_| unexpected(MSGEO, &response))?;
        let fixed_at = iridium_time(ticks).ok_or_else(|| unexpected(MSGEO, &response))?;

        let [x, y, z] = xyz;
        if x == 0.0 && y == 0.0 && z == 0.0 {
            return Ok(None);
        }
        let planar = x.hypot(y);
        Ok(Some(Geolocation {
            latitude: z.atan2(planar).to_degrees(),
            longitude: y.atan2(x).to_degrees(),
            altitude_km: planar.hypot(z),
            fixed_at,
        }))
    }
}

impl<T> std::fmt::Debug for AtModem<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtModem")
            .field("config", &self.config)
            .field("network_indicator", &self.network_indicator.is_some())
            .finish()
    }
}

/// Convert Iridium system time ticks to UTC.
pub fn iridium_time(ticks: u32) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(IRIDIUM_EPOCH * 1000 + i64::from(ticks) * TICK_MILLIS)
}

fn checksum(body: &[u8]) -> u16 {
    body.iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn is_error(buf: &[u8]) -> bool {
    let trimmed = buf.strip_prefix(b"\r\n").unwrap_or(buf);
    trimmed.starts_with(ERROR)
}

/// Locate `length | message | checksum` followed by `OK` in a `+SBDRB` reply.
fn binary_message(buf: &[u8]) -> Option<Range<usize>> {
    let header = buf.get(..2)?;
    let len = usize::from(u16::from_be_bytes([header[0], header[1]]));
    let end = 2 + len + 2;
    if buf.len() < end || find(&buf[end..], OK).is_none() {
        return None;
    }
    Some(0..end)
}

fn valid_location(location: &str) -> bool {
    fn coordinate(part: &str, degree_digits: usize) -> bool {
        let part = part.strip_prefix(['+', '-']).unwrap_or(part);
        match part.split_once('.') {
            Some((whole, minutes)) => {
                whole.len() == degree_digits + 2
                    && !minutes.is_empty()
                    && whole.chars().chain(minutes.chars()).all(|c| c.is_ascii_digit())
            }
            None => false,
        }
    }

    match location.split_once(',') {
        Some((lat, lon)) => coordinate(lat, 2) && coordinate(lon, 3),
        None => false,
    }
}

fn field<'a>(command: &str, response: &'a str, tag: &str) -> Result<&'a str> {
    response
        .lines()
        .find_map(|line| line.trim().strip_prefix(tag))
        .map(str::trim)
        .ok_or_else(|| unexpected(command, response))
}

fn numbers(command: &str, response: &str, tag: &str, count: usize) -> Result<Vec<i64>> {
    let values = field(command, response, tag)?
        .split(',')
        .map(|part| part.trim().parse::<i64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| unexpected(command, response))?;
    if values.len() != count {
        return Err(unexpected(command, response));
    }
    Ok(values)
}

fn narrow<N: TryFrom<i64>>(command: &str, response: &str, value: i64) -> Result<N> {
    N::try_from(value).map_err(|_| unexpected(command, response))
}

fn result_code(response: &str) -> Option<u8> {
    response
        .lines()
        .map(str::trim)
        .find_map(|line| line.parse::<u8>().ok())
}

fn unexpected(command: &str, response: &str) -> ModemError {
    ModemError::UnexpectedResponse {
        command: command.to_string(),
        response: response.trim().to_string(),
    }
}
