use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sbdlink_frame::{decode, encode, split, FrameError, Packet};
use sbdlink_modem::{Geolocation, Modem};
use sbdlink_registry::DescriptorRegistry;
use tracing::{debug, error, info, warn};

use crate::classify::{classify, MoDisposition};
use crate::clock::{Clock, TimeSync};
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};

/// How a contact ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// Nothing left to send and no inbound message waiting.
    Drained,
    /// A session reported no signal; remaining fragments wait for the next contact.
    NoSignal { code: u8 },
    /// The network indicator dropped before the queues drained.
    NetworkUnavailable,
    /// `max_sessions` was reached.
    SessionBudgetExhausted,
}

/// Summary of one [`SessionEngine::contact`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactReport {
    pub outcome: ContactOutcome,
    /// SBD sessions initiated.
    pub sessions: u32,
    /// Fragments loaded into the MO buffer.
    pub sent: usize,
    /// Inbound commands decoded into the received queue.
    pub received: usize,
    /// Inbound messages dropped because they failed to decode.
    pub dropped: usize,
}

impl ContactReport {
    fn new() -> Self {
        Self {
            outcome: ContactOutcome::Drained,
            sessions: 0,
            sent: 0,
            received: 0,
            dropped: 0,
        }
    }
}

/// Owns the transmission and received queues and drives the modem.
///
/// One contact at a time: every method takes `&mut self`.
pub struct SessionEngine<M> {
    modem: M,
    registry: Arc<DescriptorRegistry>,
    config: SessionConfig,
    outbound: VecDeque<Packet>,
    received: VecDeque<Packet>,
}

impl<M: Modem> SessionEngine<M> {
    pub fn new(modem: M, registry: Arc<DescriptorRegistry>, config: SessionConfig) -> Self {
        Self {
            modem,
            registry,
            config,
            outbound: VecDeque::new(),
            received: VecDeque::new(),
        }
    }

    /// Stamp, split and queue a packet for transmission.
    ///
    /// The packet keeps an existing timestamp; otherwise it is stamped with
    /// `now`. Every fragment is encoded once here so that a packet which
    /// cannot go on the wire is rejected before it is queued. Returns the
    /// number of fragments queued.
    pub fn enqueue(&mut self, mut packet: Packet, now: DateTime<Utc>) -> Result<usize> {
        packet.stamp(now);
        if !self.registry.contains(packet.descriptor()) {
            return Err(FrameError::UnregisteredDescriptor(packet.descriptor().to_string()).into());
        }

        let fragments = split(&packet, &self.config.frame)?;
        for fragment in &fragments {
            encode(fragment, &self.registry, &self.config.frame)?;
        }

        let count = fragments.len();
        self.outbound.extend(fragments);
        debug!(
            descriptor = packet.descriptor(),
            fragments = count,
            pending = self.outbound.len(),
            "queued packet"
        );
        Ok(count)
    }

    /// Run one contact: drain inbound, then send and receive while the
    /// network is available, then clear the modem buffers.
    ///
    /// A no-signal status ends the contact normally. Hardware faults and
    /// unclassified statuses abort it; fragments not yet loaded stay queued
    /// and an MT message delivered by the failing session is read before the
    /// buffers are cleared. Transport errors propagate without further modem
    /// traffic.
    pub fn contact(&mut self) -> Result<ContactReport> {
        let mut report = ContactReport::new();

        match self.exchange(&mut report) {
            Ok(outcome) => {
                report.outcome = outcome;
                self.modem.clear_buffers()?;
                info!(
                    outcome = ?report.outcome,
                    sessions = report.sessions,
                    sent = report.sent,
                    received = report.received,
                    dropped = report.dropped,
                    pending = self.outbound.len(),
                    "contact finished"
                );
                Ok(report)
            }
            Err(err @ SessionError::Modem(_)) => Err(err),
            Err(err) => {
                if let Err(clear_err) = self.modem.clear_buffers() {
                    warn!(error = %clear_err, "failed to clear modem buffers after aborted contact");
                }
                Err(err)
            }
        }
    }

    fn exchange(&mut self, report: &mut ContactReport) -> Result<ContactOutcome> {
        let status = self.modem.status()?;
        if status.mt_flag {
            self.receive(report)?;
        }

        loop {
            if !self.modem.network_available()? {
                debug!(pending = self.outbound.len(), "network unavailable");
                return Ok(ContactOutcome::NetworkUnavailable);
            }
            if let Some(limit) = self.config.max_sessions {
                if report.sessions >= limit {
                    warn!(limit, pending = self.outbound.len(), "session budget exhausted");
                    return Ok(ContactOutcome::SessionBudgetExhausted);
                }
            }

            if let Some(head) = self.outbound.front() {
                let body = match encode(head, &self.registry, &self.config.frame) {
                    Ok(body) => body,
                    Err(err) => {
                        self.outbound.pop_front();
                        return Err(err.into());
                    }
                };
                self.modem.load_outbound(&body)?;
                self.outbound.pop_front();
                report.sent += 1;
            }

            let result = self.modem.initiate_session()?;
            report.sessions += 1;
            debug!(
                mo_status = result.mo_status,
                mo_sequence = result.mo_sequence,
                mt_status = result.mt_status,
                mt_length = result.mt_length,
                mt_queued = result.mt_queued,
                "sbd session"
            );

            match classify(result.mo_status) {
                MoDisposition::Continue => {}
                MoDisposition::NoSignal => {
                    warn!(
                        code = result.mo_status,
                        pending = self.outbound.len(),
                        "no signal, ending contact"
                    );
                    return Ok(ContactOutcome::NoSignal {
                        code: result.mo_status,
                    });
                }
                MoDisposition::Fault(fault) => {
                    error!(code = result.mo_status, %fault, "modem hardware fault");
                    if result.mt_received() {
                        self.receive(report)?;
                    }
                    return Err(SessionError::HardwareFault {
                        code: result.mo_status,
                        fault,
                    });
                }
                MoDisposition::Unclassified => {
                    error!(code = result.mo_status, "unclassified mo status");
                    if result.mt_received() {
                        self.receive(report)?;
                    }
                    return Err(SessionError::Transmit {
                        code: result.mo_status,
                    });
                }
            }

            if result.mt_received() {
                self.receive(report)?;
            } else if self.outbound.is_empty() {
                return Ok(ContactOutcome::Drained);
            }
        }
    }

    fn receive(&mut self, report: &mut ContactReport) -> Result<()> {
        let message = self.modem.read_inbound()?;
        match decode(&message, &self.registry) {
            Ok(packet) => {
                debug!(descriptor = packet.descriptor(), args = packet.args().len(), "received command");
                self.received.push_back(packet);
                report.received += 1;
            }
            Err(err) => {
                warn!(error = %err, len = message.len(), "dropping inbound message");
                report.dropped += 1;
            }
        }
        Ok(())
    }

    /// Compare local time with network time and correct the clock when the
    /// drift exceeds `time_sync_threshold`.
    pub fn sync_time(&mut self, clock: &mut impl Clock) -> Result<TimeSync> {
        let Some(network) = self.modem.network_time()? else {
            debug!("network time unavailable");
            return Ok(TimeSync::Unavailable);
        };

        let drift = network - clock.now();
        match drift.abs().to_std() {
            Ok(magnitude) if magnitude <= self.config.time_sync_threshold => {
                debug!(drift_ms = drift.num_milliseconds(), "clock in sync");
                Ok(TimeSync::InSync { drift })
            }
            _ => {
                clock.set(network).map_err(SessionError::Clock)?;
                info!(drift_ms = drift.num_milliseconds(), %network, "corrected system clock");
                Ok(TimeSync::Corrected { drift })
            }
        }
    }

    /// Position at the last constellation contact.
    pub fn geolocation(&mut self) -> Result<Option<Geolocation>> {
        Ok(self.modem.geolocation()?)
    }
}

impl<M> SessionEngine<M> {
    pub fn peek_received(&self) -> Option<&Packet> {
        self.received.front()
    }

    pub fn pop_received(&mut self) -> Option<Packet> {
        self.received.pop_front()
    }

    pub fn received_len(&self) -> usize {
        self.received.len()
    }

    /// Fragments waiting to be sent.
    pub fn pending(&self) -> usize {
        self.outbound.len()
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn modem(&self) -> &M {
        &self.modem
    }

    pub fn modem_mut(&mut self) -> &mut M {
        &mut self.modem
    }

    /// Give back the modem, e.g. to shut it down.
    pub fn into_modem(self) -> M {
        self.modem
    }
}

impl<M> std::fmt::Debug for SessionEngine<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("config", &self.config)
            .field("pending", &self.outbound.len())
            .field("received", &self.received.len())
            .finish()
    }
}
