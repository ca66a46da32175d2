use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use sbdlink_registry::DescriptorRegistry;
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::float::{decode_floats, encode_floats, ENCODED_VALUE_SIZE};
use crate::packet::{Packet, Payload, WireTime};

/// Frame header: index/flag (1) + date (2) + descriptor (1) = 4 bytes.
pub const HEADER_SIZE: usize = 4;

/// Envelope around a body: length prefix (2) + checksum suffix (2).
pub const ENVELOPE_SIZE: usize = 4;

/// Default maximum frame size, header included.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 300;

/// Fragments addressable by the 6 index bits of the first header byte.
pub const MAX_FRAGMENTS: usize = 64;

const NUMERIC_FLAG: u8 = 0x01;
const INDEX_MASK: u8 = 0x7F;

/// Configuration for the frame codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Maximum encoded frame size in bytes, header included. Default: 300.
    pub max_frame_size: usize,
    /// Maximum fragments per logical message. Clamped to [`MAX_FRAGMENTS`].
    pub max_fragments: usize,
}

impl FrameConfig {
    /// Numeric values (or characters) that fit one frame after the header.
    pub fn max_values_per_frame(&self) -> usize {
        self.max_frame_size.saturating_sub(HEADER_SIZE) / ENCODED_VALUE_SIZE
    }

    /// Effective fragment limit.
    pub fn max_fragments(&self) -> usize {
        self.max_fragments.min(MAX_FRAGMENTS)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_fragments: MAX_FRAGMENTS,
        }
    }
}

/// Encode a packet into a frame body.
///
/// Wire format:
/// ```text
/// ┌───────────────────┬──────────────┬────────────┬──────────────────────┐
/// │ index<<1 | numeric│ date (2B BE) │ descriptor │ payload               │
/// │ (1B)              │ d<<11|h<<6|m │ code (1B)  │ 3B floats or ASCII    │
/// └───────────────────┴──────────────┴────────────┴──────────────────────┘
/// ```
///
/// The length/checksum envelope is not part of the body; see [`wrap`].
pub fn encode(packet: &Packet, registry: &DescriptorRegistry, config: &FrameConfig) -> Result<Bytes> {
    let mut dst = BytesMut::new();
    encode_into(packet, registry, config, &mut dst)?;
    Ok(dst.freeze())
}

/// Encode a packet into a frame body, appending to `dst`.
pub fn encode_into(
    packet: &Packet,
    registry: &DescriptorRegistry,
    config: &FrameConfig,
    dst: &mut BytesMut,
) -> Result<()> {
    let timestamp = packet.timestamp().ok_or(FrameError::MissingTimestamp)?;
    let code = registry
        .code(packet.descriptor())
        .ok_or_else(|| FrameError::UnregisteredDescriptor(packet.descriptor().to_string()))?;

    let index = usize::from(packet.fragment_index());
    let max_index = config.max_fragments().saturating_sub(1);
    if index > max_index {
        return Err(FrameError::FragmentIndexOutOfRange {
            index,
            max: max_index,
        });
    }

    let mut body = Vec::new();
    let flag = match packet.payload() {
        Payload::Numeric(values) => {
            encode_floats(values, &mut body)?;
            NUMERIC_FLAG
        }
        Payload::Text(text) => {
            if !text.is_ascii() {
                return Err(FrameError::NonAsciiText);
            }
            body.extend_from_slice(text.as_bytes());
            0
        }
    };

    let size = HEADER_SIZE + body.len();
    if size > config.max_frame_size {
        return Err(FrameError::PayloadTooLarge {
            size,
            max: config.max_frame_size,
        });
    }

    dst.reserve(size);
    dst.put_u8(((packet.fragment_index() << 1) & INDEX_MASK) | flag);
    dst.put_u16(WireTime::from_datetime(timestamp).pack());
    dst.put_u8(code);
    dst.put_slice(&body);
    Ok(())
}

/// Bytewise sum of `body` modulo 65536.
pub fn checksum(body: &[u8]) -> u16 {
    body.iter()
        .fold(0u16, |sum, byte| sum.wrapping_add(u16::from(*byte)))
}

/// Wrap a body in the modem envelope: length (2B BE) | body | checksum (2B BE).
pub fn wrap(body: &[u8]) -> Result<Bytes> {
    let len = u16::try_from(body.len()).map_err(|_| FrameError::PayloadTooLarge {
        size: body.len(),
        max: u16::MAX as usize,
    })?;
    let mut dst = BytesMut::with_capacity(ENVELOPE_SIZE + body.len());
    dst.put_u16(len);
    dst.put_slice(body);
    dst.put_u16(checksum(body));
    Ok(dst.freeze())
}

/// Validate the envelope and return the body.
pub fn unwrap(message: &[u8]) -> Result<&[u8]> {
    if message.len() < ENVELOPE_SIZE {
        return Err(FrameError::Truncated {
            len: message.len(),
            min: ENVELOPE_SIZE,
        });
    }

    let declared = usize::from(u16::from_be_bytes([message[0], message[1]]));
    let expected = u16::from_be_bytes([message[message.len() - 2], message[message.len() - 1]]);
    let body = &message[2..message.len() - 2];

    let actual = checksum(body);
    if expected != actual {
        return Err(FrameError::ChecksumMismatch { expected, actual });
    }
    if declared != body.len() {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: body.len(),
        });
    }
    Ok(body)
}

/// Decode an inbound command message (envelope included).
///
/// The body is a descriptor code followed by 3-byte float arguments.
/// Bytes that do not fill a final 3-byte group are ignored.
pub fn decode(message: &[u8], registry: &DescriptorRegistry) -> Result<Packet> {
    let body = unwrap(message)?;
    let (&code, rest) = body.split_first().ok_or(FrameError::Truncated {
        len: message.len(),
        min: ENVELOPE_SIZE + 1,
    })?;
    let descriptor = registry
        .descriptor(code)
        .ok_or(FrameError::UnknownDescriptor(code))?;

    let leftover = rest.len() % ENCODED_VALUE_SIZE;
    if leftover != 0 {
        trace!(descriptor, leftover, "ignoring trailing command bytes");
    }
    Ok(Packet::command(descriptor, decode_floats(rest)))
}

/// Build an uplink command body (no envelope): descriptor code then arguments.
pub fn encode_command(
    descriptor: &str,
    args: &[f64],
    registry: &DescriptorRegistry,
) -> Result<Bytes> {
    let code = registry
        .code(descriptor)
        .ok_or_else(|| FrameError::UnregisteredDescriptor(descriptor.to_string()))?;

    let mut body = Vec::with_capacity(1 + args.len() * ENCODED_VALUE_SIZE);
    body.push(code);
    encode_floats(args, &mut body)?;
    Ok(Bytes::from(body))
}

/// Decode a downlink telemetry frame (envelope included).
///
/// The header's day/hour/minute is resolved to the latest instant not after
/// `reference`.
pub fn decode_telemetry(
    message: &[u8],
    registry: &DescriptorRegistry,
    reference: DateTime<Utc>,
) -> Result<Packet> {
    let body = unwrap(message)?;
    if body.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            len: message.len(),
            min: ENVELOPE_SIZE + HEADER_SIZE,
        });
    }

    let numeric = body[0] & NUMERIC_FLAG != 0;
    let fragment_index = (body[0] & INDEX_MASK) >> 1;
    let wire_time = WireTime::unpack(u16::from_be_bytes([body[1], body[2]]));
    let code = body[3];
    let descriptor = registry
        .descriptor(code)
        .ok_or(FrameError::UnknownDescriptor(code))?;
    let timestamp = wire_time
        .resolve(reference)
        .ok_or(FrameError::InvalidTimestamp {
            day: wire_time.day,
            hour: wire_time.hour,
            minute: wire_time.minute,
        })?;

    let data = &body[HEADER_SIZE..];
    let payload = if numeric {
        Payload::Numeric(decode_floats(data))
    } else {
        if !data.is_ascii() {
            return Err(FrameError::NonAsciiText);
        }
        Payload::Text(data.iter().map(|byte| char::from(*byte)).collect())
    };

    Ok(Packet::decoded(
        descriptor.to_string(),
        payload,
        timestamp,
        fragment_index,
    ))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::split::split;

    fn registry() -> DescriptorRegistry {
        DescriptorRegistry::from_descriptors(&["battery", "log", "reboot", "set_mode"]).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap()
    }

    #[test]
    fn encode_header_layout() {
        let packet = Packet::numeric("battery", vec![123.45]).with_timestamp(at(9, 12, 30));
        let body = encode(&packet, &registry(), &FrameConfig::default()).unwrap();

        let date = (9u16 << 11) | (12 << 6) | 30;
        assert_eq!(
            &body[..],
            &[
                0x01,
                (date >> 8) as u8,
                date as u8,
                1,
                0x10,
                0x30,
                0x39
            ]
        );
    }

    #[test]
    fn encode_packs_index_and_text_flag() {
        let packet = Packet::text("log", "ok").with_timestamp(at(1, 0, 0));
        let fragment = split(&packet, &FrameConfig::default()).unwrap().remove(0);
        let body = encode(&fragment, &registry(), &FrameConfig::default()).unwrap();
        assert_eq!(body[0], 0x00);
        assert_eq!(&body[HEADER_SIZE..], b"ok");

        let long = Packet::numeric("battery", vec![1.0; 98 * 6]).with_timestamp(at(1, 0, 0));
        let fragments = split(&long, &FrameConfig::default()).unwrap();
        let body = encode(&fragments[5], &registry(), &FrameConfig::default()).unwrap();
        assert_eq!(body[0], (5 << 1) | 0x01);
        assert_eq!(body.len(), DEFAULT_MAX_FRAME_SIZE - 2);
    }

    #[test]
    fn encode_requires_timestamp() {
        let packet = Packet::numeric("battery", vec![1.0]);
        assert!(matches!(
            encode(&packet, &registry(), &FrameConfig::default()),
            Err(FrameError::MissingTimestamp)
        ));
    }

    #[test]
    fn encode_rejects_unregistered_descriptor() {
        let packet = Packet::numeric("nope", vec![1.0]).with_timestamp(at(1, 0, 0));
        assert!(matches!(
            encode(&packet, &registry(), &FrameConfig::default()),
            Err(FrameError::UnregisteredDescriptor(name)) if name == "nope"
        ));
    }

    #[test]
    fn encode_rejects_non_ascii_text() {
        let packet = Packet::text("log", "héllo").with_timestamp(at(1, 0, 0));
        assert!(matches!(
            encode(&packet, &registry(), &FrameConfig::default()),
            Err(FrameError::NonAsciiText)
        ));
    }

    #[test]
    fn encode_rejects_oversized_frame() {
        let packet = Packet::numeric("battery", vec![1.0; 99]).with_timestamp(at(1, 0, 0));
        assert!(matches!(
            encode(&packet, &registry(), &FrameConfig::default()),
            Err(FrameError::PayloadTooLarge { size: 301, max: 300 })
        ));
    }

    #[test]
    fn encode_rejects_index_beyond_configured_fragments() {
        let cfg = FrameConfig {
            max_fragments: 2,
            ..FrameConfig::default()
        };
        let packet = Packet::numeric("battery", vec![1.0; 98 * 3]).with_timestamp(at(1, 0, 0));
        let fragments = split(&packet, &FrameConfig::default()).unwrap();
        assert!(matches!(
            encode(&fragments[2], &registry(), &cfg),
            Err(FrameError::FragmentIndexOutOfRange { index: 2, max: 1 })
        ));
    }

    #[test]
    fn checksum_wraps_at_16_bits() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[1, 2, 3]), 6);
        // 255 * 300 = 76500, wrapped past 65535
        assert_eq!(checksum(&[0xFF; 300]), 10964);
    }

    #[test]
    fn wrap_layout() {
        let wrapped = wrap(&[1, 2, 3]).unwrap();
        assert_eq!(&wrapped[..], &[0, 3, 1, 2, 3, 0, 6]);
        assert_eq!(unwrap(&wrapped).unwrap(), &[1, 2, 3]);
    }

    #[test]
    fn decode_command_with_args() {
        let body = encode_command("set_mode", &[2.0, -0.5], &registry()).unwrap();
        let packet = decode(&wrap(&body).unwrap(), &registry()).unwrap();
        assert_eq!(packet.descriptor(), "set_mode");
        assert_eq!(packet.args(), &[2.0, -0.5]);
        assert!(packet.timestamp().is_none());
    }

    #[test]
    fn decode_command_ignores_partial_trailing_group() {
        let mut body = encode_command("reboot", &[7.0], &registry()).unwrap().to_vec();
        body.extend_from_slice(&[0xAA, 0xBB]);
        let packet = decode(&wrap(&body).unwrap(), &registry()).unwrap();
        assert_eq!(packet.args(), &[7.0]);
    }

    #[test]
    fn decode_command_without_args() {
        let body = encode_command("reboot", &[], &registry()).unwrap();
        let packet = decode(&wrap(&body).unwrap(), &registry()).unwrap();
        assert_eq!(packet.descriptor(), "reboot");
        assert!(packet.args().is_empty());
    }

    #[test]
    fn decode_rejects_unknown_descriptor_code() {
        let message = wrap(&[42, 0, 0, 0]).unwrap();
        assert!(matches!(
            decode(&message, &registry()),
            Err(FrameError::UnknownDescriptor(42))
        ));
    }

    #[test]
    fn decode_rejects_empty_body_and_short_message() {
        let message = wrap(&[]).unwrap();
        assert!(matches!(
            decode(&message, &registry()),
            Err(FrameError::Truncated { .. })
        ));
        assert!(matches!(
            decode(&[0, 0, 0], &registry()),
            Err(FrameError::Truncated { len: 3, min: 4 })
        ));
    }

    #[test]
    fn decode_rejects_length_mismatch() {
        let mut message = wrap(&[1, 0, 0, 0]).unwrap().to_vec();
        message[1] = 9;
        assert!(matches!(
            decode(&message, &registry()),
            Err(FrameError::LengthMismatch { declared: 9, actual: 4 })
        ));
    }

    #[test]
    fn every_single_byte_corruption_is_a_framing_error() {
        let packet =
            Packet::numeric("battery", vec![3.3, -12.5, 0.001]).with_timestamp(at(9, 12, 30));
        let body = encode(&packet, &registry(), &FrameConfig::default()).unwrap();
        let message = wrap(&body).unwrap();

        for position in 0..message.len() {
            for flip in [0x01u8, 0x80, 0xFF] {
                let mut corrupted = message.to_vec();
                corrupted[position] ^= flip;
                let err = decode_telemetry(&corrupted, &registry(), reference()).unwrap_err();
                assert!(err.is_framing(), "byte {position} ^ {flip:#x}: {err}");
            }
        }
    }

    #[test]
    fn telemetry_roundtrip() {
        let values = vec![3.3, -12.5, 0.001, 0.0, 98765.0];
        let packet = Packet::numeric("battery", values.clone()).with_timestamp(at(9, 12, 30));
        let body = encode(&packet, &registry(), &FrameConfig::default()).unwrap();
        let decoded = decode_telemetry(&wrap(&body).unwrap(), &registry(), reference()).unwrap();

        assert_eq!(decoded.descriptor(), "battery");
        assert_eq!(decoded.fragment_index(), 0);
        assert_eq!(decoded.timestamp(), Some(at(9, 12, 30)));
        assert_eq!(decoded.payload(), &Payload::Numeric(values));
    }

    #[test]
    fn telemetry_roundtrip_every_fragment() {
        let values: Vec<f64> = (0..250).map(|i| f64::from(i) * 0.25).collect();
        let packet = Packet::numeric("battery", values.clone()).with_timestamp(at(9, 12, 30));
        let mut rebuilt = Vec::new();

        for (index, fragment) in split(&packet, &FrameConfig::default())
            .unwrap()
            .iter()
            .enumerate()
        {
            let body = encode(fragment, &registry(), &FrameConfig::default()).unwrap();
            let decoded =
                decode_telemetry(&wrap(&body).unwrap(), &registry(), reference()).unwrap();
            assert_eq!(decoded.fragment_index() as usize, index);
            match decoded.payload() {
                Payload::Numeric(chunk) => rebuilt.extend_from_slice(chunk),
                Payload::Text(_) => panic!("expected numeric payload"),
            }
        }
        assert_eq!(rebuilt, values);
    }

    #[test]
    fn telemetry_text_roundtrip() {
        let packet = Packet::text("log", "boot ok").with_timestamp(at(9, 12, 30));
        let body = encode(&packet, &registry(), &FrameConfig::default()).unwrap();
        let decoded = decode_telemetry(&wrap(&body).unwrap(), &registry(), reference()).unwrap();
        assert_eq!(decoded.payload(), &Payload::Text("boot ok".to_string()));
        assert!(!decoded.is_numerical());
    }

    #[test]
    fn telemetry_rejects_short_body_and_bad_date() {
        let message = wrap(&[0x01, 0x00]).unwrap();
        assert!(matches!(
            decode_telemetry(&message, &registry(), reference()),
            Err(FrameError::Truncated { .. })
        ));

        // day 0 is never valid
        let message = wrap(&[0x01, 0x00, 0x00, 1]).unwrap();
        assert!(matches!(
            decode_telemetry(&message, &registry(), reference()),
            Err(FrameError::InvalidTimestamp { day: 0, .. })
        ));
    }
}
