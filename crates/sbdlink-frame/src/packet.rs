use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

/// Message body: decimal values or ASCII command text, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Values encoded as 3-byte floats.
    Numeric(Vec<f64>),
    /// Characters sent as raw ASCII bytes.
    Text(String),
}

impl Payload {
    /// Number of values (numeric) or characters (text).
    pub fn len(&self) -> usize {
        match self {
            Payload::Numeric(values) => values.len(),
            Payload::Text(text) => text.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Payload::Numeric(_))
    }

    /// Split into consecutive segments of at most `size` elements.
    ///
    /// An empty payload yields one empty segment.
    pub(crate) fn segments(&self, size: usize) -> Vec<Payload> {
        let size = size.max(1);
        match self {
            Payload::Numeric(values) if values.is_empty() => vec![Payload::Numeric(Vec::new())],
            Payload::Text(text) if text.is_empty() => vec![Payload::Text(String::new())],
            Payload::Numeric(values) => values
                .chunks(size)
                .map(|chunk| Payload::Numeric(chunk.to_vec()))
                .collect(),
            Payload::Text(text) => {
                let chars: Vec<char> = text.chars().collect();
                chars
                    .chunks(size)
                    .map(|chunk| Payload::Text(chunk.iter().collect()))
                    .collect()
            }
        }
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Numeric(values) => write!(f, "{values:?}"),
            Payload::Text(text) => write!(f, "{text:?}"),
        }
    }
}

/// One telemetry or command unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    descriptor: String,
    payload: Payload,
    args: Vec<f64>,
    timestamp: Option<DateTime<Utc>>,
    fragment_index: u8,
}

impl Packet {
    /// A numerical telemetry packet.
    pub fn numeric(descriptor: impl Into<String>, values: Vec<f64>) -> Self {
        Self::with_payload(descriptor, Payload::Numeric(values))
    }

    /// A textual packet.
    pub fn text(descriptor: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_payload(descriptor, Payload::Text(text.into()))
    }

    /// A packet with an explicit payload.
    pub fn with_payload(descriptor: impl Into<String>, payload: Payload) -> Self {
        Self {
            descriptor: descriptor.into(),
            payload,
            args: Vec::new(),
            timestamp: None,
            fragment_index: 0,
        }
    }

    /// A decoded command carrying arguments and an empty numeric payload.
    pub fn command(descriptor: impl Into<String>, args: Vec<f64>) -> Self {
        Self {
            args,
            ..Self::numeric(descriptor, Vec::new())
        }
    }

    /// Builder form of [`Packet::stamp`].
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.stamp(at);
        self
    }

    /// Set the timestamp if none is set yet. Returns whether it was set.
    pub fn stamp(&mut self, at: DateTime<Utc>) -> bool {
        if self.timestamp.is_some() {
            return false;
        }
        self.timestamp = Some(at);
        true
    }

    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn args(&self) -> &[f64] {
        &self.args
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn fragment_index(&self) -> u8 {
        self.fragment_index
    }

    pub fn is_numerical(&self) -> bool {
        self.payload.is_numeric()
    }

    /// The day/hour/minute carried on the wire, if stamped.
    pub fn wire_time(&self) -> Option<WireTime> {
        self.timestamp.map(WireTime::from_datetime)
    }

    pub(crate) fn fragment(&self, payload: Payload, fragment_index: u8) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            payload,
            args: self.args.clone(),
            timestamp: self.timestamp,
            fragment_index,
        }
    }

    pub(crate) fn decoded(
        descriptor: String,
        payload: Payload,
        timestamp: DateTime<Utc>,
        fragment_index: u8,
    ) -> Self {
        Self {
            descriptor,
            payload,
            args: Vec::new(),
            timestamp: Some(timestamp),
            fragment_index,
        }
    }
}

impl fmt::Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.descriptor)?;
        if let Some(at) = self.timestamp {
            write!(f, " at {}", at.format("%Y-%m-%d %H:%M:%S UTC"))?;
        }
        write!(
            f,
            ", index: {}, numerical {}: {}",
            self.fragment_index,
            u8::from(self.is_numerical()),
            self.payload
        )?;
        if !self.args.is_empty() {
            write!(f, ", args: {:?}", self.args)?;
        }
        Ok(())
    }
}

/// Day-of-month, hour and minute as packed into the frame header.
///
/// `(day << 11) | (hour << 6) | minute`, big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireTime {
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

impl WireTime {
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self {
            day: at.day() as u8,
            hour: at.hour() as u8,
            minute: at.minute() as u8,
        }
    }

    pub fn pack(self) -> u16 {
        (u16::from(self.day) << 11) | (u16::from(self.hour) << 6) | u16::from(self.minute)
    }

    pub fn unpack(packed: u16) -> Self {
        Self {
            day: (packed >> 11) as u8,
            hour: ((packed >> 6) & 0x1F) as u8,
            minute: (packed & 0x3F) as u8,
        }
    }

    /// The latest instant not after `reference` with this day, hour and minute.
    ///
    /// Walks back month by month (a year at most) to find a month that has
    /// the day. Returns `None` for out-of-range fields.
    pub fn resolve(self, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.day == 0 || self.hour > 23 || self.minute > 59 {
            return None;
        }

        let (mut year, mut month) = (reference.year(), reference.month());
        for _ in 0..=12 {
            let candidate = NaiveDate::from_ymd_opt(year, month, u32::from(self.day))
                .and_then(|date| {
                    date.and_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
                })
                .map(|naive| naive.and_utc());
            if let Some(candidate) = candidate {
                if candidate <= reference {
                    return Some(candidate);
                }
            }
            if month == 1 {
                year -= 1;
                month = 12;
            } else {
                month -= 1;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn stamp_is_set_once() {
        let mut packet = Packet::numeric("battery", vec![1.0]);
        assert!(packet.timestamp().is_none());
        assert!(packet.stamp(at(2024, 3, 9, 12, 30)));
        assert!(!packet.stamp(at(2025, 1, 1, 0, 0)));
        assert_eq!(packet.timestamp(), Some(at(2024, 3, 9, 12, 30)));
    }

    #[test]
    fn command_has_args_and_empty_numeric_payload() {
        let packet = Packet::command("reboot", vec![3.0]);
        assert!(packet.is_numerical());
        assert!(packet.payload().is_empty());
        assert_eq!(packet.args(), &[3.0]);
    }

    #[test]
    fn text_payload_counts_chars() {
        let packet = Packet::text("log", "hello");
        assert!(!packet.is_numerical());
        assert_eq!(packet.payload().len(), 5);
    }

    #[test]
    fn segments_preserve_order() {
        let payload = Payload::Numeric((0..7).map(f64::from).collect());
        let segments = payload.segments(3);
        assert_eq!(
            segments,
            vec![
                Payload::Numeric(vec![0.0, 1.0, 2.0]),
                Payload::Numeric(vec![3.0, 4.0, 5.0]),
                Payload::Numeric(vec![6.0]),
            ]
        );

        let text = Payload::Text("abcdefg".to_string());
        let joined: String = text
            .segments(2)
            .into_iter()
            .map(|segment| match segment {
                Payload::Text(s) => s,
                Payload::Numeric(_) => unreachable!(),
            })
            .collect();
        assert_eq!(joined, "abcdefg");
    }

    #[test]
    fn empty_payload_yields_one_segment() {
        assert_eq!(
            Payload::Numeric(Vec::new()).segments(98),
            vec![Payload::Numeric(Vec::new())]
        );
        assert_eq!(
            Payload::Text(String::new()).segments(98),
            vec![Payload::Text(String::new())]
        );
    }

    #[test]
    fn wire_time_packs_fields() {
        let time = WireTime::from_datetime(at(2024, 3, 31, 23, 59));
        assert_eq!(time.pack(), (31 << 11) | (23 << 6) | 59);
        assert_eq!(WireTime::unpack(time.pack()), time);
    }

    #[test]
    fn resolve_same_month() {
        let time = WireTime {
            day: 9,
            hour: 12,
            minute: 30,
        };
        assert_eq!(
            time.resolve(at(2024, 3, 9, 12, 45)),
            Some(at(2024, 3, 9, 12, 30))
        );
    }

    #[test]
    fn resolve_walks_back_across_short_months() {
        let time = WireTime {
            day: 31,
            hour: 6,
            minute: 0,
        };
        // April has no 31st and March 31st is in the past.
        assert_eq!(
            time.resolve(at(2024, 4, 2, 0, 0)),
            Some(at(2024, 3, 31, 6, 0))
        );
        // Later in the day than the reference: previous month.
        let time = WireTime {
            day: 2,
            hour: 6,
            minute: 0,
        };
        assert_eq!(
            time.resolve(at(2024, 1, 2, 0, 0)),
            Some(at(2023, 12, 2, 6, 0))
        );
    }

    #[test]
    fn resolve_rejects_invalid_fields() {
        let reference = at(2024, 3, 9, 12, 0);
        for time in [
            WireTime {
                day: 0,
                hour: 1,
                minute: 1,
            },
            WireTime {
                day: 1,
                hour: 24,
                minute: 0,
            },
            WireTime {
                day: 1,
                hour: 0,
                minute: 60,
            },
        ] {
            assert_eq!(time.resolve(reference), None);
        }
    }

    #[test]
    fn display_mentions_descriptor_and_index() {
        let packet = Packet::numeric("battery", vec![1.5]).with_timestamp(at(2024, 3, 9, 12, 30));
        let rendered = packet.to_string();
        assert!(rendered.starts_with("battery at 2024-03-09 12:30:00 UTC"));
        assert!(rendered.contains("index: 0"));
    }
}
