use crate::codec::FrameConfig;
use crate::error::{FrameError, Result};
use crate::packet::Packet;

/// Fragment a packet so each piece fits one frame.
///
/// Fragments share the source descriptor and timestamp and carry indexes
/// `0..N` in forward order, where `N = ceil(len / max_values_per_frame)`.
/// An empty payload produces exactly one empty fragment.
pub fn split(packet: &Packet, config: &FrameConfig) -> Result<Vec<Packet>> {
    let per_frame = config.max_values_per_frame();
    let count = fragment_count(packet.payload().len(), per_frame);
    if count > config.max_fragments() {
        return Err(FrameError::TooManyFragments {
            count,
            max: config.max_fragments(),
        });
    }

    Ok(packet
        .payload()
        .segments(per_frame)
        .into_iter()
        .enumerate()
        .map(|(index, segment)| packet.fragment(segment, index as u8))
        .collect())
}

/// Fragments needed for a payload of `len` values, never less than one.
pub fn fragment_count(len: usize, per_frame: usize) -> usize {
    len.div_ceil(per_frame.max(1)).max(1)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    use super::*;
    use crate::packet::Payload;

    fn config() -> FrameConfig {
        FrameConfig::default()
    }

    #[test]
    fn default_frame_holds_98_values() {
        assert_eq!(config().max_values_per_frame(), 98);
    }

    #[test]
    fn small_payload_is_single_fragment() {
        let packet = Packet::numeric("battery", vec![1.0, 2.0]);
        let fragments = split(&packet, &config()).unwrap();
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0], packet);
    }

    #[test]
    fn empty_payload_is_single_empty_fragment() {
        let packet = Packet::numeric("heartbeat", Vec::new());
        let fragments = split(&packet, &config()).unwrap();
        assert_eq!(fragments.len(), 1);
        assert!(fragments[0].payload().is_empty());
        assert_eq!(fragments[0].fragment_index(), 0);
    }

    #[test]
    fn fragments_share_descriptor_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 30, 0).unwrap();
        let packet =
            Packet::numeric("imu", (0..200).map(f64::from).collect()).with_timestamp(at);
        let fragments = split(&packet, &config()).unwrap();

        assert_eq!(fragments.len(), 3);
        for (index, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.descriptor(), "imu");
            assert_eq!(fragment.timestamp(), Some(at));
            assert_eq!(fragment.fragment_index() as usize, index);
        }
        assert_eq!(fragments[2].payload().len(), 4);
    }

    #[test]
    fn text_payload_splits_by_character_count() {
        let packet = Packet::text("log", "x".repeat(99));
        let fragments = split(&packet, &config()).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[1].payload(), &Payload::Text("x".to_string()));
    }

    #[test]
    fn rejects_more_fragments_than_header_can_index() {
        let per_frame = config().max_values_per_frame();
        let fits = Packet::numeric("bulk", vec![0.0; per_frame * 64]);
        assert_eq!(split(&fits, &config()).unwrap().len(), 64);

        let too_big = Packet::numeric("bulk", vec![0.0; per_frame * 64 + 1]);
        assert!(matches!(
            split(&too_big, &config()),
            Err(FrameError::TooManyFragments { count: 65, max: 64 })
        ));
    }

    proptest! {
        #[test]
        fn prop_split_is_complete_and_ordered(len in 0usize..2000) {
            let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
            let packet = Packet::numeric("prop", values.clone());
            let fragments = split(&packet, &config()).unwrap();

            prop_assert_eq!(fragments.len(), fragment_count(len, 98));
            prop_assert_eq!(fragments.len(), if len == 0 { 1 } else { len.div_ceil(98) });

            let mut rebuilt = Vec::new();
            for (index, fragment) in fragments.iter().enumerate() {
                prop_assert_eq!(fragment.fragment_index() as usize, index);
                match fragment.payload() {
                    Payload::Numeric(chunk) => rebuilt.extend_from_slice(chunk),
                    Payload::Text(_) => prop_assert!(false, "payload kind changed"),
                }
            }
            prop_assert_eq!(rebuilt, values);
        }
    }
}
