//! Measurement packet flowing through the relay chain.

use serde::{Deserialize, Serialize};

/// Packet header: producer sequence number, origin send stamp and the
/// frame id assigned by the final hop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacketHeader {
    /// Monotonically increasing per-producer sequence number.
    pub seq: i64,
    /// Origin send timestamp (wall-clock nanoseconds).
    pub stamp: i64,
    /// Destination identifier, filled in by the consumer.
    pub frame_id: String,
}

/// One measurement record.
///
/// Created once by the producer with `t1`/`e1` and a seeded checksum, then
/// mutated in place by each hop. All four timestamp/offset pairs must be
/// populated by the time the packet reaches the consumer, which also clears
/// the payload before the record is logged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    pub header: PacketHeader,

    /// Produced at the origin.
    pub t1: i64,
    /// Received for processing at the relay.
    pub t2: i64,
    /// Finished processing at the relay.
    pub t3: i64,
    /// Received at the consumer.
    pub t4: i64,

    /// Clock-offset estimates (nanoseconds) captured with the matching `t`.
    pub e1: i64,
    pub e2: i64,
    pub e3: i64,
    pub e4: i64,

    /// Position/motion sample captured at the consumer on arrival.
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
    pub velocity: f32,
    pub latitude: f64,
    pub longitude: f64,

    /// Payload exercising throughput; cleared before final storage.
    #[serde(with = "serde_bytes_vec")]
    pub data: Vec<u8>,

    /// Running XOR checksum. Zero after the consumer's second fold means
    /// the payload survived the round trip uncorrupted.
    pub chk: i64,
}

impl Packet {
    /// Whether the consumer-side integrity check passed.
    pub fn is_valid(&self) -> bool {
        self.chk == 0
    }
}

/// Rolling XOR checksum over a byte sequence.
///
/// Create with `checksum(data, 0)`; validate by folding a second time:
/// `checksum(data, chk) == 0` means the data is unchanged.
pub fn checksum(data: &[u8], seed: i64) -> i64 {
    data.iter().fold(seed, |chk, b| chk ^ i64::from(*b))
}

// Payload bytes ride the JSON wire as a plain array, which is what the
// self-describing transport expects; this keeps serde from needing a
// dedicated bytes crate while staying explicit about the representation.
mod serde_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], ser: S) -> Result<S::Ok, S::Error> {
        ser.collect_seq(data)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        Vec::<u8>::deserialize(de)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn checksum_of_empty_data_is_seed() {
        assert_eq!(checksum(&[], 0), 0);
        assert_eq!(checksum(&[], 0x5a), 0x5a);
    }

    #[test]
    fn fresh_packet_reports_valid() {
        // chk == 0 is the "clean" sentinel; a default packet trivially passes.
        assert!(Packet::default().is_valid());
    }

    #[test]
    fn packet_json_round_trip() {
        let packet = Packet {
            header: PacketHeader { seq: 7, stamp: 123, frame_id: "consumer".into() },
            t1: 1,
            t2: 2,
            t3: 3,
            t4: 4,
            e1: -10,
            e2: -11,
            e3: -12,
            e4: -13,
            data: vec![1, 2, 3],
            chk: checksum(&[1, 2, 3], 0),
            ..Packet::default()
        };

        let encoded = serde_json::to_vec(&packet).unwrap();
        let decoded: Packet = serde_json::from_slice(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    proptest! {
        #[test]
        fn checksum_double_fold_is_zero(data in prop::collection::vec(any::<u8>(), 0..512)) {
            let chk = checksum(&data, 0);
            prop_assert_eq!(checksum(&data, chk), 0);
        }

        #[test]
        fn checksum_detects_single_bit_corruption(
            data in prop::collection::vec(any::<u8>(), 1..256),
            index in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let chk = checksum(&data, 0);

            let mut corrupted = data.clone();
            let i = index.index(corrupted.len());
            corrupted[i] ^= 1 << bit;

            prop_assert_ne!(checksum(&corrupted, chk), 0);
        }
    }
}
