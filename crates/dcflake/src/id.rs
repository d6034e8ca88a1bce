use core::{fmt, str::FromStr};

use crate::{Error, time::EPOCH_MILLIS};

/// Width of the timestamp delta field.
pub const TIMESTAMP_BITS: u32 = 42;

/// Width of the data-center id field.
pub const DATA_CENTER_ID_BITS: u32 = 1;

/// Width of the machine id field.
pub const MACHINE_ID_BITS: u32 = 1;

/// Width of the per-millisecond sequence field.
pub const SEQUENCE_BITS: u32 = 20;

/// A 64-bit Snowflake ID with a split data-center/machine node identity.
///
/// - 42 bits timestamp (ms since [`EPOCH_MILLIS`])
/// - 1 bit data-center ID
/// - 1 bit machine ID
/// - 20 bits sequence
///
/// ```text
///  Bit Index:  63             22    21      20    19             0
///              +----------------+--------+---------+---------------+
///  Field:      | timestamp (42) | dc (1) | mid (1) | sequence (20) |
///              +----------------+--------+---------+---------------+
///              |<----- MSB ---------- 64 bits ----------- LSB ---->|
/// ```
///
/// The layout is fixed: IDs issued by earlier deployments stay decodable.
///
/// # Example
///
/// ```
/// use dcflake::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 1, 0, 7);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.data_center_id(), 1);
/// assert_eq!(id.machine_id(), 0);
/// assert_eq!(id.sequence(), 7);
/// ```
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SnowflakeId {
    id: u64,
}

/// The four fields of a [`SnowflakeId`], unpacked.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct IdParts {
    /// Milliseconds since [`EPOCH_MILLIS`].
    pub timestamp: u64,
    /// Data-center bit, `0..=1`.
    pub data_center_id: u64,
    /// Machine bit, `0..=1`.
    pub machine_id: u64,
    /// Position within the millisecond, `0..2^20`.
    pub sequence: u64,
}

impl SnowflakeId {
    /// Bitmask for extracting the 42-bit timestamp field. Occupies bits 22
    /// through 63.
    pub const TIMESTAMP_MASK: u64 = (1 << TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 1-bit data-center ID field. Occupies bit 21.
    pub const DATA_CENTER_ID_MASK: u64 = (1 << DATA_CENTER_ID_BITS) - 1;

    /// Bitmask for extracting the 1-bit machine ID field. Occupies bit 20.
    pub const MACHINE_ID_MASK: u64 = (1 << MACHINE_ID_BITS) - 1;

    /// Bitmask for extracting the 20-bit sequence field. Occupies bits 0
    /// through 19.
    pub const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

    /// Number of bits to shift the timestamp to its correct position (bit 22).
    pub const TIMESTAMP_SHIFT: u32 = Self::DATA_CENTER_ID_SHIFT + DATA_CENTER_ID_BITS;

    /// Number of bits to shift the data-center ID to its correct position (bit
    /// 21).
    pub const DATA_CENTER_ID_SHIFT: u32 = Self::MACHINE_ID_SHIFT + MACHINE_ID_BITS;

    /// Number of bits to shift the machine ID to its correct position (bit 20).
    pub const MACHINE_ID_SHIFT: u32 = SEQUENCE_BITS;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u32 = 0;

    /// Packs the four fields into an ID.
    ///
    /// Values wider than their field are truncated to the field width; the
    /// generators validate their inputs before packing.
    pub const fn from_components(
        timestamp: u64,
        data_center_id: u64,
        machine_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let data_center_id =
            (data_center_id & Self::DATA_CENTER_ID_MASK) << Self::DATA_CENTER_ID_SHIFT;
        let machine_id = (machine_id & Self::MACHINE_ID_MASK) << Self::MACHINE_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | data_center_id | machine_id | sequence,
        }
    }

    /// Packs an [`IdParts`] into an ID.
    pub const fn encode(parts: IdParts) -> Self {
        Self::from_components(
            parts.timestamp,
            parts.data_center_id,
            parts.machine_id,
            parts.sequence,
        )
    }

    /// Unpacks every field of this ID.
    pub const fn decode(&self) -> IdParts {
        IdParts {
            timestamp: self.timestamp(),
            data_center_id: self.data_center_id(),
            machine_id: self.machine_id(),
            sequence: self.sequence(),
        }
    }

    /// Extracts the timestamp delta (ms since the epoch) from the packed ID.
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the data-center ID from the packed ID.
    pub const fn data_center_id(&self) -> u64 {
        (self.id >> Self::DATA_CENTER_ID_SHIFT) & Self::DATA_CENTER_ID_MASK
    }

    /// Extracts the machine ID from the packed ID.
    pub const fn machine_id(&self) -> u64 {
        (self.id >> Self::MACHINE_ID_SHIFT) & Self::MACHINE_ID_MASK
    }

    /// Extracts the sequence number from the packed ID.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Returns the wall-clock time this ID was issued at, in milliseconds
    /// since the Unix epoch.
    pub const fn unix_millis(&self) -> u64 {
        self.timestamp() + EPOCH_MILLIS
    }

    /// Returns the packed 64-bit value.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// Wraps a packed 64-bit value. Every `u64` is a valid ID.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns the ID as a zero-padded 20-digit string.
    ///
    /// Padded strings sort in the same order as the integers they encode.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }

    pub(crate) const fn has_sequence_room(&self) -> bool {
        self.sequence() < Self::SEQUENCE_MASK
    }

    pub(crate) const fn increment_sequence(&self) -> Self {
        Self::from_raw(self.id + 1)
    }

    pub(crate) const fn rollover_to_timestamp(&self, timestamp: u64) -> Self {
        Self::from_components(timestamp, self.data_center_id(), self.machine_id(), 0)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<u64> for SnowflakeId {
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<IdParts> for SnowflakeId {
    fn from(parts: IdParts) -> Self {
        Self::encode(parts)
    }
}

impl FromStr for SnowflakeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>()
            .map(Self::from_raw)
            .map_err(|_| Error::ParseId)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &format_args!("0x{:016x} ({})", self.id, self.id))
            .field("timestamp", &self.timestamp())
            .field("data_center_id", &self.data_center_id())
            .field("machine_id", &self.machine_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_constants_cover_all_bits() {
        assert_eq!(
            TIMESTAMP_BITS + DATA_CENTER_ID_BITS + MACHINE_ID_BITS + SEQUENCE_BITS,
            64
        );
        assert_eq!(SnowflakeId::TIMESTAMP_SHIFT, 22);
        assert_eq!(SnowflakeId::DATA_CENTER_ID_SHIFT, 21);
        assert_eq!(SnowflakeId::MACHINE_ID_SHIFT, 20);
        assert_eq!(SnowflakeId::SEQUENCE_MASK, 1_048_575);
    }

    #[test]
    fn packs_fields_in_order() {
        let id = SnowflakeId::from_components(1, 1, 1, 1);
        assert_eq!(id.to_raw(), (1 << 22) | (1 << 21) | (1 << 20) | 1);

        let id = SnowflakeId::from_components(5000, 1, 0, 0);
        assert_eq!(id.to_raw(), 5000 << 22 | 1 << 21);
    }

    #[test]
    fn decode_recovers_boundary_values() {
        let cases = [
            IdParts::default(),
            IdParts {
                timestamp: SnowflakeId::TIMESTAMP_MASK,
                data_center_id: 1,
                machine_id: 1,
                sequence: SnowflakeId::SEQUENCE_MASK,
            },
            IdParts {
                timestamp: 1,
                data_center_id: 0,
                machine_id: 1,
                sequence: 0,
            },
            IdParts {
                timestamp: 0,
                data_center_id: 1,
                machine_id: 0,
                sequence: 1,
            },
            IdParts {
                timestamp: 1 << 41,
                data_center_id: 0,
                machine_id: 0,
                sequence: 1 << 19,
            },
        ];

        for parts in cases {
            assert_eq!(SnowflakeId::encode(parts).decode(), parts);
        }
    }

    #[test]
    fn decode_encode_is_identity_on_raw_values() {
        for raw in [0, 1, u64::MAX, 0x8000_0000_0000_0000, 0x0123_4567_89ab_cdef] {
            let id = SnowflakeId::from_raw(raw);
            assert_eq!(SnowflakeId::encode(id.decode()).to_raw(), raw);
        }
    }

    #[test]
    fn fields_do_not_bleed_into_neighbours() {
        let id = SnowflakeId::from_components(0, 0, 0, SnowflakeId::SEQUENCE_MASK + 1);
        assert_eq!(id.machine_id(), 0);
        assert_eq!(id.sequence(), 0);

        let id = SnowflakeId::from_components(0, 2, 3, 0);
        assert_eq!(id.timestamp(), 0);
        assert_eq!(id.data_center_id(), 0);
        assert_eq!(id.machine_id(), 1);
    }

    #[test]
    fn sequence_helpers() {
        let id = SnowflakeId::from_components(10, 1, 1, 41);
        assert!(id.has_sequence_room());
        assert_eq!(id.increment_sequence().sequence(), 42);
        assert_eq!(id.increment_sequence().timestamp(), 10);

        let full = SnowflakeId::from_components(10, 1, 1, SnowflakeId::SEQUENCE_MASK);
        assert!(!full.has_sequence_room());

        let next = full.rollover_to_timestamp(11);
        assert_eq!(next.decode(), IdParts {
            timestamp: 11,
            data_center_id: 1,
            machine_id: 1,
            sequence: 0,
        });
    }

    #[test]
    fn ordering_follows_time_then_sequence() {
        let a = SnowflakeId::from_components(10, 1, 1, 500);
        let b = SnowflakeId::from_components(11, 0, 0, 0);
        let c = SnowflakeId::from_components(11, 0, 0, 1);
        assert!(a < b && b < c);
    }

    #[test]
    fn string_forms() {
        let id = SnowflakeId::from_components(5000, 1, 0, 1);
        let raw = id.to_raw();
        assert_eq!(id.to_string(), raw.to_string());
        assert_eq!(id.to_padded_string().len(), 20);
        assert_eq!(id.to_padded_string().parse::<u64>().unwrap(), raw);
        assert_eq!(id.to_string().parse::<SnowflakeId>().unwrap(), id);
        assert_eq!("nope".parse::<SnowflakeId>(), Err(Error::ParseId));
        assert_eq!("-1".parse::<SnowflakeId>(), Err(Error::ParseId));
    }

    #[test]
    fn unix_millis_adds_epoch() {
        let id = SnowflakeId::from_components(5000, 0, 0, 0);
        assert_eq!(id.unix_millis(), EPOCH_MILLIS + 5000);
    }

    #[test]
    fn debug_shows_fields() {
        let id = SnowflakeId::from_components(5000, 1, 0, 3);
        let dbg = format!("{id:?}");
        assert!(dbg.contains("timestamp: 5000"));
        assert!(dbg.contains("data_center_id: 1"));
        assert!(dbg.contains("sequence: 3"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_raw_integer() {
        let id = SnowflakeId::from_components(5000, 1, 0, 3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.to_raw().to_string());
        let back: SnowflakeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
