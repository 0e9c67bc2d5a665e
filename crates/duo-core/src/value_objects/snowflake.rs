//! Time-ordered 64-bit identifiers.
//!
//! Layout, high to low: 42 timestamp bits (milliseconds since the service
//! epoch), 10 worker bits, 12 sequence bits. Because the timestamp occupies
//! the high bits, ids sort by creation time and double as pagination
//! cursors.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Bits reserved for the per-millisecond sequence counter.
const SEQUENCE_BITS: u32 = 12;
/// Bits reserved for the worker id.
const WORKER_BITS: u32 = 10;

const WORKER_SHIFT: u32 = SEQUENCE_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS;

const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const MAX_WORKER_ID: u16 = 1 << WORKER_BITS;

/// A time-ordered 64-bit id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Snowflake(i64);

impl Snowflake {
    /// Service epoch: 2024-01-01T00:00:00Z in Unix milliseconds.
    pub const EPOCH: i64 = 1_704_067_200_000;

    #[inline]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn into_inner(self) -> i64 {
        self.0
    }

    /// Milliseconds since the Unix epoch at which this id was minted.
    #[inline]
    pub fn timestamp(&self) -> i64 {
        (self.0 >> TIMESTAMP_SHIFT) + Self::EPOCH
    }

    /// Worker id embedded in this id.
    #[inline]
    pub fn worker_id(&self) -> u16 {
        ((self.0 >> WORKER_SHIFT) & i64::from(MAX_WORKER_ID - 1)) as u16
    }

    pub fn parse(s: &str) -> Result<Self, SnowflakeParseError> {
        s.parse()
    }
}

/// Error returned when a string is not a valid id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SnowflakeParseError {
    #[error("invalid snowflake format")]
    InvalidFormat,
}

impl fmt::Display for Snowflake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<i64> for Snowflake {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for i64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl FromStr for Snowflake {
    type Err = SnowflakeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>()
            .map(Snowflake)
            .map_err(|_| SnowflakeParseError::InvalidFormat)
    }
}

// JSON carries ids as strings so JavaScript clients never lose precision.
impl Serialize for Snowflake {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

// Accept either the string form or a bare integer on the way in.
impl<'de> Deserialize<'de> for Snowflake {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{Error as DeError, Visitor};

        struct IdVisitor;

        impl<'de> Visitor<'de> for IdVisitor {
            type Value = Snowflake;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a snowflake id as a string or integer")
            }

            fn visit_i64<E: DeError>(self, v: i64) -> Result<Snowflake, E> {
                Ok(Snowflake(v))
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Snowflake, E> {
                Ok(Snowflake(v as i64))
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Snowflake, E> {
                v.parse()
                    .map_err(|_| E::custom("invalid snowflake string"))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Lock-free id generator.
///
/// Hands out at most 4096 ids per millisecond per worker; when the sequence
/// wraps inside a millisecond the caller spins until the clock advances.
pub struct SnowflakeGenerator {
    worker_id: u16,
    sequence: AtomicI64,
    last_timestamp: AtomicI64,
}

impl SnowflakeGenerator {
    /// Create a generator for the given worker.
    ///
    /// # Panics
    /// Panics if `worker_id` does not fit in the worker bits.
    pub fn new(worker_id: u16) -> Self {
        assert!(worker_id < MAX_WORKER_ID, "Worker ID must be < 1024");
        Self {
            worker_id,
            sequence: AtomicI64::new(0),
            last_timestamp: AtomicI64::new(0),
        }
    }

    pub fn worker_id(&self) -> u16 {
        self.worker_id
    }

    /// Mint the next id.
    pub fn generate(&self) -> Snowflake {
        loop {
            let last = self.last_timestamp.load(Ordering::Acquire);
            let mut now = now_millis();

            if now < last {
                // Clock went backwards; wait until it catches up rather
                // than risk handing out an out-of-order id.
                std::thread::sleep(std::time::Duration::from_millis((last - now) as u64));
                now = now_millis();
            }

            let seq = if now == last {
                match self.next_sequence() {
                    Some(seq) => seq,
                    None => {
                        // Sequence exhausted for this millisecond.
                        now = self.wait_for_next_millis(last);
                        self.sequence.store(1, Ordering::Relaxed);
                        0
                    }
                }
            } else {
                self.sequence.store(1, Ordering::Relaxed);
                0
            };

            let claimed = self
                .last_timestamp
                .compare_exchange(last, now, Ordering::Release, Ordering::Relaxed)
                .is_ok();
            if claimed {
                return self.compose(now, seq);
            }
            // Lost the race for the timestamp slot; try again.
        }
    }

    fn compose(&self, timestamp: i64, sequence: i64) -> Snowflake {
        let id = ((timestamp - Snowflake::EPOCH) << TIMESTAMP_SHIFT)
            | (i64::from(self.worker_id) << WORKER_SHIFT)
            | sequence;
        Snowflake::new(id)
    }

    /// Claim the next sequence slot within the current millisecond, or
    /// `None` if the counter wrapped.
    fn next_sequence(&self) -> Option<i64> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed) & SEQUENCE_MASK;
        (seq != 0).then_some(seq)
    }

    fn wait_for_next_millis(&self, last: i64) -> i64 {
        loop {
            let now = now_millis();
            if now > last {
                return now;
            }
            std::hint::spin_loop();
        }
    }
}

impl Default for SnowflakeGenerator {
    fn default() -> Self {
        Self::new(0)
    }
}

#[inline]
fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn round_trips_through_display_and_parse() {
        let id = Snowflake::new(987_654_321);
        let parsed = Snowflake::parse(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn rejects_non_numeric_strings() {
        assert!(Snowflake::parse("not-a-number").is_err());
        assert!("".parse::<Snowflake>().is_err());
    }

    #[test]
    fn serializes_as_json_string() {
        let id = Snowflake::new(123_456_789_012_345_678);
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"123456789012345678\""
        );
    }

    #[test]
    fn deserializes_from_string_or_integer() {
        let from_str: Snowflake = serde_json::from_str("\"42\"").unwrap();
        let from_int: Snowflake = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_int);
        assert_eq!(from_str.into_inner(), 42);
    }

    #[test]
    fn orders_by_inner_value() {
        assert!(Snowflake::new(100) < Snowflake::new(200));
    }

    #[test]
    fn generated_ids_embed_the_worker() {
        let gen = SnowflakeGenerator::new(7);
        let id = gen.generate();
        assert_eq!(id.worker_id(), 7);
        assert!(id.timestamp() >= Snowflake::EPOCH);
    }

    #[test]
    fn generated_ids_are_unique_and_increasing() {
        let gen = SnowflakeGenerator::new(1);
        let mut seen = HashSet::new();
        let mut prev = Snowflake::new(0);

        for _ in 0..2000 {
            let id = gen.generate();
            assert!(id > prev);
            assert!(seen.insert(id));
            prev = id;
        }
    }

    #[test]
    #[should_panic(expected = "Worker ID must be < 1024")]
    fn rejects_oversized_worker_id() {
        SnowflakeGenerator::new(1024);
    }
}
