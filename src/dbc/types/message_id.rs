use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Bus/channel identifier a frame was received on.
pub type SourceId = u8;

/// Reserved source that stands for "all buses". A DBC file mapped to it is
/// used for every source without a dedicated file.
pub const GLOBAL_SOURCE: SourceId = u8::MAX;

/// Set of sources a DBC file is applied to.
pub type SourceSet = BTreeSet<SourceId>;

/// Composite key of a CAN message: the source it was seen on and its address.
///
/// Ordering follows the 64-bit concatenation `source << 32 | address`.
#[derive(Default, Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct MessageId {
    pub source: SourceId,
    pub address: u32,
}

impl MessageId {
    pub fn new(source: SourceId, address: u32) -> Self {
        Self { source, address }
    }

    /// The 64-bit sort key (`source` in the high byte, `address` in the low 32 bits).
    #[inline]
    pub fn raw(&self) -> u64 {
        ((self.source as u64) << 32) | self.address as u64
    }
}

impl Ord for MessageId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.raw().cmp(&other.raw())
    }
}

impl PartialOrd for MessageId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MessageId {
    /// `"<source>:<ADDRESS in uppercase hex>"`, e.g. `1:1A0`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:X}", self.source, self.address)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid message id '{0}', expected '<source>:<hex address>'")]
pub struct MessageIdParseError(pub String);

impl FromStr for MessageId {
    type Err = MessageIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || MessageIdParseError(s.to_string());
        let (source, address) = s.split_once(':').ok_or_else(err)?;
        let source: SourceId = source.trim().parse().map_err(|_| err())?;
        let address: u32 = u32::from_str_radix(address.trim(), 16).map_err(|_| err())?;
        Ok(MessageId { source, address })
    }
}

/// Joins a source set for display, rendering [`GLOBAL_SOURCE`] as `all`.
pub fn sources_to_string(sources: &SourceSet) -> String {
    sources
        .iter()
        .map(|&s| {
            if s == GLOBAL_SOURCE {
                "all".to_string()
            } else {
                s.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}
