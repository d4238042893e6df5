use std::{fmt, str::FromStr};

use bson::{Binary, Bson, spec::BinarySubtype};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

/// Identifier of a validation-record ledger entry.
///
/// Stored as a 16 byte generic binary so entries sort by creation time in
/// MongoDB; rendered as the canonical 26 character ULID string everywhere else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Ulid);

impl RecordId {
    pub fn new() -> Self {
        RecordId(Ulid::new())
    }

    pub fn ulid(&self) -> Ulid {
        self.0
    }

    fn to_binary(self) -> Binary {
        Binary {
            subtype: BinarySubtype::Generic,
            bytes: self.0.to_bytes().to_vec(),
        }
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(RecordId)
    }
}

impl From<Ulid> for RecordId {
    fn from(u: Ulid) -> Self {
        Self(u)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        self.to_binary().serialize(s)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let bin = Binary::deserialize(d)?;
        let bytes: [u8; 16] = bin
            .bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("RecordId: expected exactly 16 bytes"))?;
        Ok(RecordId(Ulid::from_bytes(bytes)))
    }
}

// lets RecordId sit directly in doc! {} filters
impl From<RecordId> for Bson {
    fn from(id: RecordId) -> Self {
        Bson::Binary(id.to_binary())
    }
}
