//! Opaque per-owner blobs and the aggregate blob written to one checkpoint file.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::OwnerError;

/// Names starting with this character are reserved for coordinator bookkeeping.
pub const RESERVED_PREFIX: char = '_';

/// Opaque serialized state of a single owner.
///
/// The coordinator never looks inside a blob. Owners pick their own encoding;
/// [`Blob::encode`] and [`Blob::decode`] are provided for serde types.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Blob(Vec<u8>);

impl Blob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Encode a serde value with bincode.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, OwnerError> {
        Ok(Self(bincode::serialize(value)?))
    }

    /// Decode a value previously written by [`Blob::encode`].
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, OwnerError> {
        Ok(bincode::deserialize(&self.0)?)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

/// Aggregate of every saved owner's blob plus the time it was produced.
///
/// The timestamp is diagnostic only: it feeds the age report on load and is
/// never used to pick between checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointBlob {
    /// Seconds since the UNIX epoch.
    #[serde(rename = "_timestamp")]
    timestamp: f64,
    entries: BTreeMap<String, Blob>,
}

impl CheckpointBlob {
    /// Build a blob stamped with the current wall-clock time.
    pub fn new(entries: BTreeMap<String, Blob>) -> Self {
        Self::with_timestamp(entries, unix_now())
    }

    pub fn with_timestamp(entries: BTreeMap<String, Blob>, timestamp: f64) -> Self {
        Self { timestamp, entries }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Time elapsed since the blob was produced. Clock skew clamps to zero.
    pub fn age(&self) -> Duration {
        Duration::try_from_secs_f64(unix_now() - self.timestamp).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<&Blob> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> &BTreeMap<String, Blob> {
        &self.entries
    }

    pub fn into_entries(self) -> BTreeMap<String, Blob> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry name that collides with the reserved prefix, if any.
    pub(crate) fn reserved_key(&self) -> Option<&str> {
        self.keys().find(|key| is_reserved(key))
    }
}

pub fn is_reserved(name: &str) -> bool {
    name.starts_with(RESERVED_PREFIX)
}

fn unix_now() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_encode_decode() {
        let weights = vec![0.25f32, -1.5, 3.0];
        let blob = Blob::encode(&weights).unwrap();
        let restored: Vec<f32> = blob.decode().unwrap();
        assert_eq!(restored, weights);
    }

    #[test]
    fn test_blob_debug_hides_bytes() {
        let blob = Blob::new(vec![1, 2, 3, 4]);
        assert_eq!(format!("{:?}", blob), "Blob(4 bytes)");
    }

    #[test]
    fn test_new_blob_is_recent() {
        let blob = CheckpointBlob::new(BTreeMap::new());
        assert!(blob.age() < Duration::from_secs(5));
    }

    #[test]
    fn test_future_timestamp_clamps_age() {
        let blob = CheckpointBlob::with_timestamp(BTreeMap::new(), unix_now() + 3600.0);
        assert_eq!(blob.age(), Duration::ZERO);
    }

    #[test]
    fn test_reserved_key_detection() {
        let mut entries = BTreeMap::new();
        entries.insert("agent".to_string(), Blob::default());
        assert!(CheckpointBlob::new(entries.clone()).reserved_key().is_none());

        entries.insert("_timestamp".to_string(), Blob::default());
        assert_eq!(
            CheckpointBlob::new(entries).reserved_key(),
            Some("_timestamp")
        );
    }
}
