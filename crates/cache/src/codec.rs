//! Pluggable encoding of cache entries on disk

use crate::entry::CacheEntry;
use crate::{Error, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Turns a [`CacheEntry`] into bytes for the disk tier and back
///
/// Decoding failures are reported as errors; the disk store turns them into
/// "corrupt entry" and the engine deletes the file.
pub trait Codec<T> {
    /// File extension (without dot) of entry files written with this codec
    const EXTENSION: &'static str;

    /// Encode an entry
    fn encode(entry: &CacheEntry<T>) -> Result<Vec<u8>>;

    /// Decode an entry
    fn decode(bytes: &[u8]) -> Result<CacheEntry<T>>;
}

/// Pretty-printed JSON, the default on-disk format
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    const EXTENSION: &'static str = "json";

    fn encode(entry: &CacheEntry<T>) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(entry)
            .map_err(|e| Error::serialization(format!("Failed to encode cache entry: {e}")))
    }

    fn decode(bytes: &[u8]) -> Result<CacheEntry<T>> {
        serde_json::from_slice(bytes)
            .map_err(|e| Error::serialization(format!("Failed to decode cache entry: {e}")))
    }
}
