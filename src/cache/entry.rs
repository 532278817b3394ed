use crate::FeatureInfo;
use crate::Result;
use crate::StorageError;

/// A verified feature description together with the serialized bytes it was
/// captured from.
///
/// The captured bytes are written to durable storage verbatim, so
/// persistence never re-derives the computed result; reading a store file
/// replays the bytes back into a [`FeatureInfo`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub info: FeatureInfo,
    pub captured: Vec<u8>,
}

impl CacheEntry {
    /// Capture `info` into its serialized byte form
    pub fn capture(info: &FeatureInfo) -> Result<Self> {
        let captured = bincode::serialize(info).map_err(StorageError::BincodeError)?;
        Ok(Self {
            info: info.clone(),
            captured,
        })
    }

    /// Replay previously captured bytes back into an entry
    pub fn replay(captured: Vec<u8>) -> Result<Self> {
        let info = bincode::deserialize(&captured).map_err(StorageError::BincodeError)?;
        Ok(Self { info, captured })
    }
}
