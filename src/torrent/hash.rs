use crate::{Error, Result};
use serde::ser;
use std::{
    convert,
    fmt::{Debug, Display},
};

/// A 20-byte SHA-1 digest: info-hashes and v1 piece hashes.
#[derive(Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HashId([u8; 20]);

impl HashId {
    /// SHA-1 of `data`. Info-hashes must stay on SHA-1 to match other tools.
    pub fn digest(data: &[u8]) -> Self {
        let digest = ring::digest::digest(&ring::digest::SHA1_FOR_LEGACY_USE_ONLY, data);
        let mut id = [0u8; 20];
        id.copy_from_slice(digest.as_ref());
        Self(id)
    }

    pub fn hex(&self) -> String {
        hex::encode(self)
    }

    pub fn from_hex(s: impl AsRef<str>) -> Result<Self> {
        let data = hex::decode(s.as_ref()).map_err(|err| Error::InvalidInput(err.to_string()))?;
        Self::from_slice(&data)
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        let id: [u8; 20] = slice.try_into().map_err(|_| Error::BytesToHashId)?;
        Ok(Self(id))
    }
}

/// Info-hash of the raw, undecoded info dictionary.
pub fn info_hash(raw_info: &[u8]) -> HashId {
    HashId::digest(raw_info)
}

impl Debug for HashId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self, f)
    }
}

impl Display for HashId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self))
    }
}

impl From<[u8; 20]> for HashId {
    fn from(value: [u8; 20]) -> Self {
        Self(value)
    }
}

impl convert::AsRef<[u8]> for HashId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl ser::Serialize for HashId {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}

/// Root of a v2 per-file merkle tree (SHA-256, 32 bytes).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PiecesRoot([u8; 32]);

impl PiecesRoot {
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        slice.try_into().ok().map(Self)
    }

    pub fn hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl Debug for PiecesRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hex())
    }
}

impl ser::Serialize for PiecesRoot {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.hex())
    }
}
