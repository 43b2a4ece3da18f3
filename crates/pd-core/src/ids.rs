//! Image identifiers and storage-key naming.
//!
//! An [`ImageId`] is 4 random bytes rendered as 8 lowercase hex characters.
//! The file an image lives in is named `<id><extension>`, where the extension
//! is taken verbatim from the uploaded filename.

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Number of random bytes in an [`ImageId`].
pub const IMAGE_ID_BYTES: usize = 4;

/// Length of the textual form of an [`ImageId`].
pub const IMAGE_ID_LEN: usize = IMAGE_ID_BYTES * 2;

/// Short random identifier naming a stored image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageId([u8; IMAGE_ID_BYTES]);

impl ImageId {
    /// Draw a new identifier from the thread-local CSPRNG.
    #[must_use]
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        Self(rng.gen())
    }

    /// Build an identifier from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; IMAGE_ID_BYTES]) -> Self {
        Self(bytes)
    }

    /// File name under which an image with this id and `extension` is stored.
    #[must_use]
    pub fn storage_key(&self, extension: &str) -> String {
        format!("{self}{extension}")
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Error returned when text is not a canonical image id.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid image id: {0:?}")]
pub struct ParseImageIdError(String);

impl FromStr for ImageId {
    type Err = ParseImageIdError;

    /// Parse the canonical form only: exactly 8 characters of `[0-9a-f]`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let canonical = s.len() == IMAGE_ID_LEN
            && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'));
        if !canonical {
            return Err(ParseImageIdError(s.to_string()));
        }

        let mut bytes = [0u8; IMAGE_ID_BYTES];
        hex::decode_to_slice(s, &mut bytes).map_err(|_| ParseImageIdError(s.to_string()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for ImageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ImageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Extension of an uploaded filename, dot included, case preserved.
///
/// Follows `extname` semantics: only the basename is considered, and a
/// leading dot (`.bashrc`) does not start an extension.
pub fn extension_of(filename: &str) -> &str {
    let base = basename(filename);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx..],
        _ => "",
    }
}

/// Name of a directory entry with its extension removed.
pub fn stem_of(name: &str) -> &str {
    let ext = extension_of(name);
    &name[..name.len() - ext.len()]
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
