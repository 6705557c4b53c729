//! Cache fingerprints
//!
//! A [`Fingerprint`] identifies a cache entry by request identity: the source
//! URL together with the requested [`MediaKind`]. It is stored as its raw
//! 32-byte SHA-256 digest rather than a hex string, so comparisons are cheap
//! and the type is `Copy`, while display and serialization use lowercase hex
//! which doubles as the cache file stem.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::app::media::MediaKind;

/// Length of the digest in bytes
const FINGERPRINT_LEN: usize = 32;

/// Digest of (URL, media kind)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

/// Compute the fingerprint of a request
///
/// The URL is trimmed of surrounding whitespace. The kind tag and the URL are
/// separated by a NUL byte, which cannot occur in either, so no pair of
/// distinct inputs feeds the same bytes to the digest.
///
/// # Examples
///
/// ```rust
/// use media_cache::app::{fingerprint, MediaKind};
///
/// let video = fingerprint("https://x/1", MediaKind::Video);
/// let audio = fingerprint("https://x/1", MediaKind::Audio);
/// assert_ne!(video, audio);
/// assert_eq!(video, fingerprint(" https://x/1 ", MediaKind::Video));
/// ```
pub fn fingerprint(url: &str, kind: MediaKind) -> Fingerprint {
    let mut hasher = Sha256::new();
    hasher.update(kind.tag().as_bytes());
    hasher.update([0u8]);
    hasher.update(url.trim().as_bytes());
    Fingerprint(hasher.finalize().into())
}

impl Fingerprint {
    /// Parse a fingerprint from its 64-character hex form
    pub fn from_hex(hex_str: &str) -> Result<Self, String> {
        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(hex_str, &mut bytes)
            .map_err(|e| format!("invalid fingerprint {hex_str:?}: {e}"))?;
        Ok(Fingerprint(bytes))
    }

    /// Lowercase hex representation
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// File name of the cached file for this fingerprint
    pub fn file_name(&self, kind: MediaKind) -> String {
        format!("{}.{}", self.to_hex(), kind.extension())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let hex_string = String::deserialize(deserializer)?;
        Self::from_hex(&hex_string).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_deterministic() {
        let a = fingerprint("https://x/1", MediaKind::Video);
        let b = fingerprint("https://x/1", MediaKind::Video);
        assert_eq!(a, b);
        assert_eq!(a.to_hex(), b.to_hex());
    }

    #[test]
    fn test_known_digest() {
        // sha256("video\0https://x/1")
        let expected = {
            let mut hasher = Sha256::new();
            hasher.update(b"video\0https://x/1");
            hex::encode(hasher.finalize())
        };
        assert_eq!(fingerprint("https://x/1", MediaKind::Video).to_hex(), expected);
    }

    #[test]
    fn test_distinct_inputs() {
        let inputs = [
            ("https://x/1", MediaKind::Video),
            ("https://x/1", MediaKind::Audio),
            ("https://x/2", MediaKind::Video),
            ("https://x/2", MediaKind::Audio),
            ("https://x/10", MediaKind::Video),
        ];

        let unique: HashSet<Fingerprint> = inputs
            .iter()
            .map(|(url, kind)| fingerprint(url, *kind))
            .collect();
        assert_eq!(unique.len(), inputs.len());
    }

    #[test]
    fn test_whitespace_normalized() {
        assert_eq!(
            fingerprint("\thttps://x/1\n", MediaKind::Audio),
            fingerprint("https://x/1", MediaKind::Audio)
        );
    }

    #[test]
    fn test_hex_round_trip_and_file_name() {
        let fp = fingerprint("https://x/1", MediaKind::Audio);
        let parsed: Fingerprint = fp.to_hex().parse().unwrap();
        assert_eq!(parsed, fp);

        let name = fp.file_name(MediaKind::Audio);
        assert_eq!(name.len(), 64 + 4);
        assert!(name.ends_with(".mp3"));
    }

    #[test]
    fn test_invalid_hex_rejected() {
        assert!(Fingerprint::from_hex("").is_err());
        assert!(Fingerprint::from_hex("abc").is_err());
        assert!(Fingerprint::from_hex(&"g".repeat(64)).is_err());
    }

    #[test]
    fn test_serialization() {
        let fp = fingerprint("https://x/1", MediaKind::Video);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", fp.to_hex()));
        let back: Fingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }
}
