//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] reads a file once, in fixed-size chunks, feeding every chunk to
//! BLAKE3 and keeping the first `sample_bytes` bytes as the similarity sample.
//! Memory use is bounded by the chunk size plus the sample cap, regardless of
//! file size.
//!
//! # Example
//!
//! ```no_run
//! use treetidy::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let (hash, sample) = hasher.hash_and_sample(Path::new("README.md")).unwrap();
//! println!("{} ({} sample chars)", hash_to_hex(&hash), sample.map_or(0, |s| s.len()));
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::HashError;

/// 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Default similarity sample size in bytes.
pub const DEFAULT_SAMPLE_BYTES: usize = 8192;

/// Read buffer size for streaming.
const CHUNK_SIZE: usize = 64 * 1024;

/// Streaming BLAKE3 hasher that also captures a bounded text sample.
#[derive(Debug, Clone)]
pub struct Hasher {
    sample_bytes: usize,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default sample size.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sample_bytes: DEFAULT_SAMPLE_BYTES,
            shutdown_flag: None,
        }
    }

    /// Set the sample cap in bytes.
    #[must_use]
    pub fn with_sample_bytes(mut self, bytes: usize) -> Self {
        self.sample_bytes = bytes;
        self
    }

    /// Set the shutdown flag; hashing stops between chunks once it is raised.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Configured sample cap.
    #[must_use]
    pub fn sample_bytes(&self) -> usize {
        self.sample_bytes
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Hash the full content of `path` and capture its sample in one pass.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read, or if
    /// shutdown was requested mid-file.
    pub fn hash_and_sample(&self, path: &Path) -> Result<(Hash, Option<String>), HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        let mut sample = Vec::with_capacity(self.sample_bytes.min(CHUNK_SIZE));
        let mut buffer = vec![0u8; CHUNK_SIZE];

        loop {
            if self.is_shutdown_requested() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            let chunk = &buffer[..read];
            hasher.update(chunk);

            if sample.len() < self.sample_bytes {
                let take = (self.sample_bytes - sample.len()).min(read);
                sample.extend_from_slice(&chunk[..take]);
            }
        }

        Ok((*hasher.finalize().as_bytes(), decode_sample(&sample)))
    }

    /// Hash the full content of `path`.
    ///
    /// # Errors
    ///
    /// Same as [`Hasher::hash_and_sample`].
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        self.hash_and_sample(path).map(|(hash, _)| hash)
    }

    /// Read only the sample of `path`, without hashing the rest.
    ///
    /// Used when the content hash comes from a cache.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn sample(&self, path: &Path) -> Result<Option<String>, HashError> {
        let file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut sample = Vec::with_capacity(self.sample_bytes.min(CHUNK_SIZE));
        file.take(self.sample_bytes as u64)
            .read_to_end(&mut sample)
            .map_err(|e| HashError::from_io(path, e))?;
        Ok(decode_sample(&sample))
    }
}

/// Decode a sample as text; NUL bytes mark it as binary.
fn decode_sample(bytes: &[u8]) -> Option<String> {
    if bytes.contains(&0) {
        return None;
    }
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Convert a hash to a lowercase hexadecimal string.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a 64-character hexadecimal string into a hash.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut hash = [0u8; 32];
    for (i, byte) in hash.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(hash)
}

/// Serde adapter writing a [`Hash`] as a hex string.
///
/// Use with `#[serde(with = "crate::scanner::hasher::hex_serde")]`.
pub mod hex_serde {
    use super::{hash_to_hex, hex_to_hash, Hash};
    use serde::{de, Deserialize, Deserializer, Serializer};

    /// Serialize as lowercase hex.
    pub fn serialize<S: Serializer>(hash: &Hash, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hash_to_hex(hash))
    }

    /// Deserialize from a 64-character hex string.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Hash, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex_to_hash(&s).ok_or_else(|| de::Error::custom(format!("invalid hash: {s}")))
    }
}
