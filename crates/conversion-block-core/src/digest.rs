//! SHA-256 digests of bundled files, recorded in the run log.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Serialize, Serializer};
use sha2::{Digest as Sha2Digest, Sha256};

/// SHA-256 digest of a file's contents.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the SHA-256 digest of `data`.
    pub fn compute(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hash);
        Self(bytes)
    }

    /// Stream the file at `path` through SHA-256. Returns the digest and byte count.
    pub fn of_file(path: &Path) -> io::Result<(Self, u64)> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        let size = io::copy(&mut file, &mut hasher)?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&hasher.finalize());
        Ok((Self(bytes), size))
    }

    /// Hex-encoded string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex().chars().take(12).collect::<String>())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_file_matches_in_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("net.dfp");
        std::fs::write(&path, b"compiled bytes").unwrap();

        let (digest, size) = Digest::of_file(&path).unwrap();
        assert_eq!(digest, Digest::compute(b"compiled bytes"));
        assert_eq!(size, 14);
    }

    #[test]
    fn digest_serializes_as_hex() {
        let d = Digest::compute(b"");
        let v = serde_json::to_value(d).unwrap();
        assert_eq!(
            v,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
