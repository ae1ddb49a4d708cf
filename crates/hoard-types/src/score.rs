use std::fmt;
use std::io::{self, Write};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::TypeError;

/// Length of a hex-encoded SHA-256 digest.
const SCORE_HEX_LEN: usize = 64;

/// Content digest used as the deduplication and lookup key for a blob.
///
/// A `Score` is the lowercase hex SHA-256 of a blob's bytes. Identical content
/// always produces the same `Score`, which is what lets the content store skip
/// uploads it has already paid for.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Score(String);

impl Score {
    /// Compute the score of an in-memory byte slice.
    pub fn of(data: &[u8]) -> Self {
        Self::from_digest(Sha256::digest(data).into())
    }

    /// Create a score from a finished SHA-256 digest.
    pub fn from_digest(digest: [u8; 32]) -> Self {
        Self(hex::encode(digest))
    }

    /// Parse and validate a hex score supplied from outside the process.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != SCORE_HEX_LEN {
            return Err(TypeError::InvalidScore {
                value: s.to_string(),
                reason: format!("expected {SCORE_HEX_LEN} hex characters, got {}", s.len()),
            });
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return Err(TypeError::InvalidScore {
                value: s.to_string(),
                reason: "must be lowercase hex".into(),
            });
        }
        Ok(Self(s.to_string()))
    }

    /// The full hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex representation (first 8 characters), for logs.
    pub fn short(&self) -> &str {
        &self.0[..8.min(self.0.len())]
    }
}

impl fmt::Debug for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Score({})", self.short())
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Score {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Score> for String {
    fn from(score: Score) -> Self {
        score.0
    }
}

impl AsRef<str> for Score {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A writer adapter that hashes and counts every byte on its way to `inner`.
///
/// Copying a reader into a `ScoreHasher` wrapping a staging file computes the
/// score and size of the content in the same pass that stages it, so the
/// input is never read twice.
pub struct ScoreHasher<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W: Write> ScoreHasher<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush the inner writer and return it with the score and byte count.
    pub fn finish(mut self) -> io::Result<(W, Score, u64)> {
        self.inner.flush()?;
        let score = Score::from_digest(self.hasher.finalize().into());
        Ok((self.inner, score, self.written))
    }
}

impl<W: Write> Write for ScoreHasher<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        // Only what the inner writer accepted counts toward the score.
        self.hasher.update(&buf[..n]);
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
