use serde::{Deserialize, Serialize};

use crate::score::Score;

/// Descriptor of where a piece of content lives.
///
/// The `location` string is owned by the blob backend that produced it and is
/// carried verbatim; only that backend knows how to parse it back.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// SHA-256 of the content.
    pub score: Score,
    /// Backend locator, `scheme://container/key`.
    pub location: String,
    /// Content length in bytes.
    pub size: u64,
    /// Offset into `location` for backends that pack several blobs together.
    #[serde(default)]
    pub offset: u64,
}

impl Address {
    pub fn new(score: Score, location: impl Into<String>, size: u64) -> Self {
        Self {
            score,
            location: location.into(),
            size,
            offset: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_defaults_to_zero() {
        let score = Score::of(b"x");
        let json = format!(r#"{{"score":"{score}","location":"mem://c/k","size":1}}"#);
        let addr: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr.offset, 0);
        assert_eq!(addr, Address::new(score, "mem://c/k", 1));
    }
}
