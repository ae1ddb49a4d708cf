use std::fmt;
use std::str::FromStr;

use crate::error::BackendError;

/// Parsed form of a blob location: `scheme://container/key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlobLocation {
    pub scheme: String,
    pub container: String,
    pub key: String,
}

impl BlobLocation {
    pub fn new(
        scheme: impl Into<String>,
        container: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            scheme: scheme.into(),
            container: container.into(),
            key: key.into(),
        }
    }

    /// Parse `location` and check that it belongs to `scheme`.
    pub fn parse_for(location: &str, scheme: &str) -> Result<Self, BackendError> {
        let parsed: Self = location.parse()?;
        if parsed.scheme != scheme {
            return Err(BackendError::InvalidLocation {
                location: location.to_string(),
                reason: format!("expected scheme {scheme:?}, found {:?}", parsed.scheme),
            });
        }
        Ok(parsed)
    }
}

impl FromStr for BlobLocation {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| BackendError::InvalidLocation {
            location: s.to_string(),
            reason: reason.to_string(),
        };

        let (scheme, rest) = s.split_once("://").ok_or_else(|| invalid("missing scheme"))?;
        if scheme.is_empty() {
            return Err(invalid("empty scheme"));
        }
        let (container, key) = rest
            .split_once('/')
            .ok_or_else(|| invalid("missing key"))?;
        if container.is_empty() || key.is_empty() {
            return Err(invalid("empty container or key"));
        }
        Ok(Self::new(scheme, container, key))
    }
}

impl fmt::Display for BlobLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}/{}", self.scheme, self.container, self.key)
    }
}
