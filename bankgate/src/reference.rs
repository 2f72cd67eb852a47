//! Reference numbers correlating a request with the bank's deduplication.
//!
//! A reference number is assigned once per payment intent. Retrying the same
//! intent must reuse it; only a genuinely new intent gets a fresh one.

use std::fmt::{Display, Formatter};

use chrono::Utc;
use rand::RngExt;
use rand::rng;
use serde::{Deserialize, Serialize};

/// A request-scoped correlation id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceNumber(String);

impl ReferenceNumber {
    /// Generates `<UTC yyyyMMddHHmmss><random 00001..99999>`.
    ///
    /// The random suffix is zero-padded so every generated number is 19
    /// digits long.
    #[must_use]
    pub fn generate() -> Self {
        let stamp = Utc::now().format("%Y%m%d%H%M%S");
        let suffix: u32 = rng().random_range(1..=99_999);
        Self(format!("{stamp}{suffix:05}"))
    }

    /// Uses the caller's reference number when given, generating one only when
    /// absent.
    #[must_use]
    pub fn or_generate(supplied: Option<String>) -> Self {
        supplied
            .filter(|s| !s.is_empty())
            .map_or_else(Self::generate, Self)
    }

    /// The reference number as sent on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for ReferenceNumber {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ReferenceNumber {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl Display for ReferenceNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReferenceNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
