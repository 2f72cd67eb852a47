//! Resource identifiers keying the request, response and provider registries.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::RegistryError;

/// Selects one contract variant or provider.
///
/// Serialized as its stable string key (`"OPG_AUTH"`, `"OPG_GENERIC"`,
/// `"VA_CREDIT"`, `"VA_DEBIT"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceId {
    /// Gateway token endpoint.
    OpgAuth,
    /// Any signed gateway business call.
    OpgGeneric,
    /// Virtual-account credit sub-product.
    VaCredit,
    /// Virtual-account debit sub-product.
    VaDebit,
}

impl ResourceId {
    /// Every identifier, in registration order.
    pub const ALL: [Self; 4] = [Self::OpgAuth, Self::OpgGeneric, Self::VaCredit, Self::VaDebit];

    /// The stable string key.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpgAuth => "OPG_AUTH",
            Self::OpgGeneric => "OPG_GENERIC",
            Self::VaCredit => "VA_CREDIT",
            Self::VaDebit => "VA_DEBIT",
        }
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for ResourceId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| RegistryError::UnknownResource(s.to_owned()))
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
