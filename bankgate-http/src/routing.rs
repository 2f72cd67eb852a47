//! Bank-routing lookup.
//!
//! Interbank transfers need the destination bank's clearing code. Where that
//! mapping lives (usually the embedding application's database) is not this
//! crate's concern; it is consumed read-only through [`BankRouting`].

use std::collections::HashMap;

use async_trait::async_trait;

/// Failures of a routing lookup.
#[derive(Debug, thiserror::Error)]
pub enum RoutingError {
    /// The bank code is not known. Lookups never fall back to a default.
    #[error("no clearing code for bank '{0}'")]
    UnknownBank(String),
    /// The backing store failed.
    #[error("routing lookup failed: {0}")]
    Lookup(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Resolves a bank code to its clearing/RTGS code.
#[async_trait]
pub trait BankRouting: Send + Sync {
    /// Returns the clearing code of `bank_code`.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::UnknownBank`] if the code is not known.
    async fn clearing_code(&self, bank_code: &str) -> Result<String, RoutingError>;
}

/// In-memory routing table.
#[derive(Debug, Clone, Default)]
pub struct StaticBankRouting {
    codes: HashMap<String, String>,
}

impl StaticBankRouting {
    /// Creates a table from `bank code -> clearing code` pairs.
    #[must_use]
    pub const fn new(codes: HashMap<String, String>) -> Self {
        Self { codes }
    }

    /// Adds or replaces one entry.
    #[must_use]
    pub fn with(mut self, bank_code: impl Into<String>, clearing_code: impl Into<String>) -> Self {
        self.codes.insert(bank_code.into(), clearing_code.into());
        self
    }
}

impl FromIterator<(String, String)> for StaticBankRouting {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().collect(),
        }
    }
}

#[async_trait]
impl BankRouting for StaticBankRouting {
    async fn clearing_code(&self, bank_code: &str) -> Result<String, RoutingError> {
        self.codes
            .get(bank_code)
            .cloned()
            .ok_or_else(|| RoutingError::UnknownBank(bank_code.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_lookup() {
        let routing = StaticBankRouting::default().with("014", "CENAIDJA");
        assert_eq!(routing.clearing_code("014").await.unwrap(), "CENAIDJA");
    }

    #[tokio::test]
    async fn test_unknown_bank_fails_loudly() {
        let routing: StaticBankRouting = [("014".to_owned(), "CENAIDJA".to_owned())]
            .into_iter()
            .collect();
        assert!(matches!(
            routing.clearing_code("999").await,
            Err(RoutingError::UnknownBank(code)) if code == "999"
        ));
    }
}
