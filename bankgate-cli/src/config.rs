//! CLI configuration.
//!
//! Loads [`BankConfig`] plus an optional routing table from a TOML file.
//! String values may reference the environment with `$VAR` or `${VAR}`, so
//! secrets never have to live in the file.
//!
//! # Example Configuration
//!
//! ```toml
//! [opg]
//! base_url = "https://gateway.bank.example"
//! port = 8066
//!
//! [opg.credentials]
//! username = "wallet"
//! password = "$OPG_PASSWORD"
//! api_key = "$OPG_API_KEY"
//! secret_key = "${OPG_SECRET_KEY}"
//! client_name = "WALLET"
//!
//! [va]
//! base_url = "https://va.bank.example"
//! credit = { client_id = "00195", secret_key = "$VA_CREDIT_SECRET" }
//! debit = { client_id = "00196", secret_key = "$VA_DEBIT_SECRET" }
//!
//! [routing]
//! "014" = "CENAIDJA"
//! ```
//!
//! # Environment Variables
//!
//! - `CONFIG` - Path to the configuration file (default: `bankgate.toml`)
//! - Any variable referenced by `$VAR` in the file

use std::collections::HashMap;
use std::path::Path;

use bankgate::BankConfig;
use serde::Deserialize;

/// Default configuration path.
pub const DEFAULT_PATH: &str = "bankgate.toml";

/// Everything the CLI reads from its configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Endpoints and credentials of both products.
    #[serde(flatten)]
    pub bank: BankConfig,
    /// Bank code to clearing code, for interbank transfers.
    #[serde(default)]
    pub routing: HashMap<String, String>,
}

impl CliConfig {
    /// Loads from the path in `CONFIG`, falling back to [`DEFAULT_PATH`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| DEFAULT_PATH.to_owned());
        Self::load_from(Path::new(&path))
    }

    /// Loads from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
        Self::parse(&content, |name| std::env::var(name).ok())
    }

    /// Parses `content` after expanding variables through `lookup`.
    fn parse(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let expanded = expand_vars(content, lookup);
        Ok(toml::from_str(&expanded)?)
    }
}

/// Expands `$VAR` and `${VAR}`. Unresolved variables are left as-is.
fn expand_vars(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }
        let braced = chars.next_if_eq(&'{').is_some();
        let mut name = String::new();
        let mut closed = false;
        while let Some(&c) = chars.peek() {
            if braced && c == '}' {
                chars.next();
                closed = true;
                break;
            }
            if !braced && !c.is_ascii_alphanumeric() && c != '_' {
                break;
            }
            name.push(c);
            chars.next();
        }

        match lookup(&name).filter(|_| !name.is_empty()) {
            Some(value) => result.push_str(&value),
            None => {
                result.push('$');
                if braced {
                    result.push('{');
                }
                result.push_str(&name);
                if closed {
                    result.push('}');
                }
            }
        }
    }

    result
}
