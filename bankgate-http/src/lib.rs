//! HTTP transport and provider façades for the bankgate adapter.
//!
//! Sends the contract variants from [`bankgate`] over `reqwest`, classifies
//! every failure, caches the gateway bearer token and exposes the bank's
//! products as typed async operations.
//!
//! # Modules
//!
//! - [`error`] - Call and provider error types, [`ErrorKind`] classification
//! - [`provider`] - Gateway and virtual-account façades, provider registry
//! - [`remote`] - One audited HTTP exchange
//! - [`routing`] - Bank code to clearing code lookup
//! - [`token`] - Process-wide bearer token cache
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bankgate::BankConfig;
//! use bankgate::resource::ResourceId;
//! use bankgate_http::{RemoteCall, StaticBankRouting, TokenCache, provider_registry};
//!
//! # async fn run(config: BankConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let providers = provider_registry(
//!     Arc::new(config.opg),
//!     &Arc::new(config.va),
//!     RemoteCall::new(),
//!     Arc::new(TokenCache::new()),
//!     Arc::new(StaticBankRouting::default().with("014", "CENAIDJA")),
//! );
//! let gateway = providers.resolve(ResourceId::OpgGeneric)?;
//! if let Some(gateway) = gateway.as_opg() {
//!     let balance = gateway.get_balance("0115476117").await?;
//!     println!("{}", balance.account_balance);
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod provider;
pub mod remote;
pub mod routing;
pub mod token;

pub use error::{CallError, ErrorKind, ProviderError, ProviderFailure};
pub use provider::{
    BankProvider, Contracts, OpgProvider, ProviderRegistry, VaProvider, provider_registry,
};
pub use remote::RemoteCall;
pub use routing::{BankRouting, RoutingError, StaticBankRouting};
pub use token::TokenCache;
