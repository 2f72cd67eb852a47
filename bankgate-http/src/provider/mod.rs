//! Provider façades.
//!
//! A provider exposes the domain operations of one bank product. Each
//! operation assembles the bank payload from typed parameters, resolves its
//! request/response pair from [`Contracts`], runs one [`RemoteCall`] and
//! reshapes the bank's envelope into a flat result. Every failure reaches the
//! caller as a single [`ProviderError`](crate::ProviderError).
//!
//! Providers are cheap to clone; all shared state sits behind `Arc`.

mod opg;
mod va;

pub use opg::*;
pub use va::*;

use std::sync::Arc;

use bankgate::config::{OpgConfig, VaConfig};
use bankgate::contract::{BankRequest, BankResponse, VaProduct};
use bankgate::registry::{self, Registry, RequestRegistry, ResponseRegistry};
use bankgate::resource::ResourceId;

use crate::error::ProviderFailure;
use crate::remote::RemoteCall;
use crate::routing::BankRouting;
use crate::token::TokenCache;

/// Request and response registries shared by all providers.
#[derive(Debug)]
pub struct Contracts {
    requests: RequestRegistry,
    responses: ResponseRegistry,
}

impl Contracts {
    /// Registers every contract variant against the given configuration.
    #[must_use]
    pub fn new(opg: &Arc<OpgConfig>, va: &Arc<VaConfig>) -> Self {
        Self::from_registries(
            registry::request_registry(opg, va),
            registry::response_registry(va),
        )
    }

    /// Wraps pre-built registries.
    #[must_use]
    pub const fn from_registries(requests: RequestRegistry, responses: ResponseRegistry) -> Self {
        Self {
            requests,
            responses,
        }
    }

    /// A fresh request/response pair for `resource`.
    pub(crate) fn prepare(
        &self,
        resource: ResourceId,
    ) -> Result<(BankRequest, BankResponse), ProviderFailure> {
        let request = self.requests.resolve(resource)??;
        let response = self.responses.resolve(resource)?;
        Ok((request, response))
    }
}

/// Any provider façade.
#[derive(Debug, Clone)]
pub enum BankProvider {
    /// The token-authenticated gateway.
    Opg(OpgProvider),
    /// One virtual-account sub-product.
    Va(VaProvider),
}

impl BankProvider {
    /// The gateway provider, if this is one.
    #[must_use]
    pub const fn as_opg(&self) -> Option<&OpgProvider> {
        match self {
            Self::Opg(provider) => Some(provider),
            Self::Va(_) => None,
        }
    }

    /// The virtual-account provider, if this is one.
    #[must_use]
    pub const fn as_va(&self) -> Option<&VaProvider> {
        match self {
            Self::Va(provider) => Some(provider),
            Self::Opg(_) => None,
        }
    }
}

/// Registry of provider façades.
pub type ProviderRegistry = Registry<BankProvider>;

/// Registers the gateway provider under `OPG_GENERIC` and one virtual-account
/// provider per sub-product.
///
/// `tokens` is the process-wide cache; every resolved gateway provider shares
/// it.
#[must_use]
pub fn provider_registry(
    opg: Arc<OpgConfig>,
    va: &Arc<VaConfig>,
    remote: RemoteCall,
    tokens: Arc<TokenCache>,
    routing: Arc<dyn BankRouting>,
) -> ProviderRegistry {
    let contracts = Arc::new(Contracts::new(&opg, va));
    let mut registry = Registry::new();

    let gateway = OpgProvider::new(
        opg,
        Arc::clone(&contracts),
        remote.clone(),
        tokens,
        routing,
    );
    registry.register(ResourceId::OpgGeneric, move || {
        BankProvider::Opg(gateway.clone())
    });

    for product in [VaProduct::Credit, VaProduct::Debit] {
        let provider = VaProvider::new(product, Arc::clone(&contracts), remote.clone());
        registry.register(product.resource(), move || {
            BankProvider::Va(provider.clone())
        });
    }
    registry
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::StaticBankRouting;
    use wiremock::MockServer;

    #[tokio::test]
    async fn test_provider_registry_resolves_every_product() {
        let server = MockServer::start().await;
        let registry = provider_registry(
            fixtures::opg_config(&server),
            &fixtures::va_config(&server),
            RemoteCall::new(),
            Arc::new(TokenCache::new()),
            Arc::new(StaticBankRouting::default()),
        );

        assert!(registry.resolve(ResourceId::OpgGeneric).unwrap().as_opg().is_some());
        let debit = registry.resolve(ResourceId::VaDebit).unwrap();
        assert_eq!(debit.as_va().unwrap().product(), VaProduct::Debit);
        assert!(registry.resolve(ResourceId::OpgAuth).is_err());
    }

    #[tokio::test]
    async fn test_contracts_prepare_matching_pair() {
        let server = MockServer::start().await;
        let contracts = Contracts::new(
            &fixtures::opg_config(&server),
            &fixtures::va_config(&server),
        );
        let (request, response) = contracts.prepare(ResourceId::VaCredit).unwrap();
        assert_eq!(request.resource(), ResourceId::VaCredit);
        assert!(matches!(response, BankResponse::Va(_)));
    }
}
