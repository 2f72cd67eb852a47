//! Resource registries.
//!
//! A [`Registry`] maps a [`ResourceId`] to a zero-argument constructor. The
//! registry owns how each constructor is parameterized (credentials,
//! endpoints, product), so call sites only name the resource they need.
//!
//! Registries are built once at startup and read-only afterwards.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::config::{OpgConfig, VaConfig};
use crate::contract::{
    BankRequest, BankResponse, OpgAuthRequest, OpgAuthResponse, OpgGenericRequest,
    OpgGenericResponse, VaProduct, VaRequest, VaResponse,
};
use crate::error::{RegistryError, RequestError};
use crate::resource::ResourceId;

/// Builds one fresh instance per call.
pub type Constructor<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Maps resource identifiers to constructors.
pub struct Registry<T> {
    entries: HashMap<ResourceId, Constructor<T>>,
}

impl<T> Debug for Registry<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&'static str> = self.entries.keys().map(ResourceId::as_str).collect();
        keys.sort_unstable();
        f.debug_tuple("Registry").field(&keys).finish()
    }
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Registry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers `constructor` under `key`, replacing any previous entry.
    pub fn register<F>(&mut self, key: ResourceId, constructor: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.entries.insert(key, Box::new(constructor));
        self
    }

    /// Builds a fresh instance for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResource`] if `key` was never
    /// registered.
    pub fn resolve(&self, key: ResourceId) -> Result<T, RegistryError> {
        let constructor = self.entries.get(&key).ok_or_else(|| {
            #[cfg(feature = "telemetry")]
            tracing::warn!(resource = %key, "resource not registered");
            RegistryError::UnknownResource(key.to_string())
        })?;
        Ok(constructor())
    }

    /// Builds a fresh instance for a string key such as `"VA_CREDIT"`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownResource`] if the key is not a
    /// resource identifier or was never registered.
    pub fn resolve_key(&self, key: &str) -> Result<T, RegistryError> {
        self.resolve(key.parse()?)
    }

    /// Whether `key` has a constructor.
    #[must_use]
    pub fn contains(&self, key: ResourceId) -> bool {
        self.entries.contains_key(&key)
    }

    /// Registered keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.entries.keys().copied()
    }
}

/// Registry of request variants, fallible because building headers can fail.
pub type RequestRegistry = Registry<Result<BankRequest, RequestError>>;

/// Registry of response variants.
pub type ResponseRegistry = Registry<BankResponse>;

/// Registers one request variant per resource identifier.
#[must_use]
pub fn request_registry(opg: &Arc<OpgConfig>, va: &Arc<VaConfig>) -> RequestRegistry {
    let mut registry = Registry::new();
    let auth = Arc::clone(opg);
    registry.register(ResourceId::OpgAuth, move || {
        OpgAuthRequest::new(Arc::clone(&auth)).map(BankRequest::OpgAuth)
    });
    let generic = Arc::clone(opg);
    registry.register(ResourceId::OpgGeneric, move || {
        OpgGenericRequest::new(Arc::clone(&generic)).map(BankRequest::OpgGeneric)
    });
    for product in [VaProduct::Credit, VaProduct::Debit] {
        let va = Arc::clone(va);
        registry.register(product.resource(), move || {
            VaRequest::new(product, Arc::clone(&va)).map(BankRequest::Va)
        });
    }
    registry
}

/// Registers one response variant per resource identifier.
#[must_use]
pub fn response_registry(va: &Arc<VaConfig>) -> ResponseRegistry {
    let mut registry = Registry::new();
    registry.register(ResourceId::OpgAuth, || {
        BankResponse::OpgAuth(OpgAuthResponse::new())
    });
    registry.register(ResourceId::OpgGeneric, || {
        BankResponse::OpgGeneric(OpgGenericResponse::new())
    });
    for product in [VaProduct::Credit, VaProduct::Debit] {
        let va = Arc::clone(va);
        registry.register(product.resource(), move || {
            BankResponse::Va(VaResponse::new(product, Arc::clone(&va)))
        });
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Endpoint, OpgCredentials, VaCredentials};

    fn configs() -> (Arc<OpgConfig>, Arc<VaConfig>) {
        let opg = Arc::new(OpgConfig {
            endpoint: Endpoint::new("https://gateway.bank.example"),
            self_bank_code: "009".into(),
            credentials: OpgCredentials {
                username: "u".into(),
                password: "p".into(),
                api_key: "k".into(),
                secret_key: "s".into(),
                client_name: "c".into(),
                client_id_prefix: String::new(),
            },
        });
        let keys = VaCredentials {
            client_id: "001".into(),
            secret_key: "s".into(),
        };
        let va = Arc::new(VaConfig {
            endpoint: Endpoint::new("https://va.bank.example"),
            credit: keys.clone(),
            debit: keys,
        });
        (opg, va)
    }

    #[test]
    fn test_every_resource_resolves_to_its_variant() {
        let (opg, va) = configs();
        let requests = request_registry(&opg, &va);
        let responses = response_registry(&va);
        for id in ResourceId::ALL {
            let request = requests.resolve(id).unwrap().unwrap();
            assert_eq!(request.resource(), id);
            assert!(responses.contains(id));
        }
        assert!(matches!(
            responses.resolve(ResourceId::VaDebit).unwrap(),
            BankResponse::Va(_)
        ));
    }

    #[test]
    fn test_resolve_by_string_key() {
        let (opg, va) = configs();
        let requests = request_registry(&opg, &va);
        let request = requests.resolve_key("VA_DEBIT").unwrap().unwrap();
        assert_eq!(request.resource(), ResourceId::VaDebit);
    }

    #[test]
    fn test_unknown_resource() {
        let registry: Registry<u8> = Registry::new();
        assert_eq!(
            registry.resolve(ResourceId::OpgAuth),
            Err(RegistryError::UnknownResource("OPG_AUTH".into()))
        );
        assert_eq!(
            registry.resolve_key("NOPE"),
            Err(RegistryError::UnknownResource("NOPE".into()))
        );
    }

    #[test]
    fn test_each_resolve_builds_fresh_instance() {
        let mut registry: Registry<Vec<u8>> = Registry::new();
        registry.register(ResourceId::OpgAuth, Vec::new);
        let mut first = registry.resolve(ResourceId::OpgAuth).unwrap();
        first.push(1);
        assert!(registry.resolve(ResourceId::OpgAuth).unwrap().is_empty());
    }

    #[test]
    fn test_debug_lists_keys() {
        let (_, va) = configs();
        let debug = format!("{:?}", response_registry(&va));
        assert!(debug.contains("OPG_AUTH") && debug.contains("VA_DEBIT"));
    }
}
