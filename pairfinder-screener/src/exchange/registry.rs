//! Registry of configured exchange adapters.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use pairfinder_common::Config;

use super::{BitunixAdapter, BybitAdapter, ExchangeAdapter, ExchangeId, OkxAdapter};

/// Adapters available to the screener, keyed by exchange.
#[derive(Clone, Default)]
pub struct ExchangeRegistry {
    adapters: HashMap<ExchangeId, Arc<dyn ExchangeAdapter>>,
}

impl ExchangeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build adapters for every enabled exchange in `config`.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();

        for (name, endpoint) in config.exchanges.iter() {
            if !endpoint.enabled {
                continue;
            }
            let adapter: Arc<dyn ExchangeAdapter> = match name.parse::<ExchangeId>() {
                Ok(ExchangeId::Bybit) => Arc::new(BybitAdapter::from_config(endpoint)),
                Ok(ExchangeId::Okx) => Arc::new(OkxAdapter::from_config(endpoint)),
                Ok(ExchangeId::Bitunix) => Arc::new(BitunixAdapter::from_config(endpoint)),
                Err(_) => continue,
            };
            registry.register(adapter);
        }

        info!(exchanges = ?registry.ids(), "Exchange registry initialized");
        registry
    }

    /// Register an adapter, replacing any previous adapter for the same exchange.
    pub fn register(&mut self, adapter: Arc<dyn ExchangeAdapter>) {
        self.adapters.insert(adapter.id(), adapter);
    }

    pub fn get(&self, id: ExchangeId) -> Option<Arc<dyn ExchangeAdapter>> {
        self.adapters.get(&id).cloned()
    }

    /// Registered exchanges in stable order.
    pub fn ids(&self) -> Vec<ExchangeId> {
        let mut ids: Vec<ExchangeId> = self.adapters.keys().copied().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for ExchangeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRegistry")
            .field("exchanges", &self.ids())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_registers_enabled_only() {
        let mut config = Config::default();
        config.exchanges.okx.enabled = false;

        let registry = ExchangeRegistry::from_config(&config);
        assert_eq!(registry.ids(), vec![ExchangeId::Bybit, ExchangeId::Bitunix]);
        assert!(registry.get(ExchangeId::Okx).is_none());
    }

    #[test]
    fn test_register_replaces_existing() {
        let mut registry = ExchangeRegistry::new();
        registry.register(Arc::new(BybitAdapter::with_base_url("http://a")));
        registry.register(Arc::new(BybitAdapter::with_base_url("http://b")));
        assert_eq!(registry.ids(), vec![ExchangeId::Bybit]);
        assert_eq!(registry.get(ExchangeId::Bybit).map(|a| a.id()), Some(ExchangeId::Bybit));
    }

    #[test]
    fn test_empty_registry() {
        let registry = ExchangeRegistry::new();
        assert!(registry.ids().is_empty());
        assert!(registry.get(ExchangeId::Okx).is_none());
    }
}
