//! Client Configuration

use dmed_locator_codec::{GatewayBase, LocatorKey};

/// Locator sealing configuration shared by the publication and retrieval
/// paths: the symmetric key and the retrieval gateway prefix used both for
/// building URLs before sealing and for the decode fallback.
#[derive(Clone, Debug)]
pub struct LocatorConfig {
    pub key: LocatorKey,
    pub gateway_base: GatewayBase,
}

impl LocatorConfig {
    pub fn new(key: LocatorKey, gateway_base: GatewayBase) -> Self {
        LocatorConfig { key, gateway_base }
    }

    /// The deployment's shared key with the given gateway
    pub fn shared(gateway_base: GatewayBase) -> Self {
        LocatorConfig {
            key: LocatorKey::shared_default(),
            gateway_base,
        }
    }
}
