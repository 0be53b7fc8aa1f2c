//! Merges caller-supplied adapters with wallets discovered in the host environment

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::adapter::WalletAdapter;
use crate::cluster::Cluster;
use crate::error::SignerError;
use crate::standard::types::StandardWallet;
use crate::standard::{is_wallet_adapter_compatible, StandardWalletAdapter};

/// Reserved name of the platform mobile wallet adapter
pub const MOBILE_WALLET_ADAPTER_NAME: &str = "Mobile Wallet Adapter";

/// The host's registry of announced Wallet Standard wallets
pub trait WalletRegistry: Send + Sync {
    fn get(&self) -> Vec<Arc<dyn StandardWallet>>;
}

/// Identity the application presents to a mobile wallet
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppIdentity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Constructor of the platform mobile wallet adapter
pub trait MobileWalletFactory: Send + Sync {
    fn create(
        &self,
        identity: &AppIdentity,
        cluster: Cluster,
    ) -> Result<Arc<dyn WalletAdapter>, SignerError>;
}

#[derive(Default)]
pub struct WalletAggregator {
    registry: Option<Arc<dyn WalletRegistry>>,
    mobile_factory: Option<Arc<dyn MobileWalletFactory>>,
    is_mobile: bool,
    identity: AppIdentity,
}

impl WalletAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_registry(mut self, registry: Arc<dyn WalletRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Inject a mobile adapter when `is_mobile` holds and none is present
    #[must_use]
    pub fn with_mobile_factory(
        mut self,
        factory: Arc<dyn MobileWalletFactory>,
        is_mobile: bool,
    ) -> Self {
        self.mobile_factory = Some(factory);
        self.is_mobile = is_mobile;
        self
    }

    #[must_use]
    pub fn with_app_identity(mut self, identity: AppIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Caller-supplied adapters followed by newly discovered ones
    ///
    /// Without a registry the caller's adapters are returned unchanged.
    /// Discovered wallets are dropped when incompatible or when their name is
    /// already taken.
    pub fn aggregate(
        &self,
        adapters: Vec<Arc<dyn WalletAdapter>>,
        endpoint: Option<&str>,
    ) -> Vec<Arc<dyn WalletAdapter>> {
        let Some(registry) = &self.registry else {
            return adapters;
        };

        let cluster = Cluster::infer_from_endpoint(endpoint);
        let mut names: HashSet<String> = adapters.iter().map(|a| a.name().to_string()).collect();
        let mut merged = adapters;

        for wallet in registry.get() {
            if names.contains(wallet.name()) {
                log::debug!("Skipping discovered wallet {}: name already present", wallet.name());
                continue;
            }
            if !is_wallet_adapter_compatible(&wallet.features()) {
                log::debug!("Skipping discovered wallet {}: missing required features", wallet.name());
                continue;
            }
            match StandardWalletAdapter::new(wallet) {
                Ok(adapter) => {
                    names.insert(adapter.name().to_string());
                    merged.push(Arc::new(adapter.with_cluster(cluster)));
                }
                Err(e) => log::debug!("Skipping discovered wallet: {e}"),
            }
        }

        if self.is_mobile && !names.contains(MOBILE_WALLET_ADAPTER_NAME) {
            if let Some(adapter) = self.mobile_adapter(cluster) {
                merged.push(adapter);
            }
        }
        merged
    }

    fn mobile_adapter(&self, cluster: Cluster) -> Option<Arc<dyn WalletAdapter>> {
        let factory = self.mobile_factory.as_ref()?;
        match factory.create(&self.identity, cluster) {
            Ok(adapter) => {
                log::debug!("Injecting {MOBILE_WALLET_ADAPTER_NAME} for {cluster}");
                Some(adapter)
            }
            Err(e) => {
                log::warn!("{MOBILE_WALLET_ADAPTER_NAME} unavailable: {e}");
                None
            }
        }
    }
}
