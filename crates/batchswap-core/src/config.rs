//! Environment-driven configuration.
//!
//! Settings come from environment variables, with `.env` files picked
//! up automatically:
//!
//! - `BATCHSWAP_RPC_URL` — JSON-RPC endpoint (optional, offline
//!   otherwise)
//! - `BATCHSWAP_CHAIN_ID` — chain id (defaults to mainnet)
//! - `BATCHSWAP_SETTLEMENT_CONTRACT` — settlement contract address
//! - `WALLET_PRIVATE_KEY` — signing key for the local wallet

use std::env;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use serde::Deserialize;
use tracing::info;

use crate::api::RpcClient;
use crate::error::{Error, Result};
use crate::signing::domain::{settlement_domain, MAINNET_CHAIN_ID};
use crate::signing::typed_data::TypedDataDomain;
use crate::signing::wallet::{LocalWallet, Provider, Wallet};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub rpc: RpcConfig,
    pub chain: ChainConfig,
    pub wallet: WalletConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RpcConfig {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub settlement_contract: Option<Address>,
}

#[derive(Clone, Deserialize)]
pub struct WalletConfig {
    pub private_key: Option<String>,
}

impl fmt::Debug for WalletConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The key itself stays out of logs.
        f.debug_struct("WalletConfig")
            .field("private_key", &self.private_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let chain_id = match env::var("BATCHSWAP_CHAIN_ID") {
            Ok(raw) => raw.parse().map_err(|_| Error::Config {
                message: format!("invalid BATCHSWAP_CHAIN_ID value {raw}"),
            })?,
            Err(_) => MAINNET_CHAIN_ID,
        };

        let settlement_contract = match env::var("BATCHSWAP_SETTLEMENT_CONTRACT") {
            Ok(raw) => Some(raw.parse().map_err(|_| Error::Config {
                message: format!("invalid BATCHSWAP_SETTLEMENT_CONTRACT value {raw}"),
            })?),
            Err(_) => None,
        };

        let config = Self {
            rpc: RpcConfig {
                url: env::var("BATCHSWAP_RPC_URL").ok(),
            },
            chain: ChainConfig {
                chain_id,
                settlement_contract,
            },
            wallet: WalletConfig {
                private_key: env::var("WALLET_PRIVATE_KEY").ok(),
            },
        };
        info!(chain_id = config.chain.chain_id, "Loaded configuration");
        Ok(config)
    }

    /// The signing domain of the configured settlement contract.
    pub fn settlement_domain(&self) -> Result<TypedDataDomain> {
        let contract = self.chain.settlement_contract.ok_or_else(|| Error::Config {
            message: "BATCHSWAP_SETTLEMENT_CONTRACT is not configured".to_string(),
        })?;
        Ok(settlement_domain(self.chain.chain_id, contract))
    }

    pub fn rpc_client(&self) -> Result<RpcClient> {
        let url = self.rpc.url.as_deref().ok_or_else(|| Error::Config {
            message: "BATCHSWAP_RPC_URL is not configured".to_string(),
        })?;
        Ok(RpcClient::new(url))
    }

    /// A live provider when an RPC endpoint is configured, otherwise
    /// an offline one carrying the configured chain id.
    pub fn provider(&self) -> Provider {
        match &self.rpc.url {
            Some(url) => Provider::Rpc(Arc::new(RpcClient::new(url.clone()))),
            None => Provider::Offline {
                chain_id: self.chain.chain_id,
            },
        }
    }

    /// The configured signing wallet with its provider attached.
    pub fn wallet(&self) -> Result<Wallet> {
        let private_key = self.wallet.private_key.as_deref().ok_or_else(|| Error::Config {
            message: "WALLET_PRIVATE_KEY is not configured".to_string(),
        })?;
        let local = LocalWallet::from_private_key(private_key)?.with_provider(self.provider());
        Ok(Wallet::local(local))
    }

    #[cfg(test)]
    pub fn test_config() -> Self {
        Self {
            rpc: RpcConfig { url: None },
            chain: ChainConfig {
                chain_id: 31337,
                settlement_contract: None,
            },
            wallet: WalletConfig { private_key: None },
        }
    }
}
