//! Wallet variants and capability classification.
//!
//! Every signer the crate works with is one of a closed set of
//! [`Wallet`] variants, so "can this wallet sign typed data" and "is
//! this wallet backed by a raw JSON-RPC transport" are pattern matches
//! over tags rather than structural probes. The narrowing accessors
//! return the capability itself: a `Some` is the proof, and callers
//! never hold a positive answer for an operation the value cannot
//! perform.

use std::env;
use std::fmt;
use std::sync::Arc;

use alloy_primitives::{Address, B256};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::api::rpc::parse_quantity;
use crate::error::{Error, Result};

use super::typed_data::{
    signing_digest, EcdsaSignature, TypedDataDomain, TypedDataPayload, TypedDataTypes,
};

/// A raw JSON-RPC transport: any method name, JSON params in, JSON
/// result out.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, method: &str, params: Value) -> Result<Value>;
}

/// A signer that can produce EIP-712 typed data signatures.
#[async_trait]
pub trait TypedDataSigner: Send + Sync {
    /// The address signatures recover to.
    fn address(&self) -> Address;

    /// Sign the typed data digest of `value` under `domain`.
    async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<EcdsaSignature>;
}

/// What a wallet can sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerCapability {
    /// Address holder only.
    Basic,
    /// Full EIP-712 typed data signing.
    TypedData,
}

/// What an attached provider can do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderCapability {
    /// Static chain metadata only.
    Basic,
    /// Arbitrary JSON-RPC methods.
    RawRpc,
}

/// Chain access attached to a wallet.
#[derive(Clone)]
pub enum Provider {
    /// A live JSON-RPC transport.
    Rpc(Arc<dyn RpcTransport>),
    /// No transport, just static chain metadata.
    Offline { chain_id: u64 },
}

impl Provider {
    pub fn capability(&self) -> ProviderCapability {
        match self {
            Provider::Rpc(_) => ProviderCapability::RawRpc,
            Provider::Offline { .. } => ProviderCapability::Basic,
        }
    }

    /// The raw transport, if this provider has one.
    pub fn raw(&self) -> Option<&dyn RpcTransport> {
        match self {
            Provider::Rpc(transport) => Some(transport.as_ref()),
            Provider::Offline { .. } => None,
        }
    }

    /// The chain id, from metadata or from the node.
    pub async fn chain_id(&self) -> Result<u64> {
        match self {
            Provider::Rpc(transport) => {
                let result = transport.send("eth_chainId", json!([])).await?;
                parse_quantity(&result)
            }
            Provider::Offline { chain_id } => Ok(*chain_id),
        }
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Rpc(_) => f.write_str("Provider::Rpc"),
            Provider::Offline { chain_id } => f
                .debug_struct("Provider::Offline")
                .field("chain_id", chain_id)
                .finish(),
        }
    }
}

/// A wallet holding its private key in memory.
#[derive(Clone)]
pub struct LocalWallet {
    signer: PrivateKeySigner,
    address: Address,
    provider: Option<Provider>,
}

impl LocalWallet {
    pub fn new(signer: PrivateKeySigner) -> Self {
        let address = signer.address();
        Self {
            signer,
            address,
            provider: None,
        }
    }

    /// Attach a provider.
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Load a wallet from a hex private key, with or without the `0x`
    /// prefix.
    pub fn from_private_key(private_key: &str) -> Result<Self> {
        let trimmed = private_key.trim().trim_start_matches("0x");
        let signer: PrivateKeySigner = trimmed.parse().map_err(|e| Error::Config {
            message: format!("invalid private key: {e}"),
        })?;
        Ok(Self::new(signer))
    }

    /// Load a wallet from the `WALLET_PRIVATE_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let private_key = env::var("WALLET_PRIVATE_KEY").map_err(|_| Error::Config {
            message: "WALLET_PRIVATE_KEY environment variable not set".to_string(),
        })?;
        Self::from_private_key(&private_key)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// The checksummed address string.
    pub fn address_string(&self) -> String {
        self.address.to_string()
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }

    /// Sign a 32-byte digest directly.
    pub async fn sign_digest(&self, digest: B256) -> Result<EcdsaSignature> {
        let signature = self.signer.sign_hash(&digest).await?;
        Ok(EcdsaSignature::from(signature))
    }

    /// Sign a message with the EIP-191 personal message prefix.
    pub async fn sign_message(&self, message: &[u8]) -> Result<EcdsaSignature> {
        let signature = self.signer.sign_message(message).await?;
        Ok(EcdsaSignature::from(signature))
    }
}

impl fmt::Debug for LocalWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The private key stays out of logs.
        f.debug_struct("LocalWallet")
            .field("address", &self.address)
            .field("provider", &self.provider)
            .finish()
    }
}

#[async_trait]
impl TypedDataSigner for LocalWallet {
    fn address(&self) -> Address {
        self.address
    }

    async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<EcdsaSignature> {
        let digest = signing_digest(domain, types, value)?;
        self.sign_digest(digest).await
    }
}

/// A wallet whose key lives behind a JSON-RPC node. Signing requests
/// are forwarded over the transport to the node-managed account.
#[derive(Clone)]
pub struct RemoteWallet {
    account: Address,
    transport: Arc<dyn RpcTransport>,
}

impl RemoteWallet {
    pub fn new(account: Address, transport: Arc<dyn RpcTransport>) -> Self {
        Self { account, transport }
    }

    pub fn address(&self) -> Address {
        self.account
    }

    /// Sign typed data via `eth_signTypedData_v4`.
    pub async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<EcdsaSignature> {
        let payload = TypedDataPayload::new(domain, types, value)?;
        debug!(
            account = %self.account,
            primary_type = %payload.primary_type,
            "Requesting typed data signature from node"
        );
        let params = json!([self.account, serde_json::to_string(&payload)?]);
        let result = self.transport.send("eth_signTypedData_v4", params).await?;
        parse_signature_result(&result)
    }

    /// Sign a message via `eth_sign`. The node applies the EIP-191
    /// personal message prefix.
    pub async fn sign_message(&self, message: &[u8]) -> Result<EcdsaSignature> {
        let params = json!([self.account, format!("0x{}", hex::encode(message))]);
        let result = self.transport.send("eth_sign", params).await?;
        parse_signature_result(&result)
    }
}

impl fmt::Debug for RemoteWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteWallet")
            .field("account", &self.account)
            .finish()
    }
}

#[async_trait]
impl TypedDataSigner for RemoteWallet {
    fn address(&self) -> Address {
        self.account
    }

    async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<EcdsaSignature> {
        RemoteWallet::sign_typed_data(self, domain, types, value).await
    }
}

fn parse_signature_result(result: &Value) -> Result<EcdsaSignature> {
    let hex_str = result.as_str().ok_or_else(|| {
        Error::signature(format!("node returned a non-string signature: {result}"))
    })?;
    EcdsaSignature::from_hex(hex_str)
}

/// An address being observed without any signing key.
#[derive(Debug, Clone)]
pub struct WatchWallet {
    address: Address,
    provider: Option<Provider>,
}

impl WatchWallet {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn provider(&self) -> Option<&Provider> {
        self.provider.as_ref()
    }
}

/// The closed set of wallet variants the crate operates on.
///
/// Adding a variant forces every capability match below to name it, so
/// a new kind of wallet cannot silently claim capabilities it does not
/// have.
#[derive(Debug, Clone)]
pub enum Wallet {
    Local(LocalWallet),
    Remote(RemoteWallet),
    WatchOnly(WatchWallet),
}

impl Wallet {
    pub fn local(wallet: LocalWallet) -> Self {
        Wallet::Local(wallet)
    }

    pub fn remote(account: Address, transport: Arc<dyn RpcTransport>) -> Self {
        Wallet::Remote(RemoteWallet::new(account, transport))
    }

    pub fn watch_only(wallet: WatchWallet) -> Self {
        Wallet::WatchOnly(wallet)
    }

    pub fn address(&self) -> Address {
        match self {
            Wallet::Local(wallet) => wallet.address(),
            Wallet::Remote(wallet) => wallet.address(),
            Wallet::WatchOnly(wallet) => wallet.address(),
        }
    }

    /// A short human-readable tag for error messages and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Wallet::Local(_) => "local",
            Wallet::Remote(_) => "remote",
            Wallet::WatchOnly(_) => "watch-only",
        }
    }

    pub fn signer_capability(&self) -> SignerCapability {
        match self {
            Wallet::Local(_) | Wallet::Remote(_) => SignerCapability::TypedData,
            Wallet::WatchOnly(_) => SignerCapability::Basic,
        }
    }

    /// The capability of the attached provider, if any.
    pub fn provider_capability(&self) -> Option<ProviderCapability> {
        match self {
            Wallet::Local(wallet) => wallet.provider().map(Provider::capability),
            Wallet::Remote(_) => Some(ProviderCapability::RawRpc),
            Wallet::WatchOnly(wallet) => wallet.provider().map(Provider::capability),
        }
    }

    /// The attached provider, if any. A remote wallet's provider is
    /// its own signing transport.
    pub fn provider(&self) -> Option<Provider> {
        match self {
            Wallet::Local(wallet) => wallet.provider().cloned(),
            Wallet::Remote(wallet) => Some(Provider::Rpc(Arc::clone(&wallet.transport))),
            Wallet::WatchOnly(wallet) => wallet.provider().cloned(),
        }
    }

    /// Whether this wallet can sign EIP-712 typed data.
    pub fn is_typed_data_signer(&self) -> bool {
        matches!(self.signer_capability(), SignerCapability::TypedData)
    }

    /// Whether this wallet is backed by a raw JSON-RPC transport:
    /// a provider is attached and accepts arbitrary methods.
    pub fn is_json_rpc_signer_like(&self) -> bool {
        matches!(
            self.provider_capability(),
            Some(ProviderCapability::RawRpc)
        )
    }

    /// Narrow to the typed data signing capability. `Some` is the
    /// proof that [`Wallet::sign_typed_data`] will not be rejected.
    pub fn typed_data_signer(&self) -> Option<&dyn TypedDataSigner> {
        match self {
            Wallet::Local(wallet) => Some(wallet),
            Wallet::Remote(wallet) => Some(wallet),
            Wallet::WatchOnly(_) => None,
        }
    }

    /// Narrow to the raw transport of the attached provider.
    pub fn raw_provider(&self) -> Option<&dyn RpcTransport> {
        match self {
            Wallet::Local(wallet) => wallet.provider().and_then(Provider::raw),
            Wallet::Remote(wallet) => Some(wallet.transport.as_ref()),
            Wallet::WatchOnly(wallet) => wallet.provider().and_then(Provider::raw),
        }
    }

    /// Sign typed data, or fail by name for wallets that cannot.
    pub async fn sign_typed_data(
        &self,
        domain: &TypedDataDomain,
        types: &TypedDataTypes,
        value: &Value,
    ) -> Result<EcdsaSignature> {
        match self.typed_data_signer() {
            Some(signer) => signer.sign_typed_data(domain, types, value).await,
            None => Err(Error::UnsupportedSigner { kind: self.kind() }),
        }
    }

    /// Sign an EIP-191 personal message, or fail by name.
    pub async fn sign_message(&self, message: &[u8]) -> Result<EcdsaSignature> {
        match self {
            Wallet::Local(wallet) => wallet.sign_message(message).await,
            Wallet::Remote(wallet) => wallet.sign_message(message).await,
            Wallet::WatchOnly(_) => Err(Error::UnsupportedSigner { kind: self.kind() }),
        }
    }
}
