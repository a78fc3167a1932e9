//! Order signing and EIP-712 typed data hashing.
//!
//! This module covers everything between a wallet and a signed order:
//! dynamic EIP-712 hashing, the closed set of wallet variants with
//! their capabilities, and the order signing schemes.
//!
//! # Architecture
//!
//! ```text
//! Wallet (Local / Remote / WatchOnly)
//!       │
//!       ▼
//! TypedDataSigner ─── hashes via ──► typed_data (EIP-712)
//!       │                                 │
//!       ▼                                 ▼
//! sign_order ──── scheme ────► OrderSignature
//!       │       (eip712 / ethsign)        │
//!       ▼                                 ▼
//! SettlementEncoder            recover_order_signer
//! ```
//!
//! # Example
//!
//! ```ignore
//! use batchswap_core::signing::{
//!     settlement_domain, sign_order, SigningScheme, Wallet,
//! };
//! use batchswap_core::signing::wallet::LocalWallet;
//!
//! // Load the signing key and the deployment domain
//! let wallet = Wallet::local(LocalWallet::from_env()?);
//! let domain = settlement_domain(1, settlement_contract);
//!
//! // Sign an order and check the signature inverts
//! let signature = sign_order(&wallet, &domain, &order, SigningScheme::Eip712).await?;
//! let signer = recover_order_signer(&domain, &order, &signature)?;
//! assert_eq!(signer, wallet.address());
//! ```

pub mod domain;
pub mod schemes;
pub mod typed_data;
pub mod wallet;

pub use domain::{
    settlement_domain, DOMAIN_NAME, DOMAIN_VERSION, GNOSIS_CHAIN_ID, MAINNET_CHAIN_ID,
    SEPOLIA_CHAIN_ID,
};

pub use schemes::{
    personal_message_digest, recover_order_signer, sign_order, OrderSignature, SigningScheme,
};

pub use typed_data::{
    eip712_digest, signing_digest, EcdsaSignature, TypedDataDomain, TypedDataField,
    TypedDataPayload, TypedDataTypes,
};

pub use wallet::{
    LocalWallet, Provider, ProviderCapability, RemoteWallet, RpcTransport, SignerCapability,
    TypedDataSigner, Wallet, WatchWallet,
};
