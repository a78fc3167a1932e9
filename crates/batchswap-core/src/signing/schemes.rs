//! Order signing schemes.
//!
//! Orders can be authorized either with a plain EIP-712 signature over
//! the order digest, or with an EIP-191 personal message signature
//! over the same digest for wallets that only expose `eth_sign` style
//! signing.

use alloy_primitives::{keccak256, Address, B256};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::types::Order;

use super::typed_data::{EcdsaSignature, TypedDataDomain};
use super::wallet::Wallet;

/// How an order signature was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SigningScheme {
    Eip712,
    EthSign,
}

impl SigningScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningScheme::Eip712 => "eip712",
            SigningScheme::EthSign => "ethsign",
        }
    }
}

/// A signature together with the scheme needed to verify it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSignature {
    pub scheme: SigningScheme,
    pub signature: EcdsaSignature,
}

impl OrderSignature {
    /// The packed 65-byte signature bytes.
    pub fn to_bytes(&self) -> [u8; 65] {
        self.signature.to_bytes()
    }
}

/// Sign an order under the given scheme.
///
/// Wallets without the required signing capability fail by name, never
/// with a generic error.
pub async fn sign_order(
    wallet: &Wallet,
    domain: &TypedDataDomain,
    order: &Order,
    scheme: SigningScheme,
) -> Result<OrderSignature> {
    let signature = match scheme {
        SigningScheme::Eip712 => {
            wallet
                .sign_typed_data(domain, &Order::typed_data_types(), &order.typed_value())
                .await?
        }
        SigningScheme::EthSign => {
            let digest = order.signing_digest(domain)?;
            wallet.sign_message(digest.as_slice()).await?
        }
    };
    Ok(OrderSignature { scheme, signature })
}

/// Recover the address that signed an order.
pub fn recover_order_signer(
    domain: &TypedDataDomain,
    order: &Order,
    signature: &OrderSignature,
) -> Result<Address> {
    let digest = order.signing_digest(domain)?;
    let prehash = match signature.scheme {
        SigningScheme::Eip712 => digest,
        SigningScheme::EthSign => personal_message_digest(digest.as_slice()),
    };
    signature.signature.recover(prehash)
}

/// The EIP-191 personal message digest:
/// `keccak256("\x19Ethereum Signed Message:\n" + len + message)`.
pub fn personal_message_digest(message: &[u8]) -> B256 {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    keccak256([prefix.as_bytes(), message].concat())
}
