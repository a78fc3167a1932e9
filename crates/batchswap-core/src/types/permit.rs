//! ERC-2612 permit signing and call encoding.
//!
//! A signed permit lets the settlement contract move a trader's tokens
//! without a prior on-chain approval. The permit is signed off-chain
//! against the token's own EIP-712 domain and bundled into the
//! settlement as a pre-interaction.

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::Result;
use crate::signing::typed_data::{
    signing_digest, EcdsaSignature, TypedDataDomain, TypedDataField, TypedDataTypes,
};

use super::interaction::Interaction;

/// Selector of `permit(address,address,uint256,uint256,uint8,bytes32,bytes32)`.
pub const PERMIT_SELECTOR: [u8; 4] = [0xd5, 0x05, 0xac, 0xcf];

/// An ERC-2612 permit message for a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPermit {
    pub owner: Address,
    pub spender: Address,
    pub value: U256,
    pub nonce: U256,
    pub deadline: U256,
}

impl TokenPermit {
    /// The EIP-712 struct type of a permit.
    pub fn typed_data_types() -> TypedDataTypes {
        TypedDataTypes::new().with_type(
            "Permit",
            vec![
                TypedDataField::new("owner", "address"),
                TypedDataField::new("spender", "address"),
                TypedDataField::new("value", "uint256"),
                TypedDataField::new("nonce", "uint256"),
                TypedDataField::new("deadline", "uint256"),
            ],
        )
    }

    /// The signing domain of an ERC-2612 token. Standard tokens use
    /// their own name with version "1".
    pub fn domain(token_name: &str, chain_id: u64, token: Address) -> TypedDataDomain {
        TypedDataDomain::new()
            .with_name(token_name)
            .with_version("1")
            .with_chain_id(chain_id)
            .with_verifying_contract(token)
    }

    /// The permit as a typed data value record.
    pub fn typed_value(&self) -> Value {
        json!({
            "owner": self.owner,
            "spender": self.spender,
            "value": self.value.to_string(),
            "nonce": self.nonce.to_string(),
            "deadline": self.deadline.to_string(),
        })
    }

    /// The digest the token owner signs.
    pub fn signing_digest(&self, domain: &TypedDataDomain) -> Result<B256> {
        signing_digest(domain, &Self::typed_data_types(), &self.typed_value())
    }

    /// ABI-encode the `permit` call carrying the owner's signature.
    pub fn encode_call(&self, signature: &EcdsaSignature) -> Bytes {
        let mut data = Vec::with_capacity(4 + 32 * 7);
        data.extend_from_slice(&PERMIT_SELECTOR);
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(self.owner.as_slice());
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(self.spender.as_slice());
        data.extend_from_slice(&self.value.to_be_bytes::<32>());
        data.extend_from_slice(&self.deadline.to_be_bytes::<32>());
        data.extend_from_slice(&[0u8; 31]);
        data.push(signature.v);
        data.extend_from_slice(signature.r.as_slice());
        data.extend_from_slice(signature.s.as_slice());
        Bytes::from(data)
    }

    /// Package the signed permit as a settlement interaction against
    /// the token contract.
    pub fn into_interaction(self, token: Address, signature: &EcdsaSignature) -> Interaction {
        debug!(
            token = %token,
            owner = %self.owner,
            spender = %self.spender,
            "Encoding permit interaction"
        );
        Interaction::new(token, self.encode_call(signature))
    }
}
