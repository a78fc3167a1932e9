//! EIP-712 domain parameters for the settlement contract.

use alloy_primitives::Address;

use super::typed_data::TypedDataDomain;

/// Domain name every settlement deployment signs under.
pub const DOMAIN_NAME: &str = "Batchswap Protocol";

/// Domain version of the current settlement contract generation.
pub const DOMAIN_VERSION: &str = "2";

pub const MAINNET_CHAIN_ID: u64 = 1;
pub const GNOSIS_CHAIN_ID: u64 = 100;
pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

/// The signing domain of a settlement contract deployment.
///
/// The same contract address yields different domains on different
/// chains, so signatures cannot be replayed across networks.
pub fn settlement_domain(chain_id: u64, settlement_contract: Address) -> TypedDataDomain {
    TypedDataDomain::new()
        .with_name(DOMAIN_NAME)
        .with_version(DOMAIN_VERSION)
        .with_chain_id(chain_id)
        .with_verifying_contract(settlement_contract)
}
