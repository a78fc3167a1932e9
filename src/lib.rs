//! Batchswap: off-chain order signing and settlement encoding.
//!
//! This is the root crate that provides benchmark and integration test
//! access to the internal modules. For actual functionality, use
//! `batchswap-core` directly:
//!
//! - `signing`: EIP-712 hashing, wallet capabilities, order signatures
//! - `types`: orders, interactions, ERC-2612 permits
//! - `settlement`: batch settlement encoding

// Re-export for benchmarks
pub use batchswap_core as core;
