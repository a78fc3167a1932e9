//! Core library for off-chain order flow against the Batchswap
//! settlement contract.
//!
//! The crate covers the path from a user's intent to settlement call
//! data:
//!
//! - [`signing`] — EIP-712 typed data hashing, wallet variants and
//!   their capabilities, order signing schemes
//! - [`types`] — orders, interactions and ERC-2612 permits
//! - [`settlement`] — batch encoding against clearing prices
//! - [`api`] — JSON-RPC client
//! - [`config`] — environment-driven setup

pub mod api;
pub mod config;
pub mod error;
pub mod settlement;
pub mod signing;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
