//! Network-facing clients.

pub mod rpc;

pub use rpc::RpcClient;
