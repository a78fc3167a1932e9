//! Domain data types shared across the crate.

pub mod interaction;
pub mod order;
pub mod permit;

pub use interaction::*;
pub use order::*;
pub use permit::*;
