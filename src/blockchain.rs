// Thin re-export module: implementation is in `blockchain/core.rs`, split into
// block structure, account state and block verification.

pub mod core;
pub use core::*;
