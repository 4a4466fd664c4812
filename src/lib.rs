//! ForgeChain - consensus core of a proof-of-work account chain
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Blockchain
//! - [`transaction`] - Transaction construction, hashing, signing and validation
//! - [`merkle`] - Merkle commitment over ordered transactions
//! - [`blockchain`] - Block structure, account state and block verification
//! - [`mempool`] - Pending transaction pool
//!
//! ## Consensus & Mining
//! - [`miner`] - Task assembly and the parallel proof-of-work search
//! - [`economics`] - Block reward schedule
//!
//! ## Cryptography
//! - [`crypto`] - Addresses and recoverable signatures (secp256k1)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Blockchain
// ============================================================================
pub mod blockchain;
pub mod mempool;
pub mod merkle;
pub mod transaction;

// ============================================================================
// Consensus & Mining
// ============================================================================
pub mod economics;
pub mod miner;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
