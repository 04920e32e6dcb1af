//! Chainledger Transaction Normalization & Reconciliation Engine
//!
//! Ingests on-chain webhook payloads and centralized-exchange records,
//! normalizes both into one canonical ledger of typed transactions and
//! directional asset flows, reconciles cross-source duplicates, and
//! backfills missing USD valuations.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod persistence;
pub mod secrets;
