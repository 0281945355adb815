//! Shared utilities and common types for the ticketing backend.
//!
//! This crate provides common functionality used across all other crates:
//! - Booking input validation (quantities, prices, booking windows)
//! - Keyset cursor encoding for ticket listings

pub mod pagination;
pub mod validation;
