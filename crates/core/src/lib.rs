//! Agency Core - Shared access-control types.
//!
//! This crate provides the types and pure rules used by every back-office component:
//! - `backoffice` - Internal back-office API (profiles, access requests)
//! - `cli` - Command-line tools for migrations and inspection
//!
//! # Architecture
//!
//! The core crate contains only types and rules - no I/O, no database access,
//! no HTTP clients. Capability derivation and role assignment policy live here so
//! that they can be evaluated identically wherever a decision is made.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, roles, profiles and access requests
//! - [`access`] - Permission classifier and role assignment policy

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod types;

pub use access::*;
pub use types::*;
