//! Request-scoped models for the back-office.

pub mod principal;

pub use principal::{AccessContext, Principal};
