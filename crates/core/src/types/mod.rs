//! Core types for the back-office.
//!
//! This module provides type-safe wrappers for the access-control domain.

pub mod email;
pub mod id;
pub mod profile;
pub mod request;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use profile::{Profile, ProfileUpsert};
pub use request::{AdminRequest, NewAdminRequest};
pub use role::{AdminLevel, RequestStatus, Role, UnknownVariant};
