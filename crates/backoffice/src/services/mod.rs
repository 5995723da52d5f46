//! Business logic services for the back-office.
//!
//! # Services
//!
//! - `access` - Identity resolution and the access request workflow

pub mod access;

pub use access::{
    AccessError, AccessRequestService, IdentityResolver, RequestLookup, SubmitAccessRequest,
};
