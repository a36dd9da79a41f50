//! Herald Credentials
//!
//! Turns a service-account secret into a short-lived bearer token for the
//! FCM HTTP v1 API.

mod account;
mod error;
mod provider;

pub use account::*;
pub use error::*;
pub use provider::*;
