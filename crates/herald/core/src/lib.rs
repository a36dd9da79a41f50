//! Herald Core Types
//!
//! Domain types shared by the device token registry, the fan-out dispatcher
//! and the broadcast orchestrator.

mod error;
mod outcome;
mod payload;
mod platform;
mod token;

pub use error::*;
pub use outcome::*;
pub use payload::*;
pub use platform::*;
pub use token::*;
