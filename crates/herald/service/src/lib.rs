//! Herald Service Layer
//!
//! Broadcast orchestration and device registration.

mod broadcast;
mod registration;
mod traits;

pub use broadcast::*;
pub use registration::RegistrationService;
pub use traits::*;
