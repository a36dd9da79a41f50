//! Herald Agent
//!
//! Device-side push client: registers the device token with the server and
//! dispatches native push events to typed handlers.

pub mod channel;
pub mod client;
pub mod events;
pub mod handler;

pub use channel::{NativePlatform, PushChannel};
pub use client::{ClientConfig, RegistrationClient};
pub use events::*;
pub use handler::DefaultHandler;
