//! Herald Push Delivery
//!
//! FCM HTTP v1 transport and the fan-out dispatcher that delivers one
//! payload to many device tokens with bounded parallelism.

mod classify;
mod dispatcher;
mod error;
mod fcm;
mod traits;

pub use classify::*;
pub use dispatcher::*;
pub use error::*;
pub use fcm::*;
pub use traits::*;
