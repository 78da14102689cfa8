//! Logging abstractions
//!
//! The session, transport, and engine all log through the [`Logger`] trait
//! so embedders can route messages wherever they like (host application log,
//! output channel, nothing at all in tests).

mod traits;
mod console;
mod noop;

pub use traits::{Logger, SharedLogger};
pub use console::ConsoleLogger;
pub use noop::NoOpLogger;
