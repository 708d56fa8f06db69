//! Sink implementations

pub mod console;
pub mod remote;
pub mod rotating;

pub use console::ConsoleSink;
pub use remote::{RemoteSink, Transport};
pub use rotating::{RotatingFileSink, RotationPolicy, RotationStrategy};

// Re-export the trait next to its implementations
pub use crate::core::Sink;
