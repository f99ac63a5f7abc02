// Convoy Core - Domain Logic & Ports
// NO infrastructure dependencies: the KV backend lives in its own adapter crate.

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use error::{ConvoyError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
