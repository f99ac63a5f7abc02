// Application layer - the queue state machine built on top of the domain
// model and the KV store port.

pub mod convoy;
pub mod queue;
pub mod worker;

pub use convoy::Convoy;
pub use queue::Queue;
pub use worker::{JobOutcome, Worker};
