//! Message broker implementations.

pub mod memory;

pub use memory::InMemoryBroker;
