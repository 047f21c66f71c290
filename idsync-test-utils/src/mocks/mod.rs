//! Mock implementations for testing

pub mod gateway;
pub mod source;

pub use gateway::MockGateway;
pub use source::MemoryRowSource;
