//! Shared mocks and fixtures for SuperAgent tests.

pub mod fixtures;
pub mod mock_agent;

pub use fixtures::*;
pub use mock_agent::{CallLog, MockAgent};
