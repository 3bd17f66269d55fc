pub mod builtin;
pub mod catalog;
pub mod connectors;
pub mod registry;
pub mod schema;

pub use builtin::BuiltinAgent;
pub use catalog::ExampleWorkflow;
pub use registry::{AgentFactory, AgentRegistry, RegisteredAgent};
