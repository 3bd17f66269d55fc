pub mod engine;
pub mod journal;
pub mod planner;
pub mod service;

pub use engine::ExecutionEngine;
pub use journal::ExecutionJournal;
pub use planner::{ExecutionPlan, ExecutionPlanner, SequentialPlanner};
pub use service::ExecutionService;
