//! 顺序执行协调器

mod coordinator;

pub use coordinator::{ExecutionCoordinator, ExecutionReport, StepExecutionResult};
