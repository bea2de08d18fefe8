//! Domain models

pub mod module;
pub mod types;

pub use module::{Module, ModuleInfo};
pub use types::{CallbackHandle, ExecutionResult, OutputLine, StreamEvent, StreamKind};
