//! Tool declaration, registration, and dispatch.

mod dispatch;
mod errors;
mod registry;
mod types;

pub use dispatch::{Dispatcher, validate_args};
pub use errors::ToolError;
pub use registry::{RegisteredTool, ToolHandler, ToolRegistry};
pub use types::{ArgSpec, ArgType, ToolArgs, ToolResult, ToolSpec};
