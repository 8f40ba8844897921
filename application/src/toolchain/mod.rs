//! Tool invocation pipeline and the registry it dispatches against.

pub mod pipeline;
pub mod registry;

pub use pipeline::Toolchain;
pub use registry::{RegisteredTool, RegistryError, ToolBox};
