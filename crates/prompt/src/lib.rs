//! The Prompt Renderer: named-placeholder templates over a context map,
//! plus the two context builders the pipeline consumes.

pub mod context;
pub mod renderer;

pub use context::{cleaner_context, function_caller_context};
pub use renderer::Template;
