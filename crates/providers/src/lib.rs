//! The LLM Gateway: a single flash-class model family behind a narrow,
//! provider-agnostic trait.

pub mod auth;
pub mod error;
pub mod flash;
pub mod traits;
pub(crate) mod util;

pub use error::GatewayError;
pub use flash::FlashProvider;
pub use traits::{GenerateTextResult, GenerateWithToolsResult, LlmProvider, ProviderToolCall};
