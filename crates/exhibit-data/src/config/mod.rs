//! Engine configuration module

pub mod engine_config;
pub mod undefined_tokens;

pub use engine_config::*;
pub use undefined_tokens::*;
