//! Configuration utilities.

pub mod preflight;
pub mod settings;

pub use preflight::{resolve_ai_config, AiConfig, Provider};
pub use settings::Settings;
