#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli::{CliConfig, Command};
pub use toml_config::TomlConfig;

pub const DEFAULT_HANDOFF_MAX_AGE_SECS: u64 = 30 * 60;
