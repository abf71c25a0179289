// Padmap Configuration
// TOML config loading for startup, coalescing and mapping profiles

pub mod parser;

pub use parser::{default_config_content, parse_flush_interval, Config, ConfigError};
