// Configuration management module
// Defaults, optional TOML file, then PORT/HOST from the environment

pub mod settings;

pub use settings::{Config, ConfigError, ServerConfig};
