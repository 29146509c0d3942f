// src/lib.rs
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod output;
pub mod producer;
pub mod resolver;
pub mod types;

pub use cli::Args;
pub use engine::BruteForceEngine;
pub use resolver::{HostLookup, ResolutionEnvironment};
pub use types::{Config, ConfigError, EnumerationStats, NescError, Options, Protocol, ResolutionResult};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
