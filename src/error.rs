pub use crate::types::{ConfigError, NescError};

pub type Result<T> = std::result::Result<T, NescError>;
