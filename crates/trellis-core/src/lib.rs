pub mod config;
pub mod error;
pub mod types;

pub use config::TrellisConfig;
pub use error::{ErrorKind, Result, TrellisError};
pub use types::*;
