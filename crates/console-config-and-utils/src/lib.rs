//! Configuration, paths, credential storage and logging setup shared by the
//! bot console crates.

mod config;
mod error;
mod logging;
mod paths;
mod token_store;

pub use config::{Config, DEFAULT_LOG_LEVEL, DEFAULT_SERVER_ORIGIN};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
pub use token_store::TokenStore;
