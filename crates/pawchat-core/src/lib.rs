pub mod config;
pub mod error;
pub mod types;

pub use config::PawchatConfig;
pub use error::{PawchatError, Result};
pub use types::*;
