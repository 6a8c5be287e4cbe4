pub mod config;
pub mod error;
pub mod types;

pub use config::DocmindConfig;
pub use error::{DocmindError, Result};
pub use types::*;
