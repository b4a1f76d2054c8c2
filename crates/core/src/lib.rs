pub mod config;
pub mod error;
pub mod types;

pub use config::{parse_manifest, parse_manifest_str};
pub use error::{Error, Result};
pub use types::*;
