use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// A route definition that cannot be turned into output targets.
    #[error("Invalid route: {0}")]
    InvalidRoute(String),

    #[error("No route matches path '{0}'")]
    NoMatch(String),

    /// A loader on one of the matched routes failed.
    #[error("Loader failed for '{route}': {message}")]
    Loader { route: String, message: String },

    #[error("Serialization error: {0}")]
    Serialize(String),
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::ConfigParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
