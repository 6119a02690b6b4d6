use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    /// Underlying cache storage failure.
    #[error("Cache storage error: {0}")]
    Storage(#[from] bridge_traits::BridgeError),

    /// Router or lifecycle configuration is invalid.
    #[error("Invalid cache configuration: {0}")]
    InvalidConfig(String),

    /// Lifecycle transition requested from the wrong state.
    #[error("Invalid lifecycle transition: {0}")]
    InvalidTransition(String),
}

pub type Result<T> = std::result::Result<T, CacheError>;
