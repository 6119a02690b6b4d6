use thiserror::Error;

#[derive(Error, Debug)]
pub enum EntitlementError {
    /// No user document exists for the principal.
    #[error("Unknown principal: {0}")]
    UnknownPrincipal(String),

    /// A stored record could not be interpreted.
    #[error("Invalid entitlement record: {0}")]
    InvalidRecord(String),

    /// Underlying document store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] bridge_traits::BridgeError),
}

pub type Result<T> = std::result::Result<T, EntitlementError>;
