use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    /// Catalog item does not exist in the document store.
    #[error("Catalog item not found: {0}")]
    NotFound(String),

    /// Item document exists but cannot be interpreted.
    #[error("Invalid catalog item {id}: {message}")]
    InvalidItem { id: String, message: String },

    /// Underlying document or settings store failure.
    #[error("Storage error: {0}")]
    Storage(#[from] bridge_traits::BridgeError),

    /// Client state payload could not be encoded or decoded.
    #[error("Client state serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;
