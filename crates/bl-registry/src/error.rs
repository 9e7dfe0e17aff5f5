//! Error types for registry operations.

use thiserror::Error;

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error)]
pub enum RegistryError {
    /// Publishing or requesting data before a link was attached.
    #[error("Factory is not connected")]
    NotConnected,

    /// A factory connects exactly once.
    #[error("Factory is already connected")]
    AlreadyConnected,

    #[error("Link error: {0}")]
    Link(#[from] bl_link::LinkError),
}
