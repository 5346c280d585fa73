use std::collections::TryReserveError;

use thiserror::Error;

///
/// EcsError
///
#[derive(Debug, Error)]
pub enum EcsError {
    #[error("Index is out of range!")]
    IndexOutOfRange,
    #[error("Failed to allocate storage for new rows!")]
    AllocationFailure,
    #[error("No such archetype in this scene!")]
    NoSuchArchetype,
    #[error("Archetype has no such component column!")]
    NoSuchComponent,
}

impl From<TryReserveError> for EcsError {
    fn from(_: TryReserveError) -> Self {
        EcsError::AllocationFailure
    }
}
