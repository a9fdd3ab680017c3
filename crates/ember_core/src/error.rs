use crate::app::SystemError;
use crate::convert::ConvertError;
use crate::dispatch::{DispatchError, HandlerFailure};
use crate::ecs::{BuildError, ContextError, HierarchyError, PoolError};
use crate::parallel::WorkerError;
use crate::registry::RegistryError;
use thiserror::Error;

/// Any failure surfaced by the core crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
    #[error(transparent)]
    Worker(#[from] WorkerError),
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    System(#[from] SystemError),
    #[error(transparent)]
    Handler(#[from] HandlerFailure),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
