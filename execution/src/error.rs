use core_types::{Backend, DataType, Layout};
use ksel_ops::{ArgumentKind, OpError, OpKind};
use thiserror::Error;

/// Errors raised while attaching, building or launching primitives
#[derive(Debug, Error)]
pub enum ExecError {
    #[error(transparent)]
    Select(#[from] OpError),

    /// No attachment covers the node's (type, layout).
    #[error("no {backend} implementation of '{kind}' for {dtype}:{layout}")]
    NoImplementation { backend: Backend, kind: OpKind, dtype: DataType, layout: Layout },

    #[error("{dtype} has no shader representation")]
    UnsupportedShaderType { dtype: DataType },

    #[error("kernel template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("primitive '{node}' has no buffer for argument {argument:?}")]
    MissingArgument { node: String, argument: ArgumentKind },

    #[error(transparent)]
    Device(#[from] anyhow::Error),
}
