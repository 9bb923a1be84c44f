//! Kernel selection and dispatch for GPU inference backends.
//!
//! Descriptors go in through [`ops::OpParams`], candidates are ranked by
//! [`ops::KernelSelector`], and [`execution`] turns the winner into an
//! executable primitive.

pub use core_types as types;
pub use execution;
pub use ksel_core as device;
pub use ksel_ops as ops;

pub mod prelude {
    pub use core_types::{Backend, DataType, Layout, TensorMemory};
    pub use execution::{implementations, ExecError, ExecutionEngine, PrimitiveImpl, ProgramNode};
    pub use ksel_core::DeviceInfo;
    pub use ksel_ops::{
        select, CapabilityKey, KernelCandidate, KernelPackage, KernelPriority, KernelSelector,
        OpError, OpKind, OpParams, OpSpecific, SelectorConfig, TensorDesc,
    };
}
