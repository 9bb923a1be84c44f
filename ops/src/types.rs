use std::fmt;

use core_types::Backend;
use thiserror::Error;

use crate::dispatch::DispatchData;
use crate::jit::JitConstants;
use crate::params::OpKind;

/// Static preference among candidates of one operation kind.
///
/// Lower is preferred. The scale only orders candidates of the same kind;
/// it carries no meaning across kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KernelPriority(pub u32);

impl KernelPriority {
    pub const FORCE_PRIORITY_1: KernelPriority = KernelPriority(1);
    pub const FORCE_PRIORITY_2: KernelPriority = KernelPriority(2);
    pub const FORCE_PRIORITY_3: KernelPriority = KernelPriority(3);
    pub const FORCE_PRIORITY_4: KernelPriority = KernelPriority(4);
    pub const FORCE_PRIORITY_5: KernelPriority = KernelPriority(5);
    pub const FORCE_PRIORITY_6: KernelPriority = KernelPriority(6);
    pub const FORCE_PRIORITY_7: KernelPriority = KernelPriority(7);
    pub const FORCE_PRIORITY_8: KernelPriority = KernelPriority(8);
    pub const FORCE_PRIORITY_9: KernelPriority = KernelPriority(9);
    /// Reference implementations: only picked when nothing else validates
    pub const DONT_USE_IF_HAVE_SOMETHING_ELSE: KernelPriority = KernelPriority(1000);
}

impl fmt::Display for KernelPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What a kernel argument slot is bound to
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ArgumentKind {
    Input(usize),
    Output(usize),
    /// Device-side buffer owned by the package
    Internal(usize),
}

/// Host data for an [`ArgumentKind::Internal`] slot
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InternalBuffer {
    pub name:  &'static str,
    pub bytes: Vec<u8>,
}

/// A kernel ready to be compiled and launched for one descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KernelPackage {
    /// Candidate that produced the package
    pub kernel_name:      &'static str,
    pub entry_point:      String,
    pub priority:         KernelPriority,
    /// Kernel source with `{{ CONSTANT }}` placeholders
    pub source_template:  &'static str,
    pub jit:              JitConstants,
    pub dispatch:         DispatchData,
    /// Binding order of the kernel arguments
    pub arguments:        Vec<ArgumentKind>,
    pub internal_buffers: Vec<InternalBuffer>,
}

impl KernelPackage {
    pub fn argument_count(&self) -> usize {
        self.arguments.len()
    }
}

/// Errors raised while describing or selecting a kernel
#[derive(Debug, Error)]
pub enum OpError {
    /// Nothing was ever registered for this backend and kind.
    #[error("no kernel registered for '{kind}' on {backend}")]
    NoCandidateRegistered { backend: Backend, kind: OpKind },

    /// Candidates exist but none accepts the operand combination.
    #[error("no viable kernel for '{kind}' on {backend} with {combination}")]
    NoViableKernel { backend: Backend, kind: OpKind, combination: String },

    #[error("'{kind}' expects {expected} inputs, got {found}")]
    ArityMismatch { kind: OpKind, expected: usize, found: usize },

    #[error("'{kind}' is missing required parameter '{name}'")]
    MissingParameter { kind: OpKind, name: &'static str },

    #[error("'{kind}' does not take parameter '{name}'")]
    UnexpectedParameter { kind: OpKind, name: &'static str },

    #[error("'{kind}' {tensor} has invalid shape {shape:?}: {reason}")]
    InvalidShape { kind: OpKind, tensor: String, shape: Vec<usize>, reason: String },

    #[error("invalid selector config: {0}")]
    InvalidConfig(String),
}

impl OpError {
    /// Errors caused by a descriptor the caller should never have built
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            OpError::ArityMismatch { .. }
                | OpError::MissingParameter { .. }
                | OpError::UnexpectedParameter { .. }
                | OpError::InvalidShape { .. }
        )
    }
}
