//! Operation parameter descriptors.
//!
//! An [`OpParams`] is the normalized description of one dispatch request. It
//! can only be obtained from [`OpParamsBuilder::build`], which rejects
//! malformed input, and is immutable afterwards.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use core_types::{DataType, Layout, TensorMemory, ViewDescriptor};
use ksel_core::DeviceInfo;

use crate::types::OpError;

/// Operation kind tag, as named by the graph compiler.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OpKind(Cow<'static, str>);

impl OpKind {
    pub const BUCKETIZE: OpKind = OpKind(Cow::Borrowed("bucketize"));

    pub fn new(name: impl Into<String>) -> Self {
        OpKind(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Fixed input count, for kinds this crate knows about
    pub fn arity(&self) -> Option<usize> {
        match self.as_str() {
            "bucketize" => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One tensor operand: element type, logical shape and layout.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TensorDesc {
    pub dtype:  DataType,
    pub layout: Layout,
    pub shape:  Vec<usize>,
    pub memory: Option<TensorMemory>,
}

impl TensorDesc {
    pub fn new(dtype: DataType, layout: Layout, shape: impl Into<Vec<usize>>) -> Self {
        Self { dtype, layout, shape: shape.into(), memory: None }
    }

    /// Bind the tensor to known storage, enabling alias detection.
    pub fn with_memory(mut self, memory: TensorMemory) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Leading (batch) dimension
    pub fn batch(&self) -> usize {
        self.shape.first().copied().unwrap_or(1)
    }

    /// Shape padded with trailing 1s up to the layout rank.
    pub fn padded_shape(&self) -> Vec<usize> {
        self.layout.pad_shape(&self.shape).unwrap_or_else(|| self.shape.clone())
    }

    /// Element strides indexed by logical dimension (padded).
    pub fn pitches(&self) -> Vec<usize> {
        self.layout.strides(&self.padded_shape())
    }

    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Packed view for the kernel, `None` when it overflows u32 indexing.
    pub fn view(&self) -> Option<ViewDescriptor> {
        ViewDescriptor::new(&self.padded_shape(), &self.pitches(), 0)
    }

    /// Whether both tensors are known to live in the same storage.
    pub fn aliases(&self, other: &TensorDesc) -> bool {
        match (&self.memory, &other.memory) {
            (Some(a), Some(b)) => a.shares_storage_with(b),
            _ => false,
        }
    }

    /// Every pitch is bounded by the element count, so bounding the count
    /// keeps the whole view addressable with u32.
    fn fits_u32_indexing(&self) -> bool {
        self.shape.iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .is_some_and(|count| count <= u32::MAX as usize)
    }

    fn check(&self, kind: &OpKind, what: String) -> Result<(), OpError> {
        let reason = if self.shape.len() > self.layout.rank() {
            Some(format!("rank {} exceeds layout {}", self.shape.len(), self.layout))
        } else if self.shape.contains(&0) {
            Some("zero-sized dimension".to_string())
        } else if !self.fits_u32_indexing() {
            Some(format!("element count exceeds {}", u32::MAX))
        } else {
            None
        };
        match reason {
            Some(reason) => Err(OpError::InvalidShape {
                kind: kind.clone(),
                tensor: what,
                shape: self.shape.clone(),
                reason,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{:?}", self.dtype, self.layout, self.shape)
    }
}

/// Operation-specific flags carried by a descriptor
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum OpSpecific {
    #[default]
    None,
    Bucketize { with_right_bound: bool },
}

/// Validated description of one invocation instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpParams {
    kind:     OpKind,
    layer_id: String,
    inputs:   Vec<TensorDesc>,
    output:   TensorDesc,
    specific: OpSpecific,
    device:   DeviceInfo,
}

impl OpParams {
    pub fn builder(kind: OpKind, device: DeviceInfo) -> OpParamsBuilder {
        OpParamsBuilder {
            kind,
            device,
            layer_id: String::new(),
            inputs: Vec::new(),
            output: None,
            specific: OpSpecific::None,
        }
    }

    pub fn kind(&self) -> &OpKind { &self.kind }
    pub fn layer_id(&self) -> &str { &self.layer_id }
    pub fn inputs(&self) -> &[TensorDesc] { &self.inputs }
    pub fn output(&self) -> &TensorDesc { &self.output }
    pub fn specific(&self) -> &OpSpecific { &self.specific }
    pub fn device(&self) -> &DeviceInfo { &self.device }

    /// Inputs followed by the output
    pub fn tensors(&self) -> impl Iterator<Item = &TensorDesc> {
        self.inputs.iter().chain(std::iter::once(&self.output))
    }

    /// Human-readable operand combination for diagnostics,
    /// e.g. `[f32:bfyx, bool:bfyx] -> i32:bfyx`
    pub fn combination(&self) -> String {
        let inputs: Vec<String> = self.inputs.iter()
            .map(|t| format!("{}:{}", t.dtype, t.layout))
            .collect();
        format!("[{}] -> {}:{}", inputs.join(", "), self.output.dtype, self.output.layout)
    }

    /// Hash of everything that influences code generation. Stable within a
    /// process only. Storage bindings are left out, so rebinding a node to
    /// other buffers keeps its entry point.
    pub fn fingerprint(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.kind.hash(&mut h);
        self.layer_id.hash(&mut h);
        for t in self.tensors() {
            t.dtype.hash(&mut h);
            t.layout.hash(&mut h);
            t.shape.hash(&mut h);
        }
        self.specific.hash(&mut h);
        self.device.hash(&mut h);
        h.finish()
    }
}

/// Collects raw operand metadata from the graph compiler.
#[derive(Clone, Debug)]
pub struct OpParamsBuilder {
    kind:     OpKind,
    device:   DeviceInfo,
    layer_id: String,
    inputs:   Vec<TensorDesc>,
    output:   Option<TensorDesc>,
    specific: OpSpecific,
}

impl OpParamsBuilder {
    pub fn layer_id(mut self, id: impl Into<String>) -> Self {
        self.layer_id = id.into();
        self
    }

    pub fn input(mut self, t: TensorDesc) -> Self {
        self.inputs.push(t);
        self
    }

    pub fn inputs(mut self, ts: impl IntoIterator<Item = TensorDesc>) -> Self {
        self.inputs.extend(ts);
        self
    }

    pub fn output(mut self, t: TensorDesc) -> Self {
        self.output = Some(t);
        self
    }

    pub fn specific(mut self, specific: OpSpecific) -> Self {
        self.specific = specific;
        self
    }

    /// Validate arity, required flags and shapes.
    pub fn build(self) -> Result<OpParams, OpError> {
        let kind = self.kind;
        let output = self.output.ok_or_else(|| OpError::MissingParameter {
            kind: kind.clone(),
            name: "output",
        })?;

        if let Some(expected) = kind.arity() {
            if self.inputs.len() != expected {
                return Err(OpError::ArityMismatch {
                    kind,
                    expected,
                    found: self.inputs.len(),
                });
            }
        }

        match (&self.specific, kind == OpKind::BUCKETIZE) {
            (OpSpecific::Bucketize { .. }, true) | (OpSpecific::None, false) => {}
            (OpSpecific::None, true) => {
                return Err(OpError::MissingParameter { kind, name: "with_right_bound" });
            }
            (OpSpecific::Bucketize { .. }, false) => {
                return Err(OpError::UnexpectedParameter { kind, name: "with_right_bound" });
            }
        }

        for (i, t) in self.inputs.iter().enumerate() {
            t.check(&kind, format!("input {i}"))?;
        }
        output.check(&kind, "output".to_string())?;
        if output.shape.is_empty() {
            return Err(OpError::InvalidShape {
                kind,
                tensor: "output".to_string(),
                shape: Vec::new(),
                reason: "output needs a batch dimension".to_string(),
            });
        }

        Ok(OpParams {
            kind,
            layer_id: self.layer_id,
            inputs: self.inputs,
            output,
            specific: self.specific,
            device: self.device,
        })
    }
}
