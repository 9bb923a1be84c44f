//! Graph nodes as handed over by the compiler, and the executable
//! primitives built from them.

use ksel_core::DeviceInfo;
use ksel_ops::{KernelPackage, OpError, OpKind, OpParams, OpSpecific, TensorDesc};

/// One operation node of the compiled graph
#[derive(Clone, Debug)]
pub struct ProgramNode {
    pub id:       String,
    pub kind:     OpKind,
    pub inputs:   Vec<TensorDesc>,
    pub output:   TensorDesc,
    pub specific: OpSpecific,
}

impl ProgramNode {
    pub fn new(
        id: impl Into<String>,
        kind: OpKind,
        inputs: impl IntoIterator<Item = TensorDesc>,
        output: TensorDesc,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            inputs: inputs.into_iter().collect(),
            output,
            specific: OpSpecific::None,
        }
    }

    pub fn with_specific(mut self, specific: OpSpecific) -> Self {
        self.specific = specific;
        self
    }

    /// Resolve the node into a validated descriptor for `device`.
    pub fn params(&self, device: &DeviceInfo) -> Result<OpParams, OpError> {
        OpParams::builder(self.kind.clone(), device.clone())
            .layer_id(self.id.as_str())
            .inputs(self.inputs.iter().cloned())
            .output(self.output.clone())
            .specific(self.specific.clone())
            .build()
    }
}

/// Executable node wrapping the kernel package chosen for it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrimitiveImpl {
    node_id: String,
    package: KernelPackage,
}

impl PrimitiveImpl {
    pub fn new(node_id: impl Into<String>, package: KernelPackage) -> Self {
        Self { node_id: node_id.into(), package }
    }

    pub fn node_id(&self) -> &str { &self.node_id }
    pub fn package(&self) -> &KernelPackage { &self.package }
    pub fn entry_point(&self) -> &str { &self.package.entry_point }
}
