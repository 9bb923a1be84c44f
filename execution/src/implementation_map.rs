//! Per-backend implementation attachments.
//!
//! Each operation kind attaches itself once, at link time, with an
//! [`ImplAttachment`]; [`implementations`] runs every attachment on first
//! use. Attachments only touch their own entry, so their order is irrelevant.

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use core_types::{Backend, DataType, Layout};
use ksel_core::DeviceInfo;
use ksel_ops::{KernelSelector, OpKind, OpParams};

use crate::error::ExecError;
use crate::primitive::{PrimitiveImpl, ProgramNode};

/// Builds the executable node for a resolved graph node
pub type ImplFactory =
    for<'r> fn(&ProgramNode, &OpParams, &KernelSelector<'r>) -> Result<PrimitiveImpl, ExecError>;

struct ImplEntry {
    tuples:  BTreeSet<(DataType, Layout)>,
    factory: ImplFactory,
}

/// (backend, kind) → supported (type, layout) tuples and factory
#[derive(Default)]
pub struct ImplementationMap {
    map: HashMap<(Backend, OpKind), ImplEntry>,
}

impl ImplementationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `factory` for `backend`/`kind`; attaching again replaces it.
    pub fn add(
        &mut self,
        backend: Backend,
        kind:    OpKind,
        factory: ImplFactory,
        tuples:  impl IntoIterator<Item = (DataType, Layout)>,
    ) {
        let tuples: BTreeSet<_> = tuples.into_iter().collect();
        tracing::info!(%backend, %kind, tuples = tuples.len(), "attaching implementation");
        self.map.insert((backend, kind), ImplEntry { tuples, factory });
    }

    /// Factory for a node whose first operand is `dtype` in `layout`
    pub fn get(&self, backend: Backend, kind: &OpKind, dtype: DataType, layout: Layout) -> Option<ImplFactory> {
        self.map
            .get(&(backend, kind.clone()))
            .filter(|e| e.tuples.contains(&(dtype, layout)))
            .map(|e| e.factory)
    }

    /// Attached (type, layout) tuples, in a stable order
    pub fn supported(&self, backend: Backend, kind: &OpKind) -> Vec<(DataType, Layout)> {
        self.map
            .get(&(backend, kind.clone()))
            .map(|e| e.tuples.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Resolve `node`, then build its executable primitive.
    pub fn create(
        &self,
        backend:  Backend,
        node:     &ProgramNode,
        device:   &DeviceInfo,
        selector: &KernelSelector<'_>,
    ) -> Result<PrimitiveImpl, ExecError> {
        let lead = node.inputs.first().unwrap_or(&node.output);
        let factory = self
            .get(backend, &node.kind, lead.dtype, lead.layout)
            .ok_or_else(|| ExecError::NoImplementation {
                backend,
                kind: node.kind.clone(),
                dtype: lead.dtype,
                layout: lead.layout,
            })?;
        let params = node.params(device)?;
        factory(node, &params, selector)
    }
}

/// Link-time attachment record
pub struct ImplAttachment {
    pub attach: fn(&mut ImplementationMap),
}

inventory::collect!(ImplAttachment);

static IMPLEMENTATIONS: OnceLock<ImplementationMap> = OnceLock::new();

/// Process-wide implementation map, populated by every attachment exactly once.
pub fn implementations() -> &'static ImplementationMap {
    IMPLEMENTATIONS.get_or_init(|| {
        let mut map = ImplementationMap::new();
        for attachment in inventory::iter::<ImplAttachment> {
            (attachment.attach)(&mut map);
        }
        map
    })
}
