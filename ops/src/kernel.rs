use core_types::Backend;

use crate::dispatch::DispatchData;
use crate::jit::JitConstants;
use crate::key::CapabilityKey;
use crate::params::{OpKind, OpParams};
use crate::types::{ArgumentKind, InternalBuffer, KernelPackage, KernelPriority};


/// Trait to implement for each kernel candidate
pub trait KernelCandidate: Send + Sync {
    /// Unique name, also the base of every entry point
    fn name(&self) -> &'static str;

    /// Operation kind this candidate implements
    fn kind(&self) -> OpKind;

    /// Combinations this candidate accepts
    fn supported_key(&self) -> &CapabilityKey;

    /// Static preference, lower first
    fn priority(&self) -> KernelPriority;

    /// Kernel source with `{{ CONSTANT }}` placeholders
    fn source_template(&self) -> &'static str;

    /// Work partitioning for `params`
    fn dispatch_data(&self, params: &OpParams) -> DispatchData;

    /// Compile-time constants for `params`
    fn jit_constants(&self, params: &OpParams) -> JitConstants;

    /// Buffers passed after the declared inputs and outputs, `None` when
    /// they cannot be encoded for `params`
    fn internal_buffers(&self, _params: &OpParams) -> Option<Vec<InternalBuffer>> {
        Some(Vec::new())
    }

    /// Whether this candidate can run `params`. Never fails loudly:
    /// an unsupported combination is an ordinary `false`.
    fn validate(&self, params: &OpParams) -> bool {
        check_common(self.name(), &self.kind(), self.supported_key(), params)
    }

    /// Produce the package for `params`, or `None` when it does not validate.
    fn assemble(&self, params: &OpParams) -> Option<KernelPackage> {
        if !self.validate(params) {
            return None;
        }

        let dispatch = self.dispatch_data(params);
        let entry_point = entry_point(self.name(), params);

        let mut jit = self.jit_constants(params);
        jit.add("KERNEL_NAME", entry_point.as_str());

        let Some(internal_buffers) = self.internal_buffers(params) else {
            tracing::debug!(kernel = self.name(), layer = params.layer_id(), "rejected: internal buffers do not encode");
            return None;
        };
        let arguments = (0..params.inputs().len()).map(ArgumentKind::Input)
            .chain(std::iter::once(ArgumentKind::Output(0)))
            .chain((0..internal_buffers.len()).map(ArgumentKind::Internal))
            .collect();

        Some(KernelPackage {
            kernel_name: self.name(),
            entry_point,
            priority: self.priority(),
            source_template: self.source_template(),
            jit,
            dispatch,
            arguments,
            internal_buffers,
        })
    }
}

/// Kind, arity, capability key, batching/mixed-type flags and device support.
pub fn check_common(name: &str, kind: &OpKind, key: &CapabilityKey, params: &OpParams) -> bool {
    let reject = |why: &str| {
        tracing::debug!(kernel = name, layer = params.layer_id(), "rejected: {why}");
        false
    };

    if params.kind() != kind {
        return reject("operation kind differs");
    }
    if let Some(arity) = kind.arity() {
        if params.inputs().len() != arity {
            return reject("input arity differs");
        }
    }
    if params.inputs().iter().any(|t| !key.supports_input(t.dtype, t.layout)) {
        return reject("input type/layout not in capability key");
    }
    let out = params.output();
    if !key.supports_output(out.dtype, out.layout) {
        return reject("output type/layout not in capability key");
    }
    if !key.allow_mixed_types() && params.tensors().any(|t| t.dtype != out.dtype) {
        return reject("mixed element types");
    }
    if !key.allow_batching() && params.tensors().any(|t| t.batch() > 1) {
        return reject("batching not supported");
    }
    if let Some(t) = params.tensors().find(|t| !params.device().supports_type(t.dtype)) {
        tracing::debug!(kernel = name, dtype = %t.dtype, "rejected: device lacks element type");
        return false;
    }
    true
}

/// Entry point unique to a (candidate, descriptor) pairing
pub fn entry_point(name: &str, params: &OpParams) -> String {
    let layer: String = params.layer_id().chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if layer.is_empty() {
        format!("{name}_{:016x}", params.fingerprint())
    } else {
        format!("{name}_{layer}_{:016x}", params.fingerprint())
    }
}


/// Registration record collected at link time
pub struct CandidateRegistration {
    pub backend: Backend,
    pub factory: fn() -> Box<dyn KernelCandidate>,
}

// Collect all registered candidates
inventory::collect!(CandidateRegistration);
