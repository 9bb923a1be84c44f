//! Kernel registry: (backend, operation kind) → registered candidates.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use core_types::Backend;

use crate::key::CapabilityKey;
use crate::kernel::{CandidateRegistration, KernelCandidate};
use crate::params::OpKind;

/// One registered candidate together with the key it was registered under
#[derive(Clone)]
pub struct RegisteredKernel {
    pub key:       CapabilityKey,
    pub candidate: Arc<dyn KernelCandidate>,
}

/// Holds every registered candidate, grouped by backend and kind.
///
/// Populated during initialization and read-only afterwards; lookups take
/// `&self` and can run from any number of threads.
#[derive(Default)]
pub struct KernelRegistry {
    map: HashMap<(Backend, OpKind), Vec<RegisteredKernel>>,
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every candidate submitted with [`register_candidate!`](crate::register_candidate).
    pub fn collect_inventory(&mut self) {
        for registration in inventory::iter::<CandidateRegistration> {
            let candidate: Arc<dyn KernelCandidate> = Arc::from((registration.factory)());
            let (kind, key) = (candidate.kind(), candidate.supported_key().clone());
            self.register(registration.backend, kind, key, candidate);
        }
    }

    /// Register `candidate` for `backend`/`kind` under `key`.
    ///
    /// Registering a candidate name twice replaces the earlier entry, so
    /// repeated initialization never duplicates it.
    pub fn register(
        &mut self,
        backend:   Backend,
        kind:      OpKind,
        key:       CapabilityKey,
        candidate: Arc<dyn KernelCandidate>,
    ) {
        tracing::info!(%backend, %kind, kernel = candidate.name(), "registering kernel");
        let entries = self.map.entry((backend, kind)).or_default();
        let entry = RegisteredKernel { key, candidate };
        match entries.iter_mut().find(|e| e.candidate.name() == entry.candidate.name()) {
            Some(existing) => *existing = entry,
            None => entries.push(entry),
        }
    }

    /// Register a candidate under its own kind and key
    pub fn register_candidate<C: KernelCandidate + 'static>(&mut self, backend: Backend, candidate: C) {
        let (kind, key) = (candidate.kind(), candidate.supported_key().clone());
        self.register(backend, kind, key, Arc::new(candidate));
    }

    /// Registered candidates in registration order; empty when none.
    pub fn lookup(&self, backend: Backend, kind: &OpKind) -> &[RegisteredKernel] {
        self.map
            .get(&(backend, kind.clone()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of registered candidates
    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

static REGISTRY: OnceLock<KernelRegistry> = OnceLock::new();

/// Process-wide registry holding every link-time registered candidate.
///
/// Built on first access; read-only from then on.
pub fn registry() -> &'static KernelRegistry {
    REGISTRY.get_or_init(|| {
        let mut reg = KernelRegistry::new();
        reg.collect_inventory();
        tracing::info!(kernels = reg.len(), "kernel registry initialized");
        reg
    })
}
