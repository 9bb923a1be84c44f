//! Kernel selection: descriptor → ranked kernel packages.

use core_types::Backend;

use crate::config::SelectorConfig;
use crate::params::OpParams;
use crate::registry::{registry, KernelRegistry, RegisteredKernel};
use crate::types::{KernelPackage, OpError};

/// Turns descriptors into ranked kernel packages using one registry.
///
/// Stateless apart from its read-only inputs; one selector can serve
/// concurrent requests.
pub struct KernelSelector<'r> {
    registry: &'r KernelRegistry,
    config:   SelectorConfig,
}

impl KernelSelector<'static> {
    /// Selector over the process-wide registry
    pub fn global() -> Self {
        KernelSelector::new(registry())
    }
}

impl<'r> KernelSelector<'r> {
    pub fn new(registry: &'r KernelRegistry) -> Self {
        Self { registry, config: SelectorConfig::default() }
    }

    pub fn with_config(mut self, config: SelectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Every viable package for `params`, best first.
    ///
    /// Fails with [`OpError::NoCandidateRegistered`] when nothing is
    /// registered for the kind, and [`OpError::NoViableKernel`] when
    /// candidates exist but none accepts the operands.
    pub fn select(&self, backend: Backend, params: &OpParams) -> Result<Vec<KernelPackage>, OpError> {
        let registered = self.registry.lookup(backend, params.kind());
        if registered.is_empty() {
            return Err(OpError::NoCandidateRegistered { backend, kind: params.kind().clone() });
        }

        let mut packages: Vec<KernelPackage> = self
            .eligible(registered, params)
            .into_iter()
            .filter(|e| admitted_by_key(e, params))
            .filter(|e| e.candidate.validate(params))
            .filter_map(|e| e.candidate.assemble(params))
            .collect();

        // stable: equal priorities keep registration order
        packages.sort_by_key(|p| p.priority);

        if packages.is_empty() {
            return Err(OpError::NoViableKernel {
                backend,
                kind: params.kind().clone(),
                combination: params.combination(),
            });
        }
        tracing::debug!(
            layer = params.layer_id(),
            best = packages[0].kernel_name,
            viable = packages.len(),
            "kernel selected"
        );
        Ok(packages)
    }

    /// The preferred package for `params`
    pub fn select_best(&self, backend: Backend, params: &OpParams) -> Result<KernelPackage, OpError> {
        let mut packages = self.select(backend, params)?;
        Ok(packages.swap_remove(0))
    }

    /// Registered candidates left after applying the config
    fn eligible<'a>(
        &self,
        registered: &'a [RegisteredKernel],
        params: &OpParams,
    ) -> Vec<&'a RegisteredKernel> {
        let mut forced = self.config.forced_for(params.layer_id());
        if let Some(name) = forced {
            if !registered.iter().any(|e| e.candidate.name() == name) {
                tracing::warn!(layer = params.layer_id(), kernel = name, "forced kernel is not registered, ignoring");
                forced = None;
            }
        }

        registered
            .iter()
            .filter(|e| {
                let name = e.candidate.name();
                match forced {
                    Some(f) => f == name,
                    None => !self.config.is_disabled(name),
                }
            })
            .collect()
    }
}

fn admitted_by_key(entry: &RegisteredKernel, params: &OpParams) -> bool {
    params.inputs().iter().all(|t| entry.key.supports_input(t.dtype, t.layout))
        && entry.key.supports_output(params.output().dtype, params.output().layout)
}

/// Select with the process-wide registry and default config
pub fn select(backend: Backend, params: &OpParams) -> Result<Vec<KernelPackage>, OpError> {
    KernelSelector::global().select(backend, params)
}
