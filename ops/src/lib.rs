pub mod builtin;
pub mod config;
pub mod dispatch;
pub mod jit;
pub mod kernel;
pub mod key;
pub mod params;
pub mod registry;
pub mod selector;
pub mod types;

#[doc(hidden)]
pub use inventory;

pub use config::SelectorConfig;
pub use dispatch::DispatchData;
pub use jit::{JitConstants, JitValue};
pub use kernel::{CandidateRegistration, KernelCandidate};
pub use key::CapabilityKey;
pub use params::{OpKind, OpParams, OpParamsBuilder, OpSpecific, TensorDesc};
pub use registry::{registry, KernelRegistry, RegisteredKernel};
pub use selector::{select, KernelSelector};
pub use types::{ArgumentKind, InternalBuffer, KernelPackage, KernelPriority, OpError};


/// Register a kernel candidate for a backend with the inventory system
#[macro_export]
macro_rules! register_candidate {
    ($backend:expr, $candidate:ty) => {
        $crate::inventory::submit! {
            $crate::CandidateRegistration {
                backend: $backend,
                factory: || Box::new(<$candidate>::new()),
            }
        }
    };
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::bucketize::BucketizeKernelRef;
    use core_types::{Backend, DataType, Layout};
    use ksel_core::DeviceInfo;
    use std::sync::Arc;

    /// Minimal bucketize-shaped candidate with a configurable priority
    struct PriorityKernel {
        name:     &'static str,
        priority: KernelPriority,
        key:      CapabilityKey,
    }

    impl PriorityKernel {
        fn new(name: &'static str, priority: u32) -> Self {
            let key = CapabilityKey::new()
                .enable_inputs(&[DataType::F32], &[Layout::Bfyx])
                .enable_outputs(&[DataType::I32], &[Layout::Bfyx])
                .enable_different_types()
                .enable_batching();
            Self { name, priority: KernelPriority(priority), key }
        }
    }

    impl KernelCandidate for PriorityKernel {
        fn name(&self) -> &'static str { self.name }
        fn kind(&self) -> OpKind { OpKind::BUCKETIZE }
        fn supported_key(&self) -> &CapabilityKey { &self.key }
        fn priority(&self) -> KernelPriority { self.priority }
        fn source_template(&self) -> &'static str { "" }
        fn dispatch_data(&self, params: &OpParams) -> DispatchData {
            DispatchData::for_global([params.output().batch(), 1, 1], params.device())
        }
        fn jit_constants(&self, params: &OpParams) -> JitConstants {
            jit::make_base_params_jit_constants(params)
        }
    }

    fn scenario(values: DataType) -> OpParams {
        OpParams::builder(OpKind::BUCKETIZE, DeviceInfo::new(256))
            .layer_id("bucketize:0")
            .specific(OpSpecific::Bucketize { with_right_bound: false })
            .input(TensorDesc::new(values, Layout::Bfyx, [4, 3]))
            .input(TensorDesc::new(DataType::F32, Layout::Bfyx, [5]))
            .output(TensorDesc::new(DataType::I32, Layout::Bfyx, [4, 3]))
            .build()
            .unwrap()
    }

    #[test]
    fn global_registry_collects_bucketize() {
        let found = registry().lookup(Backend::Gpu, &OpKind::BUCKETIZE);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].candidate.name(), BucketizeKernelRef::NAME);
        assert!(registry().lookup(Backend::Cpu, &OpKind::BUCKETIZE).is_empty());
    }

    #[test]
    fn scenario_a_selects_one_kernel() {
        let packages = select(Backend::Gpu, &scenario(DataType::F32)).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].dispatch.gws, [4, 1, 1]);
    }

    #[test]
    fn scenario_b_reports_no_viable_kernel() {
        let err = select(Backend::Gpu, &scenario(DataType::Bool)).unwrap_err();
        match err {
            OpError::NoViableKernel { kind, combination, .. } => {
                assert_eq!(kind, OpKind::BUCKETIZE);
                assert_eq!(combination, "[bool:bfyx, f32:bfyx] -> i32:bfyx");
            }
            other => panic!("expected NoViableKernel, got {other:?}"),
        }
    }

    #[test]
    fn scenario_c_reports_no_candidate() {
        let params = OpParams::builder(OpKind::new("nonexistent_op"), DeviceInfo::new(256))
            .input(TensorDesc::new(DataType::F32, Layout::Bfyx, [4, 3]))
            .output(TensorDesc::new(DataType::F32, Layout::Bfyx, [4, 3]))
            .build()
            .unwrap();
        let err = select(Backend::Gpu, &params).unwrap_err();
        assert!(matches!(err, OpError::NoCandidateRegistered { .. }));
        assert!(!err.is_malformed());
    }

    #[test]
    fn scenario_d_orders_by_priority() {
        let mut reg = KernelRegistry::new();
        reg.register_candidate(Backend::Gpu, PriorityKernel::new("slow", 10));
        reg.register_candidate(Backend::Gpu, PriorityKernel::new("fast", 2));
        reg.register_candidate(Backend::Gpu, BucketizeKernelRef::new());

        let packages = KernelSelector::new(&reg)
            .select(Backend::Gpu, &scenario(DataType::F32))
            .unwrap();
        let names: Vec<_> = packages.iter().map(|p| p.kernel_name).collect();
        assert_eq!(names, vec!["fast", "slow", "bucketize_ref"]);

        let best = KernelSelector::new(&reg)
            .select_best(Backend::Gpu, &scenario(DataType::F32))
            .unwrap();
        assert_eq!(best.kernel_name, "fast");
    }

    #[test]
    fn register_then_lookup_once() {
        let mut reg = KernelRegistry::new();
        let key = PriorityKernel::new("k", 1).key.clone();
        reg.register(Backend::Gpu, OpKind::BUCKETIZE, key.clone(), Arc::new(PriorityKernel::new("k", 1)));
        reg.register(Backend::Gpu, OpKind::BUCKETIZE, key.clone(), Arc::new(PriorityKernel::new("k", 3)));

        let found = reg.lookup(Backend::Gpu, &OpKind::BUCKETIZE);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, key);
        assert_eq!(found[0].candidate.priority(), KernelPriority(3));
        assert_eq!(reg.len(), 1);
        assert!(reg.lookup(Backend::Gpu, &OpKind::new("other")).is_empty());
    }

    #[test]
    fn collecting_inventory_twice_does_not_duplicate() {
        let mut reg = KernelRegistry::new();
        reg.collect_inventory();
        let first = reg.len();
        reg.collect_inventory();
        assert_eq!(reg.len(), first);
    }

    #[test]
    fn disabled_and_forced_kernels() {
        let mut reg = KernelRegistry::new();
        reg.register_candidate(Backend::Gpu, PriorityKernel::new("fast", 2));
        reg.register_candidate(Backend::Gpu, BucketizeKernelRef::new());
        let params = scenario(DataType::F32);

        let cfg = SelectorConfig::from_yaml("disabled_kernels: [fast]").unwrap();
        let packages = KernelSelector::new(&reg).with_config(cfg).select(Backend::Gpu, &params).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].kernel_name, "bucketize_ref");

        let cfg = SelectorConfig::from_yaml("forced_kernels: {\"bucketize:0\": bucketize_ref}").unwrap();
        let packages = KernelSelector::new(&reg).with_config(cfg).select(Backend::Gpu, &params).unwrap();
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].kernel_name, "bucketize_ref");

        // unknown forced kernel falls back to normal selection
        let cfg = SelectorConfig::from_yaml("forced_kernels: {\"bucketize:0\": missing}").unwrap();
        let packages = KernelSelector::new(&reg).with_config(cfg).select(Backend::Gpu, &params).unwrap();
        assert_eq!(packages[0].kernel_name, "fast");

        let cfg = SelectorConfig::from_yaml("disabled_kernels: [fast, bucketize_ref]").unwrap();
        let err = KernelSelector::new(&reg).with_config(cfg).select(Backend::Gpu, &params).unwrap_err();
        assert!(matches!(err, OpError::NoViableKernel { .. }));
    }
}
